//! Built-in tools

use chrono::{FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Result, TurnstileError};

use super::TypedTool;

/// Arguments for [`EchoTool`].
#[derive(Debug, Deserialize)]
pub struct EchoArgs {
    pub message: String,
}

/// Echoes back the provided message. Useful for exercising the tool path.
pub struct EchoTool;

impl TypedTool for EchoTool {
    type Args = EchoArgs;
    type Output = String;

    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echoes back the provided message"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "The message to echo back"
                }
            },
            "required": ["message"]
        })
    }

    fn call(&self, args: EchoArgs) -> Result<String> {
        Ok(args.message)
    }
}

/// Arguments for [`CurrentTimeTool`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CurrentTimeArgs {
    /// Offset from UTC in minutes, e.g. `60` for UTC+01:00
    pub utc_offset_minutes: Option<i32>,
}

/// Result of [`CurrentTimeTool`].
#[derive(Debug, Serialize)]
pub struct CurrentTime {
    /// RFC 3339 timestamp in the requested offset
    pub iso8601: String,
    /// Seconds since the Unix epoch
    pub unix: i64,
    /// Weekday name in the requested offset
    pub weekday: String,
}

/// Reports the current date and time.
pub struct CurrentTimeTool;

impl TypedTool for CurrentTimeTool {
    type Args = CurrentTimeArgs;
    type Output = CurrentTime;

    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "Returns the current date and time, optionally in a fixed UTC offset"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "utc_offset_minutes": {
                    "type": "integer",
                    "description": "Offset from UTC in minutes (e.g. -300 for UTC-05:00). Defaults to 0."
                }
            }
        })
    }

    fn call(&self, args: CurrentTimeArgs) -> Result<CurrentTime> {
        let minutes = args.utc_offset_minutes.unwrap_or(0);
        let offset = minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                TurnstileError::Tool(format!("utc_offset_minutes out of range: {}", minutes))
            })?;

        let now = Utc::now().with_timezone(&offset);
        Ok(CurrentTime {
            iso8601: now.to_rfc3339(),
            unix: now.timestamp(),
            weekday: now.format("%A").to_string(),
        })
    }
}
