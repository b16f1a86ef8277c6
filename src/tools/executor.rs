//! Execution of model-issued tool calls
//!
//! Every call is isolated: an unknown function name, malformed arguments, an
//! error result, or a panic inside the tool drops that single call's result
//! and leaves its siblings and the surrounding generation untouched.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Result, TurnstileError};
use crate::history::{ToolCallRequest, ToolCallResult};

use super::{ToolArgs, ToolRegistry};

/// Resolves and invokes tool-call requests against a [`ToolRegistry`].
#[derive(Clone)]
pub struct ToolCallExecutor {
    registry: Arc<ToolRegistry>,
}

impl ToolCallExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// The registry calls are resolved against.
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute `requests` in issue order.
    ///
    /// Returns one result per call that resolved and succeeded, in the same
    /// order as the requests. Failed calls are logged and skipped.
    pub fn execute(&self, requests: &[ToolCallRequest]) -> Vec<ToolCallResult> {
        requests
            .iter()
            .filter_map(|request| match self.execute_one(request) {
                Ok(result) => Some(result),
                Err(e @ TurnstileError::ToolNotFound(_)) => {
                    warn!(
                        call_id = %request.call_id,
                        error = %e,
                        "Skipping tool call for unregistered function"
                    );
                    None
                }
                Err(e) => {
                    warn!(
                        call_id = %request.call_id,
                        function = %request.function_name,
                        error = %e,
                        "Tool call failed; no result produced"
                    );
                    None
                }
            })
            .collect()
    }

    fn execute_one(&self, request: &ToolCallRequest) -> Result<ToolCallResult> {
        if !self.registry.has(&request.function_name) {
            return Err(TurnstileError::ToolNotFound(request.function_name.clone()));
        }

        let args = parse_arguments(&request.arguments)?;
        debug!(
            call_id = %request.call_id,
            function = %request.function_name,
            "Invoking tool"
        );

        let registry = &self.registry;
        let name = request.function_name.as_str();
        let output = panic::catch_unwind(AssertUnwindSafe(|| registry.invoke(name, args)))
            .map_err(|payload| {
                TurnstileError::Tool(format!("tool '{}' panicked: {}", name, panic_message(&*payload)))
            })??;

        Ok(ToolCallResult {
            call_id: request.call_id.clone(),
            serialized_result: serde_json::to_string(&output)?,
        })
    }
}

/// Parse raw call arguments into a keyed structure.
///
/// Blank arguments are treated as an empty object, since models commonly
/// send `""` for parameterless functions.
fn parse_arguments(raw: &str) -> Result<ToolArgs> {
    if raw.trim().is_empty() {
        return Ok(ToolArgs::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(TurnstileError::Tool(format!(
            "arguments must be a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(TurnstileError::Tool(format!("malformed arguments: {}", e))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Tool;
    use serde_json::json;

    struct Panicky;

    impl Tool for Panicky {
        fn name(&self) -> &str {
            "panicky"
        }

        fn description(&self) -> &str {
            "Panics"
        }

        fn parameters(&self) -> Value {
            json!({"type": "object"})
        }

        fn invoke(&self, _args: ToolArgs) -> Result<Value> {
            panic!("tool exploded");
        }
    }

    fn executor() -> ToolCallExecutor {
        let mut registry = ToolRegistry::with_builtins();
        registry.register(Box::new(Panicky));
        ToolCallExecutor::new(Arc::new(registry))
    }

    #[test]
    fn test_execute_resolved_call() {
        let results = executor().execute(&[ToolCallRequest::new(
            "call_1",
            "echo",
            r#"{"message": "hi"}"#,
        )]);
        assert_eq!(
            results,
            vec![ToolCallResult {
                call_id: "call_1".into(),
                serialized_result: "\"hi\"".into(),
            }]
        );
    }

    #[test]
    fn test_unknown_function_skipped_siblings_run() {
        let results = executor().execute(&[
            ToolCallRequest::new("a", "does_not_exist", "{}"),
            ToolCallRequest::new("b", "echo", r#"{"message": "ok"}"#),
        ]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].call_id, "b");
    }

    #[test]
    fn test_panic_is_contained() {
        let results = executor().execute(&[
            ToolCallRequest::new("p", "panicky", "{}"),
            ToolCallRequest::new("e", "echo", r#"{"message": "after"}"#),
        ]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].call_id, "e");
    }

    #[test]
    fn test_bad_arguments_skipped() {
        let results = executor().execute(&[
            ToolCallRequest::new("1", "echo", "not json"),
            ToolCallRequest::new("2", "echo", "[1, 2]"),
            ToolCallRequest::new("3", "echo", r#"{"wrong": "field"}"#),
        ]);
        assert!(results.is_empty());
    }

    #[test]
    fn test_results_preserve_request_order() {
        let results = executor().execute(&[
            ToolCallRequest::new("z", "echo", r#"{"message": "first"}"#),
            ToolCallRequest::new("a", "current_time", ""),
            ToolCallRequest::new("m", "echo", r#"{"message": "third"}"#),
        ]);
        let ids: Vec<&str> = results.iter().map(|r| r.call_id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_parse_arguments() {
        assert!(parse_arguments("  ").unwrap().is_empty());
        assert_eq!(parse_arguments(r#"{"k": 1}"#).unwrap()["k"], json!(1));
        let err = parse_arguments("\"str\"").unwrap_err();
        assert!(err.to_string().contains("a string"));
    }
}
