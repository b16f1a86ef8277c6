//! Configuration validation with unknown field detection.
//!
//! Serde silently ignores unknown keys, so a typo such as `"modle"` would
//! otherwise fall back to the default without complaint.

use serde_json::Value;

/// Known top-level config field names.
const KNOWN_TOP_LEVEL: &[&str] = &["provider", "prompts", "history", "bus", "logging"];

const KNOWN_PROVIDER: &[&str] = &["api_key", "api_base", "model", "max_tokens", "temperature"];
const KNOWN_PROMPTS: &[&str] = &["dir", "system_prompt"];
const KNOWN_HISTORY: &[&str] = &["backend", "path"];
const KNOWN_BUS: &[&str] = &["buffer_size"];
const KNOWN_LOGGING: &[&str] = &["level", "format", "file"];

/// A validation diagnostic.
#[derive(Debug)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub path: String,
    pub message: String,
}

#[derive(Debug, PartialEq)]
pub enum DiagnosticLevel {
    Ok,
    Warn,
    Error,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.level {
            DiagnosticLevel::Ok => "[OK]",
            DiagnosticLevel::Warn => "[WARN]",
            DiagnosticLevel::Error => "[ERROR]",
        };
        if self.path.is_empty() {
            write!(f, "{} {}", prefix, self.message)
        } else {
            write!(f, "{} {}: {}", prefix, self.path, self.message)
        }
    }
}

/// Simple Levenshtein distance for "did you mean?" suggestions.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Suggest the closest known field name (if distance <= 3).
pub fn suggest_field(unknown: &str, known: &[&str]) -> Option<String> {
    known
        .iter()
        .map(|k| (k, levenshtein(unknown, k)))
        .filter(|(_, d)| *d <= 3)
        .min_by_key(|(_, d)| *d)
        .map(|(k, _)| format!("did you mean '{}'?", k))
}

fn unknown_field(path: String, key: &str, known: &[&str]) -> Diagnostic {
    let message = match suggest_field(key, known) {
        Some(suggestion) => format!("Unknown field '{}' ({})", key, suggestion),
        None => format!("Unknown field '{}'", key),
    };
    Diagnostic {
        level: DiagnosticLevel::Error,
        path,
        message,
    }
}

/// Validate a raw JSON config value against known field names.
pub fn validate_config(raw: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let Some(obj) = raw.as_object() else {
        diagnostics.push(Diagnostic {
            level: DiagnosticLevel::Error,
            path: String::new(),
            message: "Config must be a JSON object".to_string(),
        });
        return diagnostics;
    };

    diagnostics.push(Diagnostic {
        level: DiagnosticLevel::Ok,
        path: String::new(),
        message: "Valid JSON".to_string(),
    });

    let mut has_unknown = false;
    for (key, value) in obj {
        let known_fields = match key.as_str() {
            "provider" => KNOWN_PROVIDER,
            "prompts" => KNOWN_PROMPTS,
            "history" => KNOWN_HISTORY,
            "bus" => KNOWN_BUS,
            "logging" => KNOWN_LOGGING,
            _ => {
                has_unknown = true;
                diagnostics.push(unknown_field(key.clone(), key, KNOWN_TOP_LEVEL));
                continue;
            }
        };

        if let Some(section) = value.as_object() {
            for field in section.keys() {
                if !known_fields.contains(&field.as_str()) {
                    has_unknown = true;
                    diagnostics.push(unknown_field(
                        format!("{}.{}", key, field),
                        field,
                        known_fields,
                    ));
                }
            }
        }
    }

    if !has_unknown {
        diagnostics.push(Diagnostic {
            level: DiagnosticLevel::Ok,
            path: String::new(),
            message: "All fields recognized".to_string(),
        });
    }

    let api_key_in_file = obj
        .get("provider")
        .and_then(|p| p.get("api_key"))
        .and_then(Value::as_str)
        .map(|k| !k.is_empty())
        .unwrap_or(false);
    if api_key_in_file {
        diagnostics.push(Diagnostic {
            level: DiagnosticLevel::Warn,
            path: "provider.api_key".to_string(),
            message: "Stored in plain text; prefer TURNSTILE_PROVIDER_API_KEY".to_string(),
        });
    }

    diagnostics
}
