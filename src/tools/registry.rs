//! Tool registry for Turnstile
//!
//! A closed table of tools, populated at startup and read-only afterwards.

use std::collections::BTreeMap;
use std::time::Instant;

use serde_json::Value;
use tracing::{error, info};

use crate::error::{Result, TurnstileError};
use crate::providers::ToolDefinition;

use super::{builtin, Tool, ToolArgs, Typed, TypedTool};

/// Registry of tools keyed by function name.
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Create a registry holding the built-in `echo` and `current_time` tools.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_typed(builtin::EchoTool);
        registry.register_typed(builtin::CurrentTimeTool);
        registry
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        info!(tool = %name, "Registering tool");
        self.tools.insert(name, tool);
    }

    /// Register a typed tool.
    pub fn register_typed<T: TypedTool + 'static>(&mut self, tool: T) {
        self.register(Box::new(Typed(tool)));
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Invoke a tool by name, logging duration and outcome.
    pub fn invoke(&self, name: &str, args: ToolArgs) -> Result<Value> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| TurnstileError::ToolNotFound(name.to_string()))?;

        let start = Instant::now();

        match tool.invoke(args) {
            Ok(output) => {
                info!(
                    tool = name,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Tool executed successfully"
                );
                Ok(output)
            }
            Err(e) => {
                error!(
                    tool = name,
                    error = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Tool execution failed"
                );
                Err(e)
            }
        }
    }

    /// Definitions of every registered tool, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|t| ToolDefinition::new(t.name(), t.description(), t.parameters()))
            .collect()
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::builtin::EchoTool;
    use serde_json::json;

    struct Failing;

    impl Tool for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        fn parameters(&self) -> Value {
            json!({"type": "object"})
        }

        fn invoke(&self, _args: ToolArgs) -> Result<Value> {
            Err(TurnstileError::Tool("boom".into()))
        }
    }

    fn args(value: Value) -> ToolArgs {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_registry_new() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_registry_with_builtins() {
        let registry = ToolRegistry::with_builtins();
        assert_eq!(registry.names(), vec!["current_time", "echo"]);
    }

    #[test]
    fn test_registry_register_and_get() {
        let mut registry = ToolRegistry::new();
        registry.register_typed(EchoTool);

        assert!(registry.has("echo"));
        assert_eq!(registry.get("echo").map(|t| t.name()), Some("echo"));
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_registry_invoke() {
        let registry = ToolRegistry::with_builtins();
        let out = registry.invoke("echo", args(json!({"message": "hello"}))).unwrap();
        assert_eq!(out, json!("hello"));
    }

    #[test]
    fn test_registry_invoke_unknown() {
        let registry = ToolRegistry::new();
        let err = registry.invoke("missing", ToolArgs::new()).unwrap_err();
        assert!(matches!(err, TurnstileError::ToolNotFound(name) if name == "missing"));
    }

    #[test]
    fn test_registry_invoke_error_propagates() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(Failing));
        assert!(registry.invoke("failing", ToolArgs::new()).is_err());
    }

    #[test]
    fn test_registry_definitions_sorted() {
        let mut registry = ToolRegistry::with_builtins();
        registry.register(Box::new(Failing));

        let names: Vec<String> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["current_time", "echo", "failing"]);
        assert!(registry.definitions()[1].parameters.is_object());
    }
}
