//! Tool types for Turnstile
//!
//! Tools are synchronous: they take a keyed argument structure (a JSON
//! object) and return a serializable value. [`TypedTool`] adds argument
//! validation through serde before the tool body runs.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Result, TurnstileError};

/// Keyed arguments passed to a tool.
pub type ToolArgs = Map<String, Value>;

/// A callable exposed to the model.
pub trait Tool: Send + Sync {
    /// Function name the model calls.
    fn name(&self) -> &str;

    /// Human-readable description shown to the model.
    fn description(&self) -> &str;

    /// JSON Schema for the arguments.
    fn parameters(&self) -> Value;

    /// Run the tool. Errors are reported per call and never abort a
    /// generation.
    fn invoke(&self, args: ToolArgs) -> Result<Value>;
}

/// A tool with typed, validated arguments and a typed return value.
///
/// Register through [`ToolRegistry::register_typed`](super::ToolRegistry::register_typed),
/// which wraps it in [`Typed`].
///
/// # Example
/// ```
/// use serde::Deserialize;
/// use serde_json::{json, Value};
/// use turnstile::tools::{Tool, Typed, TypedTool};
///
/// #[derive(Deserialize)]
/// struct AddArgs { a: i64, b: i64 }
///
/// struct Add;
///
/// impl TypedTool for Add {
///     type Args = AddArgs;
///     type Output = i64;
///     fn name(&self) -> &str { "add" }
///     fn description(&self) -> &str { "Add two integers" }
///     fn parameters(&self) -> Value { json!({"type": "object"}) }
///     fn call(&self, args: AddArgs) -> turnstile::Result<i64> { Ok(args.a + args.b) }
/// }
///
/// let tool = Typed(Add);
/// let args = json!({"a": 2, "b": 3}).as_object().cloned().unwrap();
/// assert_eq!(tool.invoke(args).unwrap(), json!(5));
/// ```
pub trait TypedTool: Send + Sync {
    type Args: DeserializeOwned;
    type Output: Serialize;

    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters(&self) -> Value;
    fn call(&self, args: Self::Args) -> Result<Self::Output>;
}

/// Adapter exposing a [`TypedTool`] through the untyped [`Tool`] interface.
pub struct Typed<T>(pub T);

impl<T: TypedTool> Tool for Typed<T> {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn description(&self) -> &str {
        self.0.description()
    }

    fn parameters(&self) -> Value {
        self.0.parameters()
    }

    fn invoke(&self, args: ToolArgs) -> Result<Value> {
        let args: T::Args = serde_json::from_value(Value::Object(args)).map_err(|e| {
            TurnstileError::Tool(format!("invalid arguments for '{}': {}", self.0.name(), e))
        })?;
        let output = self.0.call(args)?;
        Ok(serde_json::to_value(output)?)
    }
}
