//! Tools module - Tool definitions and execution for model function calling
//!
//! # Overview
//!
//! - [`Tool`]: untyped interface (JSON object in, JSON value out)
//! - [`TypedTool`]: typed interface with serde-validated arguments
//! - [`ToolRegistry`]: closed table of tools built at startup
//! - [`ToolCallExecutor`]: runs model-issued calls with per-call isolation
//!
//! # Built-in Tools
//!
//! - [`EchoTool`](builtin::EchoTool): echoes a message back
//! - [`CurrentTimeTool`](builtin::CurrentTimeTool): reports the current time
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use turnstile::history::ToolCallRequest;
//! use turnstile::tools::{ToolCallExecutor, ToolRegistry};
//!
//! let executor = ToolCallExecutor::new(Arc::new(ToolRegistry::with_builtins()));
//! let results = executor.execute(&[
//!     ToolCallRequest::new("call_1", "echo", r#"{"message": "Hello!"}"#),
//!     ToolCallRequest::new("call_2", "not_registered", "{}"),
//! ]);
//!
//! assert_eq!(results.len(), 1);
//! assert_eq!(results[0].serialized_result, "\"Hello!\"");
//! ```

pub mod builtin;
mod executor;
mod registry;
mod types;

pub use builtin::{CurrentTimeTool, EchoTool};
pub use executor::ToolCallExecutor;
pub use registry::ToolRegistry;
pub use types::{Tool, ToolArgs, Typed, TypedTool};
