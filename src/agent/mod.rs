//! Agent module - generation coordination and message dispatch
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────────────┐
//! │  MessageBus │────>│ Dispatcher  │────>│ GenerationCoordinator│
//! │  (inbound)  │     │             │     │                      │
//! └─────────────┘     └─────────────┘     └──────────────────────┘
//!                            │               │        │        │
//!                            ▼               ▼        ▼        ▼
//!                     ┌─────────────┐  ┌─────────┐ ┌──────┐ ┌───────┐
//!                     │  MessageBus │  │Processor│ │Provi-│ │ Tools │
//!                     │  (outbound) │  │Registry │ │ der  │ │       │
//!                     └─────────────┘  └─────────┘ └──────┘ └───────┘
//! ```
//!
//! The coordinator is usable on its own; the dispatcher adds history
//! persistence and bus delivery around it.

mod coordinator;
mod dispatcher;

pub use coordinator::GenerationCoordinator;
pub use dispatcher::Dispatcher;
