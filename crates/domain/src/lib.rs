//! Shared domain types for Herald: the message/history model, tool
//! call types, turn outcomes, runtime events, errors, and config.
//!
//! Everything here is transport-agnostic: channel adapters, LLM
//! providers, and storage backends all speak these types.

pub mod config;
pub mod error;
pub mod event;
pub mod keys;
pub mod message;
pub mod outcome;
pub mod stream;
pub mod tool;

pub use error::{Error, Result};
pub use message::{flatten, Message, Role};
pub use tool::{ToolCall, ToolDefinition, ToolExecutionOutcome, ToolFailureKind, ToolResult};
