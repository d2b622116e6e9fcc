//! # Gateway Core
//!
//! Provider-agnostic types shared by every part of the gateway:
//! - The streamed [`Delta`] model and the [`Accumulator`] that folds it
//! - The [`Completer`] contract implemented by backends and routers
//! - Messages, generation options and the error taxonomy

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod accumulator;
pub mod completer;
pub mod delta;
pub mod error;
pub mod message;
pub mod options;

// Re-export commonly used types
pub use accumulator::Accumulator;
pub use completer::{complete_to_end, Completer, DeltaStream};
pub use delta::{Delta, FinishReason, Usage};
pub use error::{GatewayError, GatewayResult};
pub use message::{Content, File, Message, Reasoning, Role, Tool, ToolCall, ToolResult};
pub use options::{CompleteOptions, Effort, Format, Schema, StreamHandler, Verbosity};
