//! Anthropic Messages API (`/v1/messages`).

pub mod convert;
pub mod stream;
pub mod types;

pub use convert::{error_response, message_response, to_completion};
pub use stream::AnthropicWriter;
pub use types::{MessagesRequest, StreamEvent};
