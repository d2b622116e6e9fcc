//! OpenAI Responses API (`/v1/responses`).
//!
//! Errors returned before streaming starts use the chat completions error
//! body, which the two APIs share.

pub mod convert;
pub mod stream;
pub mod types;

pub use convert::{response, to_completion};
pub use stream::ResponsesWriter;
pub use types::{ResponseEvent, ResponsesRequest};
