//! OpenAI Chat Completions API (`/v1/chat/completions`).

pub mod convert;
pub mod stream;
pub mod types;

pub use convert::{completion_response, error_response, to_completion, ChunkTranslator};
pub use stream::ChatWriter;
pub use types::{ChatCompletionChunk, ChatCompletionRequest, ChatEvent};
