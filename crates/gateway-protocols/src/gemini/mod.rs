//! Gemini API (`/v1beta/models/{model}:generateContent`).

pub mod convert;
pub mod stream;
pub mod types;

pub use convert::{error_response, response, status_name, to_completion};
pub use stream::GeminiWriter;
pub use types::{GeminiEvent, GenerateContentRequest};
