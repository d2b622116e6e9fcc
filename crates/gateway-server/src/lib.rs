//! # Gateway Server
//!
//! The HTTP surface of the completion gateway.
//!
//! Every front-end protocol gets its own handler that translates the request,
//! hands it to the model's router and renders the resulting delta stream
//! either as one JSON body or as server-sent events:
//!
//! | Route | Protocol |
//! |---|---|
//! | `POST /v1/messages` | Anthropic Messages |
//! | `POST /v1/chat/completions` | OpenAI Chat Completions |
//! | `POST /v1/responses` | OpenAI Responses |
//! | `POST /v1beta/models/{model}:generateContent` | Gemini |
//! | `POST /v1beta/models/{model}:streamGenerateContent` | Gemini, streamed |

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod shutdown;
pub mod state;
pub mod streaming;

// Re-export main types
pub use error::{ApiError, Protocol};
pub use routes::create_router;
pub use server::Server;
pub use shutdown::shutdown_signal;
pub use state::{AppState, AppStateBuilder, ModelRoute};
