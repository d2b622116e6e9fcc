//! # Gateway Providers
//!
//! Upstream backends for the completion gateway.
//!
//! The gateway talks to model servers through a single adapter,
//! [`OpenAiCompleter`], which speaks the OpenAI chat completions streaming
//! dialect understood by OpenAI itself and by most self-hosted servers
//! (vLLM, Ollama, LiteLLM, llama.cpp).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod openai;
pub mod sse;

pub use openai::{OpenAiCompleter, OpenAiConfig};
pub use sse::SseDecoder;
