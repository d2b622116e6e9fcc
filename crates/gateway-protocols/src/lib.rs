//! # Gateway Protocols
//!
//! Client-facing wire protocols. Each protocol module converts its request
//! body into gateway messages and options, builds non-streaming responses
//! from an accumulated [`gateway_core::Delta`], and provides a
//! [`FrameWriter`] that renders the shared [`StreamEmitter`] lifecycle as the
//! protocol's server-sent events.
//!
//! | Module | Endpoint | Stream framing |
//! |---|---|---|
//! | [`anthropic`] | `/v1/messages` | named events, block indices |
//! | [`openai_chat`] | `/v1/chat/completions` | data-only chunks, `[DONE]` |
//! | [`openai_responses`] | `/v1/responses` | named events, sequence numbers |
//! | [`gemini`] | `/v1beta/models/{model}:generateContent` | data-only chunks |

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod anthropic;
pub mod convert;
pub mod emitter;
pub mod gemini;
pub mod openai_chat;
pub mod openai_responses;
pub mod sse;

pub use convert::{invalid_request, new_id};
pub use emitter::{Block, BlockKind, Completion, FrameWriter, ResponseMeta, StreamEmitter};
pub use sse::{ProtocolEvent, SseFrame};
