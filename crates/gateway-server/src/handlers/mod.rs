//! HTTP request handlers, one module per front-end protocol.

pub mod anthropic;
pub mod gemini;
pub mod openai;
pub mod ops;

use crate::streaming;
use axum::body::Bytes;
use axum::response::Response;
use gateway_core::{complete_to_end, CompleteOptions, Delta, GatewayResult, Message};
use gateway_protocols::{invalid_request, FrameWriter, ResponseMeta, StreamEmitter};
use gateway_routing::Router;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

/// Decode a JSON request body
fn parse<T: DeserializeOwned>(body: &Bytes) -> GatewayResult<T> {
    serde_json::from_slice(body).map_err(|e| invalid_request(&e))
}

/// A translated request bound to the router that will serve it
struct Call {
    router: Arc<dyn Router>,
    messages: Vec<Message>,
    options: CompleteOptions,
    meta: ResponseMeta,
}

impl Call {
    fn new(
        router: Arc<dyn Router>,
        (messages, options): (Vec<Message>, CompleteOptions),
        meta: ResponseMeta,
    ) -> Self {
        debug!(
            response = %meta.id,
            model = %meta.model,
            strategy = router.strategy(),
            messages = messages.len(),
            tools = options.tools.len(),
            "Dispatching completion"
        );
        Self {
            router,
            messages,
            options,
            meta,
        }
    }

    /// Schema-constrained requests get tool-call output rendered as text
    fn structured(&self) -> bool {
        self.options.schema.is_some()
    }

    /// Answer with an event stream rendered by `writer`
    async fn stream<W>(self, writer: W) -> GatewayResult<Response>
    where
        W: FrameWriter + Send + 'static,
        W::Event: Send,
    {
        let structured = self.structured();
        let deltas = self.router.complete(self.messages, self.options);
        let (first, rest) = streaming::first_delta(deltas).await?;
        let emitter = StreamEmitter::new(writer, self.meta).with_structured_output(structured);
        Ok(streaming::respond(first, rest, emitter))
    }

    /// Run the completion to its end
    async fn collect(self) -> GatewayResult<(ResponseMeta, Delta)> {
        let structured = self.structured();
        let result = complete_to_end(&self.router, self.messages, self.options).await?;
        let result = if structured {
            result.into_structured_text()
        } else {
            result
        };
        Ok((self.meta, result))
    }
}
