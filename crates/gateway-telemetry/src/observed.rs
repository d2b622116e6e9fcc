//! Instrumented completer wrapper.

use crate::metrics::{CompletionMetrics, Outcome};
use futures::{Stream, StreamExt};
use gateway_core::{
    CompleteOptions, Completer, Delta, DeltaStream, GatewayResult, Message, Usage,
};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Span};

/// Wraps a completer so every completion runs inside a span and feeds
/// [`CompletionMetrics`].
pub struct ObservedCompleter {
    backend: Arc<str>,
    inner: Arc<dyn Completer>,
    metrics: Arc<CompletionMetrics>,
}

impl ObservedCompleter {
    /// Wrap a completer
    pub fn new(
        backend: impl Into<Arc<str>>,
        inner: Arc<dyn Completer>,
        metrics: Arc<CompletionMetrics>,
    ) -> Self {
        Self {
            backend: backend.into(),
            inner,
            metrics,
        }
    }
}

impl std::fmt::Debug for ObservedCompleter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservedCompleter")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl Completer for ObservedCompleter {
    fn complete(&self, messages: Vec<Message>, options: CompleteOptions) -> DeltaStream {
        let span = info_span!(
            "completion",
            backend = %self.backend,
            messages = messages.len(),
            tools = options.tools.len(),
            otel.kind = "client"
        );
        let inner = {
            let _enter = span.enter();
            self.inner.complete(messages, options)
        };

        ObservedStream {
            inner,
            span,
            backend: Arc::clone(&self.backend),
            metrics: Arc::clone(&self.metrics),
            started: None,
            first_delta: false,
            usage: Usage::default(),
            finished: false,
        }
        .boxed()
    }
}

struct ObservedStream {
    inner: DeltaStream,
    span: Span,
    backend: Arc<str>,
    metrics: Arc<CompletionMetrics>,
    started: Option<Instant>,
    first_delta: bool,
    usage: Usage,
    finished: bool,
}

impl ObservedStream {
    fn elapsed(&self) -> f64 {
        self.started.map_or(0.0, |s| s.elapsed().as_secs_f64())
    }

    fn finish(&mut self, outcome: Outcome) {
        if self.finished {
            return;
        }
        self.finished = true;
        let seconds = self.elapsed();
        self.metrics
            .observe_completion(&self.backend, outcome, seconds, self.usage);
        info!(
            outcome = outcome.as_str(),
            duration_ms = (seconds * 1000.0) as u64,
            input_tokens = self.usage.input_tokens,
            output_tokens = self.usage.output_tokens,
            "Completion finished"
        );
    }
}

impl Stream for ObservedStream {
    type Item = GatewayResult<Delta>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let span = this.span.clone();
        let _enter = span.enter();

        // Latency is measured from the first poll: the request starts there.
        this.started.get_or_insert_with(Instant::now);

        match this.inner.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(delta))) => {
                if !this.first_delta {
                    this.first_delta = true;
                    let seconds = this.elapsed();
                    this.metrics.observe_first_token(&this.backend, seconds);
                    debug!(ttft_ms = (seconds * 1000.0) as u64, "First delta");
                }
                if let Some(usage) = delta.usage {
                    if usage.input_tokens > 0 {
                        this.usage.input_tokens = usage.input_tokens;
                    }
                    if usage.output_tokens > 0 {
                        this.usage.output_tokens = usage.output_tokens;
                    }
                }
                Poll::Ready(Some(Ok(delta)))
            }
            Poll::Ready(Some(Err(e))) => {
                warn!(error = %e, "Completion failed");
                this.finish(Outcome::Error);
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.finish(Outcome::Success);
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for ObservedStream {
    fn drop(&mut self) {
        if self.started.is_some() && !self.finished {
            let span = self.span.clone();
            let _enter = span.enter();
            self.finish(Outcome::Cancelled);
        }
    }
}
