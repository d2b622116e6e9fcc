//! Scripted completers for router tests.

use gateway_core::{CompleteOptions, Completer, Delta, DeltaStream, GatewayError, Message};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub(crate) struct MockCompleter {
    pub(crate) name: String,
    pub(crate) delay: Duration,
    pub(crate) deltas: Vec<Delta>,
    pub(crate) error: Option<GatewayError>,
    pub(crate) calls: AtomicUsize,
}

impl MockCompleter {
    pub(crate) fn answering(name: &str, text: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            delay: Duration::ZERO,
            deltas: vec![Delta::text(text)],
            error: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn failing(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            delay: Duration::ZERO,
            deltas: Vec::new(),
            error: Some(GatewayError::provider(name, "upstream exploded", Some(500), true)),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn empty(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            delay: Duration::ZERO,
            deltas: Vec::new(),
            error: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn streaming(name: &str, deltas: Vec<Delta>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            delay,
            deltas,
            error: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Completer for MockCompleter {
    fn complete(&self, _messages: Vec<Message>, _options: CompleteOptions) -> DeltaStream {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay;
        let deltas = self.deltas.clone();
        let error = self.error.clone();
        let name = self.name.clone();

        Box::pin(async_stream::stream! {
            for delta in deltas {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                yield Ok(delta.with_model(name.clone()));
            }
            if let Some(err) = error {
                yield Err(err);
            }
        })
    }
}
