//! Bulkhead pattern for backend isolation.
//!
//! Limits how many completions a single backend runs at once. A permit is
//! held for the whole lifetime of a delta stream, not just its first poll.

use futures::StreamExt;
use gateway_core::{CompleteOptions, Completer, DeltaStream, GatewayError, Message};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

/// Bulkhead configuration
#[derive(Debug, Clone)]
pub struct BulkheadConfig {
    /// Maximum concurrent completions
    pub max_concurrent: u32,
    /// How long a completion may wait for a slot
    pub queue_timeout: Duration,
}

impl Default for BulkheadConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 100,
            queue_timeout: Duration::from_secs(10),
        }
    }
}

/// Concurrency limiter for one backend
pub struct Bulkhead {
    /// Identifier (usually the backend name)
    id: String,
    /// Configuration
    config: BulkheadConfig,
    /// Semaphore for concurrency control
    semaphore: Arc<Semaphore>,
}

impl Bulkhead {
    /// Create a new bulkhead
    #[must_use]
    pub fn new(id: impl Into<String>, config: BulkheadConfig) -> Self {
        Self {
            id: id.into(),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent as usize)),
            config,
        }
    }

    /// Get the bulkhead ID
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for a slot
    ///
    /// # Errors
    /// Returns a retryable provider error when the queue timeout elapses
    pub async fn acquire(&self) -> Result<BulkheadPermit, GatewayError> {
        match tokio::time::timeout(
            self.config.queue_timeout,
            Arc::clone(&self.semaphore).acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => {
                debug!(
                    bulkhead = %self.id,
                    active = self.active_requests(),
                    "Bulkhead permit acquired"
                );
                Ok(BulkheadPermit {
                    _permit: permit,
                    bulkhead_id: self.id.clone(),
                })
            }
            Ok(Err(_)) => Err(GatewayError::internal("Bulkhead semaphore closed")),
            Err(_) => {
                warn!(
                    bulkhead = %self.id,
                    timeout_ms = self.config.queue_timeout.as_millis() as u64,
                    "Bulkhead queue timeout"
                );
                Err(GatewayError::provider(
                    self.id.clone(),
                    "Bulkhead queue timeout - too many concurrent requests",
                    Some(503),
                    true,
                ))
            }
        }
    }

    /// Get the number of running completions
    #[must_use]
    pub fn active_requests(&self) -> u32 {
        let available = self.semaphore.available_permits() as u32;
        self.config.max_concurrent.saturating_sub(available)
    }
}

/// A slot in a bulkhead, released when dropped
pub struct BulkheadPermit {
    _permit: OwnedSemaphorePermit,
    bulkhead_id: String,
}

impl Drop for BulkheadPermit {
    fn drop(&mut self) {
        debug!(bulkhead = %self.bulkhead_id, "Bulkhead permit released");
    }
}

/// Completer that runs its inner completer behind a [`Bulkhead`]
pub struct BulkheadCompleter<C: ?Sized> {
    inner: Arc<C>,
    bulkhead: Arc<Bulkhead>,
}

impl<C: Completer + ?Sized> BulkheadCompleter<C> {
    /// Wrap a completer
    #[must_use]
    pub fn new(inner: Arc<C>, bulkhead: Bulkhead) -> Self {
        Self {
            inner,
            bulkhead: Arc::new(bulkhead),
        }
    }

    /// Get the bulkhead
    #[must_use]
    pub fn bulkhead(&self) -> &Bulkhead {
        &self.bulkhead
    }
}

impl<C: Completer + ?Sized + 'static> Completer for BulkheadCompleter<C> {
    fn complete(&self, messages: Vec<Message>, options: CompleteOptions) -> DeltaStream {
        let inner = Arc::clone(&self.inner);
        let bulkhead = Arc::clone(&self.bulkhead);

        Box::pin(async_stream::stream! {
            let permit = match bulkhead.acquire().await {
                Ok(permit) => permit,
                Err(err) => {
                    yield Err(err);
                    return;
                }
            };

            let mut deltas = inner.complete(messages, options);
            while let Some(item) = deltas.next().await {
                yield item;
            }
            drop(permit);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::Delta;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::sleep;

    struct Slow {
        running: Arc<AtomicU32>,
        peak: Arc<AtomicU32>,
    }

    impl Completer for Slow {
        fn complete(&self, _messages: Vec<Message>, _options: CompleteOptions) -> DeltaStream {
            let running = Arc::clone(&self.running);
            let peak = Arc::clone(&self.peak);
            Box::pin(async_stream::stream! {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                yield Ok(Delta::text("done"));
            })
        }
    }

    fn slow() -> (Arc<Slow>, Arc<AtomicU32>) {
        let peak = Arc::new(AtomicU32::new(0));
        let completer = Arc::new(Slow {
            running: Arc::new(AtomicU32::new(0)),
            peak: Arc::clone(&peak),
        });
        (completer, peak)
    }

    #[tokio::test]
    async fn test_bulkhead_acquire_release() {
        let bulkhead = Bulkhead::new(
            "test",
            BulkheadConfig {
                max_concurrent: 2,
                queue_timeout: Duration::from_secs(1),
            },
        );

        let permit1 = bulkhead.acquire().await.expect("acquire 1");
        let permit2 = bulkhead.acquire().await.expect("acquire 2");
        assert_eq!(bulkhead.active_requests(), 2);

        drop(permit1);
        assert_eq!(bulkhead.active_requests(), 1);
        drop(permit2);
        assert_eq!(bulkhead.active_requests(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_completer_respects_limit() {
        let (inner, peak) = slow();
        let completer = Arc::new(BulkheadCompleter::new(
            inner,
            Bulkhead::new(
                "slow",
                BulkheadConfig {
                    max_concurrent: 2,
                    queue_timeout: Duration::from_secs(5),
                },
            ),
        ));

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let completer = Arc::clone(&completer);
                tokio::spawn(async move {
                    let items: Vec<_> = completer.complete(vec![], CompleteOptions::new()).collect().await;
                    assert_eq!(items.len(), 1);
                })
            })
            .collect();

        for handle in handles {
            handle.await.expect("join");
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(completer.bulkhead().active_requests(), 0);
    }

    #[tokio::test]
    async fn test_completer_queue_timeout() {
        let (inner, _) = slow();
        let completer = BulkheadCompleter::new(
            inner,
            Bulkhead::new(
                "slow",
                BulkheadConfig {
                    max_concurrent: 1,
                    queue_timeout: Duration::from_millis(5),
                },
            ),
        );

        let _held = completer.bulkhead().acquire().await.expect("acquire");
        let items: Vec<_> = completer.complete(vec![], CompleteOptions::new()).collect().await;

        assert_eq!(items.len(), 1);
        assert!(matches!(
            items[0],
            Err(GatewayError::Provider { retryable: true, .. })
        ));
    }
}
