//! Backend pool shared by the routers.
//!
//! Holds each backend together with its health tracker and implements the
//! dispatch bookkeeping every strategy shares: in-flight accounting, time to
//! first token, and success or failure recording.

use futures::StreamExt;
use gateway_core::{CompleteOptions, Completer, DeltaStream, GatewayError, GatewayResult, Message};
use gateway_resilience::{HealthConfig, HealthSnapshot, InflightGuard, ProviderHealth};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// A named completer that a router may dispatch to
#[derive(Clone)]
pub struct Backend {
    name: String,
    completer: Arc<dyn Completer>,
}

impl Backend {
    /// Create a backend
    pub fn new(name: impl Into<String>, completer: Arc<dyn Completer>) -> Self {
        Self {
            name: name.into(),
            completer,
        }
    }

    /// Backend name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Health of one pool member, as reported to operators
#[derive(Debug, Clone, Serialize)]
pub struct BackendHealth {
    /// Backend name
    pub name: String,
    /// Circuit state
    pub state: gateway_resilience::CircuitState,
    /// Smoothed time to first token in milliseconds
    pub avg_ttft_ms: u64,
    /// Completed requests
    pub total_requests: u64,
    /// Failed requests
    pub total_failures: u64,
    /// Requests currently running
    pub inflight: i64,
}

impl BackendHealth {
    fn new(name: &str, snapshot: &HealthSnapshot) -> Self {
        Self {
            name: name.to_string(),
            state: snapshot.state,
            avg_ttft_ms: snapshot.avg_ttft.as_millis() as u64,
            total_requests: snapshot.total_requests,
            total_failures: snapshot.total_failures,
            inflight: snapshot.inflight,
        }
    }
}

pub(crate) struct Member {
    pub(crate) backend: Backend,
    pub(crate) health: Arc<ProviderHealth>,
}

/// Backends with their trackers, owned by one router for its lifetime
pub(crate) struct Pool {
    members: Vec<Member>,
}

impl Pool {
    pub(crate) fn new(backends: Vec<Backend>, config: HealthConfig) -> GatewayResult<Self> {
        if backends.is_empty() {
            return Err(GatewayError::configuration(
                "at least one backend is required",
            ));
        }

        let members = backends
            .into_iter()
            .map(|backend| Member {
                health: Arc::new(ProviderHealth::new(backend.name.clone(), config)),
                backend,
            })
            .collect();

        Ok(Self { members })
    }

    pub(crate) fn len(&self) -> usize {
        self.members.len()
    }

    pub(crate) fn member(&self, index: usize) -> &Member {
        &self.members[index]
    }

    /// Indices of backends that currently accept requests
    pub(crate) fn available(&self) -> Vec<usize> {
        self.members
            .iter()
            .enumerate()
            .filter(|(_, m)| m.health.is_available())
            .map(|(i, _)| i)
            .collect()
    }

    /// Pick the backend that failed longest ago and let it probe.
    ///
    /// Used when every circuit is open, so some backend always gets the
    /// request.
    pub(crate) fn fallback(&self) -> usize {
        let index = self
            .members
            .iter()
            .enumerate()
            .min_by_key(|(_, m)| m.health.last_failure())
            .map_or(0, |(i, _)| i);

        let member = &self.members[index];
        warn!(
            backend = %member.backend.name,
            "No backend available, falling back to least recently failed"
        );
        member.health.force_half_open();
        index
    }

    /// Select a backend and take an in-flight slot on it.
    ///
    /// A half-open backend admits one probe at a time; when a concurrent
    /// request took it first, selection runs again. After one attempt per
    /// backend the fallback is admitted unconditionally.
    pub(crate) fn admit<F>(&self, select: &F) -> (usize, InflightGuard)
    where
        F: Fn(&Self) -> usize,
    {
        for _ in 0..self.members.len() {
            let index = select(self);
            let member = &self.members[index];
            if let Some(guard) = member.health.try_begin_request() {
                return (index, guard);
            }
            debug!(backend = %member.backend.name, "Backend not admitting, reselecting");
        }

        let index = self.fallback();
        (index, self.members[index].health.begin_request())
    }

    pub(crate) fn health(&self) -> Vec<BackendHealth> {
        self.members
            .iter()
            .map(|m| BackendHealth::new(&m.backend.name, &m.health.snapshot()))
            .collect()
    }

    /// Lazily select a backend and stream its deltas with bookkeeping.
    ///
    /// `select` runs on the first poll, through [`Pool::admit`]. With
    /// `track_latency` the time to first token feeds the backend's latency
    /// average.
    pub(crate) fn dispatch<F>(
        self: Arc<Self>,
        select: F,
        track_latency: bool,
        messages: Vec<Message>,
        options: CompleteOptions,
    ) -> DeltaStream
    where
        F: Fn(&Self) -> usize + Send + 'static,
    {
        Box::pin(async_stream::stream! {
            let pool: &Self = &self;
            let (index, guard) = pool.admit(&select);
            let member = pool.member(index);
            let mut outcome = Outcome::new(guard, track_latency);

            debug!(backend = %member.backend.name, "Dispatching completion");

            let mut deltas = member.backend.completer.complete(messages, options);
            while let Some(item) = deltas.next().await {
                match item {
                    Ok(delta) => {
                        outcome.delta();
                        yield Ok(delta);
                    }
                    Err(err) => {
                        warn!(
                            backend = %member.backend.name,
                            error = %err,
                            "Backend completion failed"
                        );
                        outcome.error();
                        yield Err(err);
                        break;
                    }
                }
            }
        })
    }
}

/// Records the result of one dispatched request when dropped.
///
/// Dropping happens on completion, on error and on cancellation alike, so the
/// in-flight slot is always released after the outcome is recorded.
struct Outcome {
    guard: InflightGuard,
    started: Instant,
    ttft: Option<Duration>,
    failed: bool,
    track_latency: bool,
}

impl Outcome {
    fn new(guard: InflightGuard, track_latency: bool) -> Self {
        Self {
            guard,
            started: Instant::now(),
            ttft: None,
            failed: false,
            track_latency,
        }
    }

    fn delta(&mut self) {
        if self.ttft.is_none() {
            self.ttft = Some(self.started.elapsed());
        }
    }

    fn error(&mut self) {
        self.failed = true;
    }
}

impl Drop for Outcome {
    fn drop(&mut self) {
        let health = self.guard.health();
        match self.ttft {
            Some(ttft) if !self.failed => {
                health.record_success(self.track_latency.then_some(ttft));
            }
            _ => health.record_failure(),
        }
    }
}
