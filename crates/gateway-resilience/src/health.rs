//! Per-backend health tracking.
//!
//! Each backend gets a three-state circuit breaker, an exponential moving
//! average of its time to first token, and a lock-free in-flight counter.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Latency estimate used before the first successful request
const INITIAL_TTFT: Duration = Duration::from_secs(1);

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Requests flow normally
    Closed,
    /// Backend is excluded from selection
    Open,
    /// One probe request is allowed through
    HalfOpen,
}

/// Health tracking configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthConfig {
    /// Consecutive failures before the circuit opens
    pub failure_threshold: u32,
    /// Time an open circuit waits before allowing a probe
    pub recovery_timeout: Duration,
    /// Smoothing factor of the latency moving average
    pub latency_alpha: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            latency_alpha: 0.3,
        }
    }
}

#[derive(Debug)]
struct HealthState {
    circuit: CircuitState,
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    total_requests: u64,
    total_failures: u64,
    avg_ttft: Duration,
    has_latency: bool,
}

/// Point-in-time view of a backend's health
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthSnapshot {
    /// Circuit state
    pub state: CircuitState,
    /// Smoothed time to first token
    pub avg_ttft: Duration,
    /// Completed requests
    pub total_requests: u64,
    /// Failed requests
    pub total_failures: u64,
    /// Current failure streak
    pub consecutive_failures: u32,
    /// Requests currently running
    pub inflight: i64,
}

impl HealthSnapshot {
    /// Fraction of completed requests that failed
    #[must_use]
    pub fn error_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.total_failures as f64 / self.total_requests as f64
        }
    }
}

/// Health tracker for a single backend
#[derive(Debug)]
pub struct ProviderHealth {
    /// Backend identifier
    provider_id: String,
    /// Configuration
    config: HealthConfig,
    /// Compound state; transitions happen under the write lock
    state: RwLock<HealthState>,
    /// Running requests, kept outside the lock
    inflight: AtomicI64,
}

impl ProviderHealth {
    /// Create a tracker in the closed state
    #[must_use]
    pub fn new(provider_id: impl Into<String>, config: HealthConfig) -> Self {
        Self {
            provider_id: provider_id.into(),
            config,
            state: RwLock::new(HealthState {
                circuit: CircuitState::Closed,
                consecutive_failures: 0,
                last_failure: None,
                total_requests: 0,
                total_failures: 0,
                avg_ttft: INITIAL_TTFT,
                has_latency: false,
            }),
            inflight: AtomicI64::new(0),
        }
    }

    /// Create with default configuration
    #[must_use]
    pub fn with_defaults(provider_id: impl Into<String>) -> Self {
        Self::new(provider_id, HealthConfig::default())
    }

    /// Get the provider ID
    #[must_use]
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// Get the current circuit state
    #[must_use]
    pub fn state(&self) -> CircuitState {
        self.state.read().circuit
    }

    /// Check whether the backend may receive a request.
    ///
    /// An open circuit whose recovery timeout has elapsed moves to half-open
    /// here. A half-open circuit admits a request only while nothing else is
    /// in flight.
    pub fn is_available(&self) -> bool {
        let circuit = self.state.read().circuit;
        match circuit {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => self.inflight() == 0,
            CircuitState::Open => {
                let mut state = self.state.write();
                match state.circuit {
                    CircuitState::Closed => true,
                    CircuitState::HalfOpen => self.inflight() == 0,
                    CircuitState::Open => {
                        let recovered = state
                            .last_failure
                            .map_or(true, |at| at.elapsed() >= self.config.recovery_timeout);
                        if recovered {
                            state.circuit = CircuitState::HalfOpen;
                            info!(
                                provider = %self.provider_id,
                                "Circuit breaker half-open, testing"
                            );
                        }
                        recovered
                    }
                }
            }
        }
    }

    /// Record a successful request.
    ///
    /// `ttft` updates the latency average; `None` leaves it untouched.
    pub fn record_success(&self, ttft: Option<Duration>) {
        let mut state = self.state.write();
        state.total_requests += 1;
        state.consecutive_failures = 0;

        if let Some(ttft) = ttft {
            if state.has_latency {
                let alpha = self.config.latency_alpha;
                let avg = alpha * ttft.as_secs_f64() + (1.0 - alpha) * state.avg_ttft.as_secs_f64();
                state.avg_ttft = Duration::from_secs_f64(avg.max(0.0));
            } else {
                state.avg_ttft = ttft;
                state.has_latency = true;
            }
        }

        if state.circuit == CircuitState::HalfOpen {
            state.circuit = CircuitState::Closed;
            info!(provider = %self.provider_id, "Circuit breaker closed");
        }

        debug!(
            provider = %self.provider_id,
            avg_ttft_ms = state.avg_ttft.as_millis() as u64,
            "Recorded success"
        );
    }

    /// Record a failed request
    pub fn record_failure(&self) {
        let mut state = self.state.write();
        state.total_requests += 1;
        state.total_failures += 1;
        state.consecutive_failures += 1;
        state.last_failure = Some(Instant::now());

        let open = match state.circuit {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => state.consecutive_failures >= self.config.failure_threshold,
            CircuitState::Open => false,
        };

        if open {
            state.circuit = CircuitState::Open;
            warn!(
                provider = %self.provider_id,
                consecutive_failures = state.consecutive_failures,
                "Circuit breaker opened"
            );
        } else {
            debug!(
                provider = %self.provider_id,
                consecutive_failures = state.consecutive_failures,
                threshold = self.config.failure_threshold,
                "Recorded failure"
            );
        }
    }

    /// Instant of the most recent failure
    #[must_use]
    pub fn last_failure(&self) -> Option<Instant> {
        self.state.read().last_failure
    }

    /// Put the circuit into half-open regardless of its state
    pub fn force_half_open(&self) {
        let mut state = self.state.write();
        if state.circuit != CircuitState::HalfOpen {
            state.circuit = CircuitState::HalfOpen;
            info!(provider = %self.provider_id, "Circuit breaker forced half-open");
        }
    }

    /// Requests currently running
    #[must_use]
    pub fn inflight(&self) -> i64 {
        self.inflight.load(Ordering::Acquire)
    }

    /// Mark a request as started; the guard marks it finished when dropped
    #[must_use]
    pub fn begin_request(self: &Arc<Self>) -> InflightGuard {
        self.inflight.fetch_add(1, Ordering::AcqRel);
        InflightGuard {
            health: Arc::clone(self),
        }
    }

    /// Start a request only if the circuit admits it right now.
    ///
    /// A half-open circuit hands out its single probe slot by swapping the
    /// in-flight count from 0 to 1, so concurrent callers cannot both take it.
    /// Returns `None` when the circuit is open or the probe is taken.
    #[must_use]
    pub fn try_begin_request(self: &Arc<Self>) -> Option<InflightGuard> {
        match self.state() {
            CircuitState::Closed => Some(self.begin_request()),
            CircuitState::Open => None,
            CircuitState::HalfOpen => self
                .inflight
                .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
                .ok()
                .map(|_| InflightGuard {
                    health: Arc::clone(self),
                }),
        }
    }

    /// Get current statistics
    #[must_use]
    pub fn snapshot(&self) -> HealthSnapshot {
        let state = self.state.read();
        HealthSnapshot {
            state: state.circuit,
            avg_ttft: state.avg_ttft,
            total_requests: state.total_requests,
            total_failures: state.total_failures,
            consecutive_failures: state.consecutive_failures,
            inflight: self.inflight(),
        }
    }
}

/// Holds one in-flight slot of a backend.
///
/// Dropping the guard releases the slot, whether the request finished,
/// failed, or was abandoned.
#[derive(Debug)]
pub struct InflightGuard {
    health: Arc<ProviderHealth>,
}

impl InflightGuard {
    /// Tracker this guard belongs to
    #[must_use]
    pub fn health(&self) -> &Arc<ProviderHealth> {
        &self.health
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.health.inflight.fetch_sub(1, Ordering::AcqRel);
    }
}
