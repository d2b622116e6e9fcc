//! Uniform random routing.
//!
//! Spreads requests evenly over available backends. Circuit breaking and the
//! all-open fallback behave as in the adaptive router; latency is not tracked.

use crate::pool::{Backend, BackendHealth, Pool};
use crate::Router;
use gateway_core::{CompleteOptions, Completer, DeltaStream, GatewayResult, Message};
use gateway_resilience::HealthConfig;
use rand::Rng;
use std::sync::Arc;

/// Router that picks uniformly among healthy backends
pub struct RoundRobinRouter {
    pool: Arc<Pool>,
}

impl RoundRobinRouter {
    /// Create a router over the given backends
    ///
    /// # Errors
    /// Returns a configuration error when `backends` is empty
    pub fn new(backends: Vec<Backend>, config: HealthConfig) -> GatewayResult<Self> {
        Ok(Self {
            pool: Arc::new(Pool::new(backends, config)?),
        })
    }
}

impl Completer for RoundRobinRouter {
    fn complete(&self, messages: Vec<Message>, options: CompleteOptions) -> DeltaStream {
        Arc::clone(&self.pool).dispatch(select, false, messages, options)
    }
}

impl Router for RoundRobinRouter {
    fn strategy(&self) -> &'static str {
        "round_robin"
    }

    fn health(&self) -> Vec<BackendHealth> {
        self.pool.health()
    }
}

fn select(pool: &Pool) -> usize {
    let candidates = pool.available();
    match candidates.len() {
        0 => pool.fallback(),
        1 => candidates[0],
        n => candidates[rand::thread_rng().gen_range(0..n)],
    }
}
