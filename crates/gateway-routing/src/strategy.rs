//! Router construction by strategy name.

use crate::adaptive::AdaptiveRouter;
use crate::pool::Backend;
use crate::round_robin::RoundRobinRouter;
use crate::Router;
use gateway_core::GatewayResult;
use gateway_resilience::HealthConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Backend selection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingStrategy {
    /// Score by latency, load and error rate
    #[default]
    Adaptive,
    /// Uniform random among healthy backends
    #[serde(alias = "roundrobin")]
    RoundRobin,
}

impl fmt::Display for RoutingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Adaptive => write!(f, "adaptive"),
            Self::RoundRobin => write!(f, "round_robin"),
        }
    }
}

/// Build a router for the given strategy
///
/// # Errors
/// Returns a configuration error when `backends` is empty
pub fn build_router(
    strategy: RoutingStrategy,
    backends: Vec<Backend>,
    config: HealthConfig,
) -> GatewayResult<Arc<dyn Router>> {
    let router: Arc<dyn Router> = match strategy {
        RoutingStrategy::Adaptive => Arc::new(AdaptiveRouter::new(backends, config)?),
        RoutingStrategy::RoundRobin => Arc::new(RoundRobinRouter::new(backends, config)?),
    };
    Ok(router)
}
