//! # Gateway Routing
//!
//! Health-aware load balancing over interchangeable backends.
//!
//! Routers are themselves [`Completer`]s: they pick a backend per request,
//! forward its deltas unchanged and record the outcome in the backend's
//! health tracker. They never retry.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adaptive;
pub mod pool;
pub mod round_robin;
pub mod strategy;

#[cfg(test)]
mod mock;

use gateway_core::Completer;

// Re-export main types
pub use adaptive::AdaptiveRouter;
pub use pool::{Backend, BackendHealth};
pub use round_robin::RoundRobinRouter;
pub use strategy::{build_router, RoutingStrategy};

/// A completer that spreads requests over a backend pool
pub trait Router: Completer {
    /// Strategy name
    fn strategy(&self) -> &'static str;

    /// Health of every backend in the pool
    fn health(&self) -> Vec<BackendHealth>;
}
