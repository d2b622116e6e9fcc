//! Latency and load aware routing.
//!
//! Each available backend is scored from its in-flight count, smoothed time
//! to first token and error rate, and one backend is drawn at random with
//! probability proportional to its score.

use crate::pool::{Backend, BackendHealth, Pool};
use crate::Router;
use gateway_core::{CompleteOptions, Completer, DeltaStream, GatewayResult, Message};
use gateway_resilience::{CircuitState, HealthConfig, HealthSnapshot};
use rand::Rng;
use std::sync::Arc;
use tracing::debug;

/// Score multiplier applied to half-open backends
const HALF_OPEN_PENALTY: f64 = 0.1;

/// Weight of the error rate in the score
const ERROR_RATE_WEIGHT: f64 = 10.0;

/// Router that favours fast, idle, reliable backends
pub struct AdaptiveRouter {
    pool: Arc<Pool>,
}

impl AdaptiveRouter {
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

impl Completer for AdaptiveRouter {
    fn complete(&self, messages: Vec<Message>, options: CompleteOptions) -> DeltaStream {
        Arc::clone(&self.pool).dispatch(select, true, messages, options)
    }
}

impl Router for AdaptiveRouter {
    fn strategy(&self) -> &'static str {
        "adaptive"
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
        _ => {
            let scores: Vec<f64> = candidates
                .iter()
                .map(|&i| score(&pool.member(i).health.snapshot()))
                .collect();
            let choice = candidates[weighted_pick(&mut rand::thread_rng(), &scores)];
            debug!(
                backend = %pool.member(choice).backend.name(),
                candidates = candidates.len(),
                "Selected backend"
            );
            choice
        }
    }
}

/// Selection weight of a backend.
///
/// `(1 / (1 + inflight)) / (ttft_ms * (1 + 10 * error_rate))`, with the
/// latency floored at one millisecond, reduced tenfold while half-open.
#[must_use]
pub fn score(snapshot: &HealthSnapshot) -> f64 {
    let inflight = snapshot.inflight.max(0) as f64;
    let ttft_ms = (snapshot.avg_ttft.as_secs_f64() * 1000.0).max(1.0);
    let load = 1.0 / (1.0 + inflight);
    let mut score = load / (ttft_ms * (1.0 + ERROR_RATE_WEIGHT * snapshot.error_rate()));
    if snapshot.state == CircuitState::HalfOpen {
        score *= HALF_OPEN_PENALTY;
    }
    score
}

/// Draw an index with probability proportional to its score.
///
/// Falls back to a uniform draw when no score is positive. `scores` must not
/// be empty.
pub fn weighted_pick<R: Rng + ?Sized>(rng: &mut R, scores: &[f64]) -> usize {
    if scores.len() <= 1 {
        return 0;
    }

    let total: f64 = scores.iter().filter(|s| s.is_finite() && **s > 0.0).sum();
    if total <= 0.0 {
        return rng.gen_range(0..scores.len());
    }

    let mut target = rng.gen::<f64>() * total;
    let mut last = 0;
    for (i, &s) in scores.iter().enumerate() {
        if !(s.is_finite() && s > 0.0) {
            continue;
        }
        if target < s {
            return i;
        }
        target -= s;
        last = i;
    }
    last
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockCompleter;
    use futures::StreamExt;
    use gateway_core::{Delta, GatewayError};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    fn backend(completer: &Arc<MockCompleter>) -> Backend {
        Backend::new(completer.name.clone(), Arc::clone(completer) as Arc<dyn Completer>)
    }

    fn config(threshold: u32) -> HealthConfig {
        HealthConfig {
            failure_threshold: threshold,
            recovery_timeout: Duration::from_secs(60),
            ..Default::default()
        }
    }

    async fn run(router: &AdaptiveRouter) -> Vec<GatewayResult<Delta>> {
        router.complete(vec![Message::user("hi")], CompleteOptions::new()).collect().await
    }

    fn snapshot(ttft_ms: u64, inflight: i64, requests: u64, failures: u64) -> HealthSnapshot {
        HealthSnapshot {
            state: CircuitState::Closed,
            avg_ttft: Duration::from_millis(ttft_ms),
            total_requests: requests,
            total_failures: failures,
            consecutive_failures: 0,
            inflight,
        }
    }

    #[test]
    fn test_requires_backends() {
        assert!(AdaptiveRouter::new(Vec::new(), HealthConfig::default()).is_err());
    }

    #[test]
    fn test_score_ordering() {
        let fast = score(&snapshot(100, 0, 0, 0));
        let slow = score(&snapshot(400, 0, 0, 0));
        let busy = score(&snapshot(100, 3, 0, 0));
        let flaky = score(&snapshot(100, 0, 10, 5));
        assert!(fast > slow);
        assert!(fast > busy);
        assert!(fast > flaky);

        let mut half_open = snapshot(100, 0, 0, 0);
        half_open.state = CircuitState::HalfOpen;
        assert!((score(&half_open) - fast * 0.1).abs() < 1e-12);

        // Latency is floored at one millisecond.
        assert_eq!(score(&snapshot(0, 0, 0, 0)), 1.0);
    }

    #[test]
    fn test_weighted_pick_favours_higher_scores() {
        let mut rng = StdRng::seed_from_u64(7);
        let scores = [1.0, 0.25];
        let mut counts = [0usize; 2];
        for _ in 0..10_000 {
            counts[weighted_pick(&mut rng, &scores)] += 1;
        }
        assert!(counts[0] > counts[1] * 3, "counts: {counts:?}");
    }

    #[test]
    fn test_weighted_pick_uniform_when_scores_zero() {
        let mut rng = StdRng::seed_from_u64(11);
        let scores = [0.0, 0.0, 0.0];
        let mut seen = [false; 3];
        for _ in 0..200 {
            seen[weighted_pick(&mut rng, &scores)] = true;
        }
        assert_eq!(seen, [true, true, true]);
        assert_eq!(weighted_pick(&mut rng, &[0.5]), 0);
    }

    #[tokio::test]
    async fn test_is_lazy() {
        let a = MockCompleter::answering("a", "hello");
        let router = AdaptiveRouter::new(vec![backend(&a)], config(3)).unwrap();

        let stream = router.complete(vec![Message::user("hi")], CompleteOptions::new());
        assert_eq!(a.calls(), 0);
        drop(stream);
        assert_eq!(router.health()[0].total_requests, 0);
    }

    #[tokio::test]
    async fn test_routes_and_records_success() {
        let a = MockCompleter::answering("a", "hello");
        let router = AdaptiveRouter::new(vec![backend(&a)], config(3)).unwrap();

        let items = run(&router).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap().model.as_deref(), Some("a"));

        let health = &router.health()[0];
        assert_eq!(health.total_requests, 1);
        assert_eq!(health.total_failures, 0);
        assert_eq!(health.inflight, 0);
        assert!(health.avg_ttft_ms < 1000);
    }

    #[tokio::test]
    async fn test_error_is_forwarded_and_recorded() {
        let a = MockCompleter::failing("a");
        let router = AdaptiveRouter::new(vec![backend(&a)], config(3)).unwrap();

        let items = run(&router).await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(GatewayError::Provider { .. })));

        let health = &router.health()[0];
        assert_eq!(health.total_failures, 1);
        assert_eq!(health.inflight, 0);
    }

    #[tokio::test]
    async fn test_empty_sequence_is_failure() {
        let a = MockCompleter::empty("a");
        let router = AdaptiveRouter::new(vec![backend(&a)], config(3)).unwrap();

        assert!(run(&router).await.is_empty());
        assert_eq!(router.health()[0].total_failures, 1);
    }

    #[tokio::test]
    async fn test_opens_after_threshold() {
        let a = MockCompleter::failing("a");
        let router = AdaptiveRouter::new(vec![backend(&a)], config(2)).unwrap();

        run(&router).await;
        assert_eq!(router.health()[0].state, CircuitState::Closed);
        run(&router).await;
        assert_eq!(router.health()[0].state, CircuitState::Open);
    }

    #[tokio::test]
    async fn test_skips_open_backend() {
        let bad = MockCompleter::failing("bad");
        let good = MockCompleter::answering("good", "ok");
        let router = AdaptiveRouter::new(vec![backend(&bad), backend(&good)], config(1)).unwrap();

        // Drive until the failing backend has been tried once and opened.
        while bad.calls() == 0 {
            run(&router).await;
        }
        assert_eq!(router.health()[0].state, CircuitState::Open);

        let before = good.calls();
        for _ in 0..20 {
            let items = run(&router).await;
            assert!(items[0].is_ok());
        }
        assert_eq!(bad.calls(), 1);
        assert_eq!(good.calls(), before + 20);
    }

    #[tokio::test]
    async fn test_all_open_falls_back_to_oldest_failure() {
        let a = MockCompleter::answering("a", "from a");
        let b = MockCompleter::answering("b", "from b");
        let router = AdaptiveRouter::new(vec![backend(&a), backend(&b)], config(1)).unwrap();

        router.pool.member(0).health.record_failure();
        tokio::time::sleep(Duration::from_millis(5)).await;
        router.pool.member(1).health.record_failure();
        assert!(router.health().iter().all(|h| h.state == CircuitState::Open));

        let items = run(&router).await;
        assert_eq!(items[0].as_ref().unwrap().model.as_deref(), Some("a"));
        assert_eq!(b.calls(), 0);

        let health = router.health();
        assert_eq!(health[0].state, CircuitState::Closed);
        assert_eq!(health[1].state, CircuitState::Open);
    }

    #[tokio::test]
    async fn test_cancellation_releases_inflight() {
        let a = MockCompleter::streaming(
            "a",
            vec![Delta::text("one"), Delta::text("two"), Delta::text("three")],
            Duration::from_millis(5),
        );
        let router = AdaptiveRouter::new(vec![backend(&a)], config(3)).unwrap();

        let mut stream = router.complete(vec![Message::user("hi")], CompleteOptions::new());
        assert!(stream.next().await.unwrap().is_ok());
        assert_eq!(router.health()[0].inflight, 1);

        drop(stream);
        let health = &router.health()[0];
        assert_eq!(health.inflight, 0);
        assert_eq!(health.total_requests, 1);
        assert_eq!(health.total_failures, 0);
    }

    #[tokio::test]
    async fn test_cancellation_before_first_delta_is_failure() {
        let a = MockCompleter::streaming("a", vec![Delta::text("late")], Duration::from_secs(5));
        let router = AdaptiveRouter::new(vec![backend(&a)], config(3)).unwrap();

        let mut stream = router.complete(vec![Message::user("hi")], CompleteOptions::new());
        let polled = tokio::time::timeout(Duration::from_millis(10), stream.next()).await;
        assert!(polled.is_err());
        assert_eq!(router.health()[0].inflight, 1);

        drop(stream);
        let health = &router.health()[0];
        assert_eq!(health.inflight, 0);
        assert_eq!(health.total_failures, 1);
    }

    #[test]
    fn test_score_prefers_lower_ttft_alone() {
        let fast = score(&snapshot(100, 0, 0, 0));
        let slow = score(&snapshot(200, 0, 0, 0));
        assert!((fast / slow - 2.0).abs() < 1e-9);

        let mut rng = StdRng::seed_from_u64(23);
        let mut counts = [0usize; 2];
        for _ in 0..10_000 {
            counts[weighted_pick(&mut rng, &[fast, slow])] += 1;
        }
        assert!(counts[0] > counts[1], "counts: {counts:?}");
        // Expected split is 2:1.
        assert!(counts[0] > 6_000 && counts[0] < 7_300, "counts: {counts:?}");
    }

    #[test]
    fn test_admit_reselects_when_half_open_slot_taken() {
        let a = MockCompleter::answering("a", "from a");
        let b = MockCompleter::answering("b", "from b");
        let router = AdaptiveRouter::new(vec![backend(&a), backend(&b)], config(1)).unwrap();

        let half_open = &router.pool.member(0).health;
        half_open.force_half_open();
        let held = half_open.try_begin_request().unwrap();

        // The first selection still sees the backend as free.
        let stale = std::cell::Cell::new(true);
        let (index, guard) = router.pool.admit(&|pool: &Pool| {
            if stale.replace(false) {
                0
            } else {
                select(pool)
            }
        });

        assert_eq!(index, 1);
        assert_eq!(router.health()[0].inflight, 1);
        assert_eq!(router.health()[1].inflight, 1);
        drop(guard);
        drop(held);
        assert!(router.health().iter().all(|h| h.inflight == 0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_half_open_backend_takes_one_request_under_load() {
        let a = MockCompleter::streaming("a", vec![Delta::text("x")], Duration::from_millis(200));
        let b = MockCompleter::answering("b", "y");
        let router = Arc::new(
            AdaptiveRouter::new(vec![backend(&a), backend(&b)], config(1)).unwrap(),
        );
        router.pool.member(0).health.force_half_open();

        let barrier = Arc::new(tokio::sync::Barrier::new(16));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let router = Arc::clone(&router);
                let barrier = Arc::clone(&barrier);
                tokio::spawn(async move {
                    barrier.wait().await;
                    run(&router).await.len()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap(), 1);
        }

        assert!(a.calls() <= 1, "half-open backend served {} requests", a.calls());
        assert_eq!(a.calls() + b.calls(), 16);
        assert!(router.health().iter().all(|h| h.inflight == 0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_balance_inflight() {
        let a = MockCompleter::streaming("a", vec![Delta::text("x")], Duration::from_millis(2));
        let b = MockCompleter::streaming("b", vec![Delta::text("y")], Duration::from_millis(2));
        let router = Arc::new(
            AdaptiveRouter::new(vec![backend(&a), backend(&b)], config(3)).unwrap(),
        );

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let router = Arc::clone(&router);
                tokio::spawn(async move { run(&router).await.len() })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap(), 1);
        }

        let health = router.health();
        assert!(health.iter().all(|h| h.inflight == 0));
        assert_eq!(health.iter().map(|h| h.total_requests).sum::<u64>(), 50);
        assert_eq!(a.calls() + b.calls(), 50);
    }
}
