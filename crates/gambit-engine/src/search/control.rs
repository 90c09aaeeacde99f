//! Search control: shared stop flag and time budget.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Fraction of the time budget after which no new iteration is started.
const SOFT_LIMIT_FRACTION: f64 = 0.8;

/// Nodes between clock reads inside the recursion.
const CLOCK_CHECK_INTERVAL: u64 = 2048;

/// Decides when a search should stop.
///
/// The recursion polls [`should_stop`](Self::should_stop) at every node; the
/// clock itself is only read every 2048 nodes. Iterative deepening asks
/// [`should_stop_iterating`](Self::should_stop_iterating) between depths.
/// Several workers may share one control through the stop flag.
#[derive(Debug)]
pub struct SearchControl {
    stopped: Arc<AtomicBool>,
    start: Instant,
    soft_limit: Option<Duration>,
    hard_limit: Option<Duration>,
}

impl SearchControl {
    /// No clock; only the stop flag ends the search.
    pub fn new_infinite(stopped: Arc<AtomicBool>) -> Self {
        Self {
            stopped,
            start: Instant::now(),
            soft_limit: None,
            hard_limit: None,
        }
    }

    /// Explicit soft and hard limits; the clock starts now.
    pub fn new_timed(stopped: Arc<AtomicBool>, soft: Duration, hard: Duration) -> Self {
        Self {
            stopped,
            start: Instant::now(),
            soft_limit: Some(soft),
            hard_limit: Some(hard),
        }
    }

    /// Budget of `secs` seconds: hard limit at the full budget, soft limit
    /// at 80% of it. Zero, negative, non-finite or unrepresentably large
    /// budgets mean no clock.
    pub fn from_secs(stopped: Arc<AtomicBool>, secs: f64) -> Self {
        if !secs.is_finite() || secs <= 0.0 {
            return Self::new_infinite(stopped);
        }
        match (
            Duration::try_from_secs_f64(secs * SOFT_LIMIT_FRACTION),
            Duration::try_from_secs_f64(secs),
        ) {
            (Ok(soft), Ok(hard)) => Self::new_timed(stopped, soft, hard),
            _ => Self::new_infinite(stopped),
        }
    }

    /// Whether the recursion must unwind now.
    ///
    /// When the hard limit fires the stop flag is raised, so every worker
    /// sharing the flag unwinds too.
    pub fn should_stop(&self, nodes: u64) -> bool {
        if self.stopped.load(Ordering::Relaxed) {
            return true;
        }

        if nodes % CLOCK_CHECK_INTERVAL != 0 {
            return false;
        }

        match self.hard_limit {
            Some(hard) if self.elapsed() >= hard => {
                self.stopped.store(true, Ordering::Release);
                true
            }
            _ => false,
        }
    }

    /// Whether a new iteration should not be started.
    pub fn should_stop_iterating(&self) -> bool {
        if self.is_stopped() {
            return true;
        }
        self.soft_limit.is_some_and(|soft| self.elapsed() >= soft)
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }

    /// Raise the stop flag.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn hard_limit(&self) -> Option<Duration> {
        self.hard_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    #[test]
    fn infinite_never_stops_on_its_own() {
        let control = SearchControl::new_infinite(flag());
        assert!(!control.should_stop(0));
        assert!(!control.should_stop(2048));
        assert!(!control.should_stop_iterating());
        assert_eq!(control.hard_limit(), None);
    }

    #[test]
    fn stop_flag_is_observed() {
        let stopped = flag();
        let control = SearchControl::new_infinite(Arc::clone(&stopped));
        stopped.store(true, Ordering::Relaxed);
        assert!(control.should_stop(1));
        assert!(control.should_stop_iterating());
    }

    #[test]
    fn expired_hard_limit_raises_flag() {
        let stopped = flag();
        let control = SearchControl::new_timed(Arc::clone(&stopped), Duration::ZERO, Duration::ZERO);
        // Off-interval node counts skip the clock.
        assert!(!control.should_stop(1));
        assert!(control.should_stop(4096));
        assert!(stopped.load(Ordering::Relaxed));
    }

    #[test]
    fn soft_limit_is_eighty_percent() {
        let control = SearchControl::from_secs(flag(), 10.0);
        assert_eq!(control.hard_limit(), Some(Duration::from_secs(10)));
        assert_eq!(control.soft_limit, Some(Duration::from_secs(8)));
    }

    #[test]
    fn non_positive_budget_is_infinite() {
        for secs in [0.0, -1.0, f64::NAN, f64::INFINITY, 1e30, f64::MAX] {
            let control = SearchControl::from_secs(flag(), secs);
            assert_eq!(control.hard_limit(), None, "budget {secs}");
        }
    }

    #[test]
    fn stop_sets_shared_flag() {
        let stopped = flag();
        let control = SearchControl::new_infinite(Arc::clone(&stopped));
        control.stop();
        assert!(stopped.load(Ordering::Relaxed));
        assert!(control.is_stopped());
    }
}
