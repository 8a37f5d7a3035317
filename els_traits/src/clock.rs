use std::time::Duration;

/// Pacing source for the status refresh loop.
///
/// The loop publishes a snapshot, then waits one refresh period. On the
/// machine this blocks the display task; in tests the wait is recorded
/// instead, so a run of N refreshes finishes immediately.
pub trait Clock {
    /// Wait out one refresh period.
    fn pause(&self, period: Duration);
}

#[cfg(any(test, feature = "test-clock"))]
pub mod test_clock {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Records refresh pauses without blocking. Clones share the tally.
    #[derive(Debug, Clone, Default)]
    pub struct TestClock {
        paused_ns: Arc<AtomicU64>,
        pauses: Arc<AtomicU64>,
    }

    impl TestClock {
        pub fn new() -> Self {
            Self::default()
        }

        /// Sum of all pauses so far.
        pub fn elapsed(&self) -> Duration {
            Duration::from_nanos(self.paused_ns.load(Ordering::Relaxed))
        }

        pub fn pauses(&self) -> u64 {
            self.pauses.load(Ordering::Relaxed)
        }
    }

    impl Clock for TestClock {
        fn pause(&self, period: Duration) {
            let ns = u64::try_from(period.as_nanos()).unwrap_or(u64::MAX);
            self.paused_ns.fetch_add(ns, Ordering::Relaxed);
            self.pauses.fetch_add(1, Ordering::Relaxed);
        }
    }

}
