//! Retry delay computation

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::config::PoolConfig;

/// Maps a retry attempt number (>= 1) to the base delay before that attempt
pub type Interval = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// Base interval plus symmetric jitter
#[derive(Clone)]
pub struct DelayPolicy {
    interval: Interval,
    jitter: Duration,
}

impl fmt::Debug for DelayPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelayPolicy")
            .field("interval", &"<fn>")
            .field("jitter", &self.jitter)
            .finish()
    }
}

impl DelayPolicy {
    pub fn new(interval: Interval, jitter: Duration) -> Self {
        Self { interval, jitter }
    }

    /// Build from the declarative backoff in a pool config
    pub fn from_config(config: &PoolConfig) -> Self {
        let backoff = config.interval.clone();
        Self::new(Arc::new(move |attempt: u32| backoff.delay(attempt)), config.jitter())
    }

    pub fn with_interval(self, interval: Interval) -> Self {
        Self { interval, ..self }
    }

    /// Delay before the try that follows `attempt` earlier tries
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.delay_with(attempt, rand::random::<f64>())
    }

    /// Same as `delay_for` with the uniform sample in `[0, 1)` supplied
    pub fn delay_with(&self, attempt: u32, sample: f64) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let base = (self.interval)(attempt).as_nanos() as f64;
        let offset = self.jitter.as_nanos() as f64 * (sample - 0.5);
        let nanos = (base + offset).round();
        if nanos.is_finite() && nanos > 0.0 {
            // float -> int casts saturate
            Duration::from_nanos(nanos as u64)
        } else {
            Duration::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::config::Backoff;

    fn constant(ms: u64, jitter_ms: u64) -> DelayPolicy {
        DelayPolicy::from_config(&PoolConfig {
            interval: Backoff::Constant { ms },
            jitter_ms,
            ..Default::default()
        })
    }

    #[test]
    fn test_first_try_never_delayed() {
        let policy = constant(10_000, 5_000);
        assert_eq!(policy.delay_for(0), Duration::ZERO);
        assert_eq!(policy.delay_with(0, 0.99), Duration::ZERO);
    }

    #[test]
    fn test_no_jitter_is_exact() {
        let policy = constant(100, 0);
        for _ in 0..50 {
            assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        }
    }

    #[test]
    fn test_jitter_is_symmetric() {
        let policy = constant(100, 40);
        assert_eq!(policy.delay_with(1, 0.0), Duration::from_millis(80));
        assert_eq!(policy.delay_with(1, 0.5), Duration::from_millis(100));
        assert_eq!(policy.delay_with(1, 0.75), Duration::from_millis(110));
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let policy = constant(100, 40);
        for _ in 0..200 {
            let delay = policy.delay_for(2);
            assert!(delay >= Duration::from_millis(80), "{:?}", delay);
            assert!(delay <= Duration::from_millis(120), "{:?}", delay);
        }
    }

    #[test]
    fn test_negative_delay_clamped() {
        let policy = constant(0, 1_000);
        assert_eq!(policy.delay_with(1, 0.0), Duration::ZERO);
        assert_eq!(policy.delay_with(1, 0.25), Duration::ZERO);
    }

    #[test]
    fn test_custom_interval_receives_attempt_number() {
        let policy = constant(0, 0).with_interval(Arc::new(|attempt: u32| Duration::from_secs(u64::from(attempt))));
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(3), Duration::from_secs(3));
    }
}
