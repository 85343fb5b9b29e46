//! Pool configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::PoolError;

/// Pool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Retries permitted after the first try (0 = a single try)
    pub tries: u32,

    /// Max symmetric random perturbation of retry delays, in milliseconds
    #[serde(rename = "jitter-ms")]
    pub jitter_ms: u64,

    /// Max concurrent in-flight operations (0 = unbounded)
    pub size: usize,

    /// Base delay before each retry
    pub interval: Backoff,

    /// Channel buffer size for submissions
    #[serde(rename = "channel-buffer")]
    pub channel_buffer: usize,
}

fn default_channel_buffer() -> usize {
    1000
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            tries: 0,
            jitter_ms: 0,
            size: 0,
            interval: Backoff::default(),
            channel_buffer: default_channel_buffer(),
        }
    }
}

impl PoolConfig {
    /// Concurrency limit, `None` when unbounded
    pub fn capacity(&self) -> Option<usize> {
        (self.size > 0).then_some(self.size)
    }

    /// Jitter magnitude as a Duration
    pub fn jitter(&self) -> Duration {
        Duration::from_millis(self.jitter_ms)
    }

    /// Reject configurations that cannot run
    pub fn validate(&self) -> Result<(), PoolError> {
        debug!(config = ?self, "PoolConfig::validate: called");
        if self.channel_buffer == 0 {
            return Err(PoolError::InvalidConfig("channel-buffer must be positive".to_string()));
        }
        self.interval.validate()
    }
}

/// Declarative retry delay policy
///
/// `attempt` is the number of tries already made, so the first retry is
/// attempt 1. The first try is never delayed and never consults the policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Backoff {
    /// Same delay before every retry
    Constant { ms: u64 },

    /// `ms * attempt`
    Linear { ms: u64 },

    /// `base-ms * factor^(attempt - 1)`, capped at `max-ms`
    Exponential {
        #[serde(rename = "base-ms")]
        base_ms: u64,
        factor: f64,
        #[serde(rename = "max-ms")]
        max_ms: u64,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Constant { ms: 0 }
    }
}

impl Backoff {
    /// Base delay before the given retry attempt
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Backoff::Constant { ms } => Duration::from_millis(*ms),
            Backoff::Linear { ms } => Duration::from_millis(ms.saturating_mul(u64::from(attempt))),
            Backoff::Exponential {
                base_ms,
                factor,
                max_ms,
            } => {
                let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
                let ms = (*base_ms as f64 * factor.powi(exp)).min(*max_ms as f64);
                Duration::from_millis(ms as u64)
            }
        }
    }

    fn validate(&self) -> Result<(), PoolError> {
        if let Backoff::Exponential {
            base_ms,
            factor,
            max_ms,
        } = self
        {
            if !factor.is_finite() || *factor < 1.0 {
                return Err(PoolError::InvalidConfig(format!(
                    "exponential factor must be a finite number >= 1, got {}",
                    factor
                )));
            }
            if max_ms < base_ms {
                return Err(PoolError::InvalidConfig(format!(
                    "exponential max-ms ({}) is below base-ms ({})",
                    max_ms, base_ms
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PoolConfig::default();
        assert_eq!(config.tries, 0);
        assert_eq!(config.jitter_ms, 0);
        assert_eq!(config.size, 0);
        assert_eq!(config.interval, Backoff::Constant { ms: 0 });
        assert_eq!(config.channel_buffer, 1000);
        assert_eq!(config.capacity(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_capacity() {
        let config = PoolConfig {
            size: 4,
            ..Default::default()
        };
        assert_eq!(config.capacity(), Some(4));
    }

    #[test]
    fn test_zero_channel_buffer_rejected() {
        let config = PoolConfig {
            channel_buffer: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PoolError::InvalidConfig(_))));
    }

    #[test]
    fn test_backoff_delays() {
        assert_eq!(Backoff::Constant { ms: 100 }.delay(1), Duration::from_millis(100));
        assert_eq!(Backoff::Constant { ms: 100 }.delay(7), Duration::from_millis(100));
        assert_eq!(Backoff::Linear { ms: 50 }.delay(3), Duration::from_millis(150));

        let exp = Backoff::Exponential {
            base_ms: 100,
            factor: 2.0,
            max_ms: 1000,
        };
        assert_eq!(exp.delay(1), Duration::from_millis(100));
        assert_eq!(exp.delay(2), Duration::from_millis(200));
        assert_eq!(exp.delay(4), Duration::from_millis(800));
        assert_eq!(exp.delay(5), Duration::from_millis(1000));
        assert_eq!(exp.delay(u32::MAX), Duration::from_millis(1000));
    }

    #[test]
    fn test_invalid_exponential_rejected() {
        let bad_factor = PoolConfig {
            interval: Backoff::Exponential {
                base_ms: 10,
                factor: 0.5,
                max_ms: 100,
            },
            ..Default::default()
        };
        assert!(bad_factor.validate().is_err());

        let nan_factor = PoolConfig {
            interval: Backoff::Exponential {
                base_ms: 10,
                factor: f64::NAN,
                max_ms: 100,
            },
            ..Default::default()
        };
        assert!(nan_factor.validate().is_err());

        let bad_cap = PoolConfig {
            interval: Backoff::Exponential {
                base_ms: 500,
                factor: 2.0,
                max_ms: 100,
            },
            ..Default::default()
        };
        assert!(bad_cap.validate().is_err());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
tries: 3
jitter-ms: 250
size: 8
interval:
  kind: exponential
  base-ms: 100
  factor: 2.0
  max-ms: 5000
"#;
        let config: PoolConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.tries, 3);
        assert_eq!(config.jitter(), Duration::from_millis(250));
        assert_eq!(config.size, 8);
        assert_eq!(
            config.interval,
            Backoff::Exponential {
                base_ms: 100,
                factor: 2.0,
                max_ms: 5000,
            }
        );
        assert_eq!(config.channel_buffer, 1000);
    }

    #[test]
    fn test_negative_size_is_a_parse_error() {
        let result: Result<PoolConfig, _> = serde_yaml::from_str("size: -1");
        assert!(result.is_err());
    }
}
