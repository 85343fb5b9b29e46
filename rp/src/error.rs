//! Pool error types

use thiserror::Error;

/// Terminal failure handed to the caller once an attempt has used up its retries.
///
/// `errors` holds one reason per try, in the order the tries happened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Retries exhausted after {} tries: {}", .errors.len(), .errors.join("; "))]
pub struct Exhausted {
    pub errors: Vec<String>,
}

impl Exhausted {
    /// Number of tries that were made before giving up
    pub fn tries(&self) -> usize {
        self.errors.len()
    }

    /// Reason recorded for the final try, if any
    pub fn last_error(&self) -> Option<&str> {
        self.errors.last().map(String::as_str)
    }
}

/// Errors surfaced by the pool API
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Invalid pool configuration: {0}")]
    InvalidConfig(String),

    #[error("Pool is shut down")]
    Closed,

    #[error(transparent)]
    Exhausted(#[from] Exhausted),
}

impl PoolError {
    /// Check if this error is a terminal retry exhaustion
    pub fn is_exhausted(&self) -> bool {
        matches!(self, PoolError::Exhausted(_))
    }

    /// Accumulated error history, if this is a retry exhaustion
    pub fn errors(&self) -> Option<&[String]> {
        match self {
            PoolError::Exhausted(e) => Some(&e.errors),
            _ => None,
        }
    }
}
