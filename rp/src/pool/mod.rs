//! Concurrency-limited retrying pool
//!
//! Admits at most `size` operations at once. Failed tries go back to the
//! front of the queue and run again after a backoff delay until the retry
//! budget is spent.

mod config;
mod core;
mod delay;
mod handle;
mod messages;
mod queue;

pub use config::{Backoff, PoolConfig};
pub use core::Pool;
pub use delay::{DelayPolicy, Interval};
pub use handle::PoolHandle;
pub use queue::{Admission, AdmissionQueue, Attempt, OnComplete, PoolStats};
