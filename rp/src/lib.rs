//! retrypool - concurrency-limited retrying request pool
//!
//! Accepts a stream of asynchronous operations, runs at most `size` of them
//! at once, and retries failures with a backoff policy plus jitter before
//! reporting a final success or the full error history to the caller.
//!
//! # Core Concepts
//!
//! - **Admission**: new work joins the back of the queue, retries jump to the front
//! - **Executor**: performs one try of an operation; injected by the caller
//! - **Classifier**: decides whether a try's output is final or must be retried
//! - **Exactly once**: every submission completes exactly once, success or exhausted
//!
//! # Example
//!
//! ```ignore
//! use retrypool::{Pool, PoolConfig, executor::executor_fn};
//!
//! let config = PoolConfig { size: 4, tries: 2, ..Default::default() };
//! let pool = Pool::new(config, executor_fn(|url: String| async move { fetch(url).await }))?;
//! let (handle, _task) = pool.spawn();
//! let body = handle.call("https://example.com".to_string()).await?;
//! ```
//!
//! # Modules
//!
//! - [`pool`] - Admission queue, retry state machine and the pool task
//! - [`executor`] - Executor trait, closure adapter and the HTTP executor
//! - [`classify`] - Outcome classification
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod pool;

// Re-export commonly used types
pub use classify::{AcceptUnlessError, Classifier, Outcome, Verdict, classifier_fn};
pub use config::{Config, HttpConfig};
pub use error::{Exhausted, PoolError};
pub use executor::{Executor, executor_fn};
pub use pool::{Backoff, Pool, PoolConfig, PoolHandle, PoolStats};
