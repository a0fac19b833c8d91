//! Retry pacing for the transaction submitter
//!
//! - `Backoff`: non-decreasing delay schedules (`LinearBackoff`, `ExponentialBackoff`)
//!   selected through the serializable `BackoffPolicy`
//! - `RateLimiter`: per-key token buckets used to throttle gateway traffic

pub mod backoff;
pub mod limiter;

pub use backoff::{Backoff, BackoffPolicy, ExponentialBackoff, LinearBackoff};
pub use limiter::{RateLimitError, RateLimiter, TokenBucket};
