//! Configuration modules for the roundtrip client.
//!
//! - [`RetryPolicy`]: Retry behavior with exponential backoff and jitter

mod retry;

pub use retry::{
    RetryPolicy, RetryPredicate, capped_backoff, compute_backoff, compute_backoff_with_jitter,
    default_retry_if, defaults,
};
pub(crate) use retry::saturating_millis;
