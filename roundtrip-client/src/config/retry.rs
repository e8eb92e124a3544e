//! Retry policy and exponential backoff with jitter.
//!
//! # Overview
//!
//! - [`RetryPolicy`]: how many extra attempts to make, the backoff bounds and
//!   the predicate deciding whether an outcome is worth another attempt
//! - [`compute_backoff`]: `min_backoff * 2^attempt`, capped at `max_backoff`,
//!   perturbed by up to +/- 25%
//! - [`default_retry_if`]: retry transport errors, 5xx and 429
//!
//! # Example
//!
//! ```ignore
//! use roundtrip_client::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new()
//!     .max_retries(3)
//!     .backoff(Duration::from_millis(100), Duration::from_secs(2));
//! ```
//!
//! # Retryable outcomes
//!
//! With the default predicate:
//! - Transport errors (connection refused, reset, DNS failure) are retried
//! - Cancellation and deadline errors are never retried
//! - Responses with status >= 500 or exactly 429 are retried
//! - Every other response, including other 4xx, is final

use std::sync::Arc;
use std::time::Duration;

use roundtrip_core::{ClientError, Response, StatusCode};

/// Default configuration values.
pub mod defaults {
    use std::time::Duration;

    /// Default number of extra attempts after the first one.
    pub const MAX_RETRIES: u32 = 0;

    /// Default backoff before the first retry.
    pub const MIN_BACKOFF: Duration = Duration::from_millis(100);

    /// Default cap on the pre-jitter backoff.
    pub const MAX_BACKOFF: Duration = Duration::from_secs(5);

    /// Jitter amplitude as a fraction of the capped backoff (0.25 means +/- 25%).
    pub const JITTER_FACTOR: f64 = 0.25;
}

/// Decides whether an attempt's outcome should be retried.
pub type RetryPredicate = Arc<dyn Fn(&Result<Response, ClientError>) -> bool + Send + Sync>;

/// The default retry predicate.
///
/// Returns `true` for transport errors and for responses with status >= 500 or
/// 429. Cancellation, request-building, codec and configuration errors are not
/// retried, nor is any other response.
pub fn default_retry_if(outcome: &Result<Response, ClientError>) -> bool {
    match outcome {
        Err(err) => err.is_transport(),
        Ok(response) => {
            let status = response.status();
            status.as_u16() >= 500 || status == StatusCode::TOO_MANY_REQUESTS
        }
    }
}

/// Pre-jitter backoff: `min_backoff * 2^attempt`, saturating, capped at
/// `max_backoff`. Non-decreasing in `attempt`.
pub fn capped_backoff(attempt: u32, min_backoff: Duration, max_backoff: Duration) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    min_backoff
        .checked_mul(factor)
        .unwrap_or(Duration::MAX)
        .min(max_backoff)
}

/// Backoff for `attempt` with an explicit jitter draw.
///
/// `jitter` is in `[-1.0, 1.0]` and scales [`defaults::JITTER_FACTOR`]; zero
/// yields the capped backoff exactly. The result is not re-clamped to
/// `max_backoff`, so it ranges over `[0.75 * capped, 1.25 * capped]`.
pub fn compute_backoff_with_jitter(
    attempt: u32,
    min_backoff: Duration,
    max_backoff: Duration,
    jitter: f64,
) -> Duration {
    let base = capped_backoff(attempt, min_backoff, max_backoff);
    let jitter = if jitter.is_nan() { 0.0 } else { jitter.clamp(-1.0, 1.0) };
    let secs = base.as_secs_f64() * (1.0 + defaults::JITTER_FACTOR * jitter);
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

/// Backoff for `attempt` with a uniformly random jitter draw.
pub fn compute_backoff(attempt: u32, min_backoff: Duration, max_backoff: Duration) -> Duration {
    let jitter = rand::random::<f64>() * 2.0 - 1.0;
    compute_backoff_with_jitter(attempt, min_backoff, max_backoff, jitter)
}

/// Whole milliseconds in `duration` for log fields, saturating at `u64::MAX`.
pub(crate) fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Configuration for retry behavior.
///
/// # Default Values
///
/// - `max_retries`: 0 (retry disabled)
/// - `min_backoff`: 100 milliseconds
/// - `max_backoff`: 5 seconds
/// - predicate: [`default_retry_if`]
#[derive(Clone)]
pub struct RetryPolicy {
    /// Maximum number of extra attempts (not counting the initial request).
    pub max_retries: u32,

    /// Backoff before the first retry.
    pub min_backoff: Duration,

    /// Cap on the pre-jitter backoff.
    pub max_backoff: Duration,

    retry_if: RetryPredicate,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: defaults::MAX_RETRIES,
            min_backoff: defaults::MIN_BACKOFF,
            max_backoff: defaults::MAX_BACKOFF,
            retry_if: Arc::new(default_retry_if),
        }
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("min_backoff", &self.min_backoff)
            .field("max_backoff", &self.max_backoff)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    /// Create a new RetryPolicy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self::default()
    }

    /// Set the maximum number of retry attempts.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the backoff bounds.
    pub fn backoff(mut self, min_backoff: Duration, max_backoff: Duration) -> Self {
        self.min_backoff = min_backoff;
        self.max_backoff = max_backoff;
        self
    }

    /// Replace the retry predicate.
    pub fn retry_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Result<Response, ClientError>) -> bool + Send + Sync + 'static,
    {
        self.retry_if = Arc::new(predicate);
        self
    }

    /// Replace the retry predicate with a shared one.
    pub fn retry_if_shared(mut self, predicate: RetryPredicate) -> Self {
        self.retry_if = predicate;
        self
    }

    /// Whether retries are enabled at all.
    pub fn is_enabled(&self) -> bool {
        self.max_retries > 0
    }

    /// Evaluate the retry predicate.
    pub fn should_retry(&self, outcome: &Result<Response, ClientError>) -> bool {
        (self.retry_if)(outcome)
    }

    /// Jittered wait after the attempt with index `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        compute_backoff(attempt, self.min_backoff, self.max_backoff)
    }

    /// Validate the policy configuration.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.min_backoff > self.max_backoff {
            return Err("min_backoff must not exceed max_backoff");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: Duration = Duration::from_millis(100);
    const MAX: Duration = Duration::from_millis(200);

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 0);
        assert_eq!(policy.min_backoff, Duration::from_millis(100));
        assert_eq!(policy.max_backoff, Duration::from_secs(5));
        assert!(!policy.is_enabled());
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_retry_policy_builder() {
        let policy = RetryPolicy::new()
            .max_retries(5)
            .backoff(Duration::from_millis(10), Duration::from_secs(1));

        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.min_backoff, Duration::from_millis(10));
        assert_eq!(policy.max_backoff, Duration::from_secs(1));
        assert!(policy.is_enabled());
    }

    #[test]
    fn test_retry_policy_validate() {
        let invalid = RetryPolicy::new().backoff(Duration::from_secs(10), Duration::from_secs(1));
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_default_predicate() {
        assert!(default_retry_if(&Err(ClientError::transport("connection reset"))));
        assert!(default_retry_if(&Ok(Response::new(StatusCode::INTERNAL_SERVER_ERROR))));
        assert!(default_retry_if(&Ok(Response::new(StatusCode::SERVICE_UNAVAILABLE))));
        assert!(default_retry_if(&Ok(Response::new(StatusCode::TOO_MANY_REQUESTS))));

        assert!(!default_retry_if(&Ok(Response::new(StatusCode::OK))));
        assert!(!default_retry_if(&Ok(Response::new(StatusCode::NOT_FOUND))));
        assert!(!default_retry_if(&Ok(Response::new(StatusCode::BAD_REQUEST))));
        assert!(!default_retry_if(&Ok(Response::new(StatusCode::MOVED_PERMANENTLY))));
    }

    #[test]
    fn test_default_predicate_never_retries_cancellation() {
        assert!(!default_retry_if(&Err(ClientError::Canceled)));
        assert!(!default_retry_if(&Err(ClientError::DeadlineExceeded)));
    }

    #[test]
    fn test_default_predicate_skips_non_network_errors() {
        assert!(!default_retry_if(&Err(ClientError::Config("no TLS roots".into()))));
        assert!(!default_retry_if(&Err(ClientError::InvalidRequest("bad uri".into()))));
        assert!(!default_retry_if(&Err(ClientError::Encode("bad json".into()))));
    }

    #[test]
    fn test_custom_predicate() {
        let policy = RetryPolicy::new().retry_if(|outcome| {
            matches!(outcome, Ok(response) if response.status() == StatusCode::CONFLICT)
        });
        assert!(policy.should_retry(&Ok(Response::new(StatusCode::CONFLICT))));
        assert!(!policy.should_retry(&Ok(Response::new(StatusCode::SERVICE_UNAVAILABLE))));
        assert!(!policy.should_retry(&Err(ClientError::transport("reset"))));
    }

    #[test]
    fn test_backoff_without_jitter_doubles() {
        let policy_min = Duration::from_millis(100);
        let policy_max = Duration::from_secs(100);

        assert_eq!(compute_backoff_with_jitter(0, policy_min, policy_max, 0.0), Duration::from_millis(100));
        assert_eq!(compute_backoff_with_jitter(1, policy_min, policy_max, 0.0), Duration::from_millis(200));
        assert_eq!(compute_backoff_with_jitter(2, policy_min, policy_max, 0.0), Duration::from_millis(400));
        assert_eq!(compute_backoff_with_jitter(3, policy_min, policy_max, 0.0), Duration::from_millis(800));
    }

    #[test]
    fn test_backoff_monotonic_up_to_cap() {
        let mut previous = Duration::ZERO;
        for attempt in 0..80 {
            let delay = compute_backoff_with_jitter(attempt, MIN, MAX, 0.0);
            assert!(delay >= previous, "attempt {attempt}: {delay:?} < {previous:?}");
            assert!(delay <= MAX);
            previous = delay;
        }
        assert_eq!(previous, MAX);
    }

    #[test]
    fn test_backoff_capped_base_and_jitter_bounds() {
        assert_eq!(capped_backoff(5, MIN, MAX), Duration::from_millis(200));

        assert_eq!(compute_backoff_with_jitter(5, MIN, MAX, -1.0), Duration::from_millis(150));
        assert_eq!(compute_backoff_with_jitter(5, MIN, MAX, 1.0), Duration::from_millis(250));

        for _ in 0..1000 {
            let delay = compute_backoff(5, MIN, MAX);
            assert!(delay >= Duration::from_millis(150), "{delay:?}");
            assert!(delay <= Duration::from_millis(250), "{delay:?}");
        }
    }

    #[test]
    fn test_backoff_saturates_on_huge_attempts() {
        let delay = capped_backoff(u32::MAX, Duration::from_secs(1), Duration::MAX);
        assert!(delay >= Duration::from_secs(u64::from(u32::MAX)));
        let jittered = compute_backoff_with_jitter(u32::MAX, Duration::from_secs(1), Duration::MAX, 1.0);
        assert!(jittered > Duration::ZERO);
    }

    #[test]
    fn test_backoff_zero_min() {
        assert_eq!(compute_backoff(3, Duration::ZERO, MAX), Duration::ZERO);
    }

    #[test]
    fn test_policy_delay_for_uses_bounds() {
        let policy = RetryPolicy::new().max_retries(3).backoff(MIN, MAX);
        let delay = policy.delay_for(0);
        assert!(delay >= Duration::from_millis(75) && delay <= Duration::from_millis(125));
    }

    #[test]
    fn test_saturating_millis() {
        assert_eq!(saturating_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(saturating_millis(Duration::ZERO), 0);
        assert_eq!(saturating_millis(Duration::MAX), u64::MAX);
        assert_eq!(saturating_millis(Duration::from_secs(u64::MAX / 1000 + 1)), u64::MAX);
    }
}
