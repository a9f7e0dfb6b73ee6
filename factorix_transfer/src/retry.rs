//! Exponential jittered backoff for retryable transfer failures (§4.7
//! "Retry policy").

use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  pub base_delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      base_delay: Duration::from_millis(250),
    }
  }
}

impl RetryPolicy {
  /// Delay before attempt `attempt` (0-indexed retry count), doubling each
  /// time and jittered by up to ±25%.
  pub fn delay_for(&self, attempt: u32) -> Duration {
    let exponential = self.base_delay.as_millis() as u64 * 2u64.saturating_pow(attempt);
    let jitter_fraction = rand::thread_rng().gen_range(-0.25..=0.25);
    let jittered = (exponential as f64 * (1.0 + jitter_fraction)).max(0.0);
    Duration::from_millis(jittered as u64)
  }
}

/// True for errors the policy says are worth retrying: network failures and
/// `5xx` responses. `4xx` responses and exceeded redirect limits are never
/// retried (§4.7).
pub fn is_retryable(error: &crate::error::TransferError) -> bool {
  use crate::error::TransferError;
  matches!(
    error,
    TransferError::HTTPServerError(_) | TransferError::NetworkTimeoutError(_) | TransferError::Http(_)
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::TransferError;

  #[test]
  fn delay_grows_exponentially() {
    let policy = RetryPolicy {
      max_attempts: 5,
      base_delay: Duration::from_millis(100),
    };
    let first = policy.delay_for(0).as_millis();
    let second = policy.delay_for(1).as_millis();
    assert!(first <= 125);
    assert!(second >= 150 && second <= 250);
  }

  #[test]
  fn server_errors_and_timeouts_are_retryable_but_redirect_limits_are_not() {
    assert!(is_retryable(&TransferError::HTTPServerError(503)));
    assert!(is_retryable(&TransferError::NetworkTimeoutError("timed out".into())));
    assert!(!is_retryable(&TransferError::TooManyRedirectsError("https://example.com".into())));
    assert!(!is_retryable(&TransferError::HTTPClientError { status: 404, body: String::new() }));
  }
}
