//! Explicit retry policy for rejected credentials.

// self
use crate::_prelude::*;

/// Decides whether a rejected call is refreshed and retried.
///
/// At most one refresh-and-retry is ever performed per call; `max_attempts` is clamped to
/// `1..=2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
	max_attempts: u8,
	backoff: StdDuration,
}
impl RetryPolicy {
	/// Status that triggers a refresh.
	pub const TRIGGER_STATUS: u16 = 401;

	/// Single attempt; rejections surface immediately.
	pub const fn none() -> Self {
		Self { max_attempts: 1, backoff: StdDuration::ZERO }
	}

	/// Sets the attempt ceiling, clamped to `1..=2`.
	pub fn with_max_attempts(mut self, max_attempts: u8) -> Self {
		self.max_attempts = max_attempts.clamp(1, 2);

		self
	}

	/// Sleeps for `backoff` before the retry.
	pub fn with_backoff(mut self, backoff: StdDuration) -> Self {
		self.backoff = backoff;

		self
	}

	/// Attempt ceiling.
	pub fn max_attempts(&self) -> u8 {
		self.max_attempts
	}

	/// Delay before the retry.
	pub fn backoff(&self) -> StdDuration {
		self.backoff
	}

	/// Returns `true` when `status` should trigger a refresh.
	pub fn is_trigger(&self, status: u16) -> bool {
		status == Self::TRIGGER_STATUS
	}

	/// Returns `true` when attempt number `attempt` (1-based) may be followed by a refresh.
	///
	/// A credential that is already the product of a refresh in this call is never refreshed
	/// again.
	pub fn should_refresh(&self, attempt: u8, refreshed: bool) -> bool {
		!refreshed && attempt < self.max_attempts
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self { max_attempts: 2, backoff: StdDuration::ZERO }
	}
}
