// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for broker activity.
#[derive(Debug, Default)]
pub struct BrokerMetrics {
	acquisitions: AtomicU64,
	cache_hits: AtomicU64,
	strategy_attempts: AtomicU64,
	strategy_failures: AtomicU64,
	refreshes: AtomicU64,
}
impl BrokerMetrics {
	/// Returns the number of `acquire` evaluations (cache hits included).
	pub fn acquisitions(&self) -> u64 {
		self.acquisitions.load(Ordering::Relaxed)
	}

	/// Returns how many evaluations were served from the cache.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	/// Returns how many enabled strategies were invoked.
	pub fn strategy_attempts(&self) -> u64 {
		self.strategy_attempts.load(Ordering::Relaxed)
	}

	/// Returns how many strategy invocations failed.
	pub fn strategy_failures(&self) -> u64 {
		self.strategy_failures.load(Ordering::Relaxed)
	}

	/// Returns how many times the cached credential was cleared and re-acquired.
	pub fn refreshes(&self) -> u64 {
		self.refreshes.load(Ordering::Relaxed)
	}

	pub(crate) fn record_acquisition(&self) {
		self.acquisitions.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_cache_hit(&self) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_strategy_attempt(&self) {
		self.strategy_attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_strategy_failure(&self) {
		self.strategy_failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh(&self) {
		self.refreshes.fetch_add(1, Ordering::Relaxed);
	}
}
