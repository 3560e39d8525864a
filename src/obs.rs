//! Optional observability helpers for broker, gateway, and reconciliation flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `catalog_broker.flow` with the `flow` and
//!   `stage` (call site) fields, plus debug/warn events for recoverable failures.
//! - Enable `metrics` to increment the `catalog_broker_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`. Strategy failures also feed
//!   `catalog_broker_strategy_failures_total{strategy}`, and each completed reconciliation pass
//!   sets the `catalog_broker_sync_videos{status}` and `catalog_broker_playlists_available`
//!   gauges.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Flow kinds observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Credential acquisition (cache evaluation plus strategies).
	Acquire,
	/// Forced re-acquisition after a rejection.
	Refresh,
	/// Authenticated catalog API call.
	Request,
	/// Catalog/CDN reconciliation pass.
	Reconcile,
	/// Unauthenticated CDN playlist fetch or availability check.
	CdnFetch,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Acquire => "acquire",
			FlowKind::Refresh => "refresh",
			FlowKind::Request => "request",
			FlowKind::Reconcile => "reconcile",
			FlowKind::CdnFetch => "cdn_fetch",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Records the terminal outcome of `result` for `kind`.
pub fn record_result<T, E>(kind: FlowKind, result: &std::result::Result<T, E>) {
	match result {
		Ok(_) => record_flow_outcome(kind, FlowOutcome::Success),
		Err(_) => record_flow_outcome(kind, FlowOutcome::Failure),
	}
}
