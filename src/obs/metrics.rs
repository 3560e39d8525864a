// self
#[cfg(feature = "metrics")] use crate::reconcile::SyncStatus;
use crate::{
	auth::CredentialKind,
	obs::{FlowKind, FlowOutcome},
	reconcile::ReconciliationStats,
};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"catalog_broker_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Counts a recoverable strategy failure, labeled by credential kind.
pub fn record_strategy_failure(strategy: CredentialKind) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("catalog_broker_strategy_failures_total", "strategy" => strategy.as_str())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = strategy;
	}
}

/// Publishes the classification counts of the latest reconciliation pass as gauges.
pub fn record_sync_stats(stats: &ReconciliationStats) {
	#[cfg(feature = "metrics")]
	{
		for (status, count) in [
			(SyncStatus::Synced, stats.synced),
			(SyncStatus::MissingCdn, stats.missing_cdn),
			(SyncStatus::ApiOnly, stats.api_only),
			(SyncStatus::CdnOnly, stats.cdn_only),
		] {
			metrics::gauge!("catalog_broker_sync_videos", "status" => status.as_str())
				.set(count as f64);
		}

		metrics::gauge!("catalog_broker_playlists_available").set(stats.playlists_available as f64);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = stats;
	}
}
