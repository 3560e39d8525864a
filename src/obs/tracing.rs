// self
use crate::{_prelude::*, auth::CredentialKind, obs::FlowKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by crate flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("catalog_broker.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Logs a cache hit. The credential value is never recorded.
pub fn credential_reused(kind: CredentialKind, remaining: Duration) {
	#[cfg(feature = "tracing")]
	tracing::debug!(
		kind = kind.as_str(),
		remaining_secs = remaining.whole_seconds(),
		"credential reused"
	);
	#[cfg(not(feature = "tracing"))]
	let _ = (kind, remaining);
}

/// Logs a freshly minted credential.
pub fn credential_acquired(kind: CredentialKind, expires_at: OffsetDateTime) {
	#[cfg(feature = "tracing")]
	tracing::info!(kind = kind.as_str(), %expires_at, "credential acquired");
	#[cfg(not(feature = "tracing"))]
	let _ = (kind, expires_at);
}

/// Logs a recoverable strategy failure.
pub fn strategy_failed(strategy: CredentialKind, reason: &dyn Display) {
	#[cfg(feature = "tracing")]
	tracing::warn!(strategy = strategy.as_str(), %reason, "strategy failed; trying next");
	#[cfg(not(feature = "tracing"))]
	let _ = (strategy, reason);
}

/// Logs a disabled strategy being skipped.
pub fn strategy_skipped(strategy: CredentialKind) {
	#[cfg(feature = "tracing")]
	tracing::debug!(strategy = strategy.as_str(), "strategy disabled; skipped");
	#[cfg(not(feature = "tracing"))]
	let _ = strategy;
}

/// Logs a gateway-triggered refresh after a rejected credential.
pub fn credential_rejected(kind: CredentialKind, status: u16) {
	#[cfg(feature = "tracing")]
	tracing::info!(kind = kind.as_str(), status, "credential rejected; refreshing once");
	#[cfg(not(feature = "tracing"))]
	let _ = (kind, status);
}

/// Logs a CDN feed that could not be used.
pub fn cdn_unavailable(playlist_id: &str, reason: &dyn Display) {
	#[cfg(feature = "tracing")]
	tracing::debug!(playlist_id, %reason, "cdn playlist unavailable");
	#[cfg(not(feature = "tracing"))]
	let _ = (playlist_id, reason);
}
