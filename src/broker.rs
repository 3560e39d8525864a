//! Credential broker with ordered strategies, caching, and single-flight acquisition.
//!
//! [`TokenBroker::acquire`] evaluates the cached credential and, when it is missing or inside
//! the safety margin, walks the strategy chain until one succeeds. One async mutex guards the
//! whole evaluation so concurrent callers observing an empty cache piggy-back on a single
//! acquisition instead of stampeding the token endpoints.

mod metrics;
pub mod strategy;

pub use metrics::*;
pub use strategy::*;

// self
use crate::{
	_prelude::*,
	auth::{AuthEvent, AuthEvents, Credential},
	config::BrokerConfig,
	http::HttpTransport,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::TokenStore,
};
#[cfg(feature = "reqwest")] use crate::{error::ConfigError, http::ReqwestHttpClient};

/// Obtains, caches, and refreshes bearer credentials.
pub struct TokenBroker {
	config: BrokerConfig,
	store: Arc<dyn TokenStore>,
	transport: Arc<dyn HttpTransport>,
	strategies: Vec<Arc<dyn AcquisitionStrategy>>,
	events: AuthEvents,
	metrics: Arc<BrokerMetrics>,
	guard: AsyncMutex<()>,
}
impl TokenBroker {
	/// Creates a broker using the standard strategy chain derived from `config`.
	pub fn new(
		config: BrokerConfig,
		store: Arc<dyn TokenStore>,
		transport: Arc<dyn HttpTransport>,
	) -> Self {
		let strategies = strategy::default_strategies(&config);

		Self::with_strategies(config, store, transport, strategies)
	}

	/// Creates a broker with a caller-supplied strategy chain, tried in order.
	pub fn with_strategies(
		config: BrokerConfig,
		store: Arc<dyn TokenStore>,
		transport: Arc<dyn HttpTransport>,
		strategies: Vec<Arc<dyn AcquisitionStrategy>>,
	) -> Self {
		Self {
			config,
			store,
			transport,
			strategies,
			events: AuthEvents::default(),
			metrics: Default::default(),
			guard: AsyncMutex::new(()),
		}
	}

	/// Creates a broker backed by a reqwest client honoring the configured timeout.
	#[cfg(feature = "reqwest")]
	pub fn with_reqwest(
		config: BrokerConfig,
		store: Arc<dyn TokenStore>,
	) -> Result<Self, ConfigError> {
		let transport = ReqwestHttpClient::with_timeout(config.request_timeout)?;

		Ok(Self::new(config, store, Arc::new(transport)))
	}

	/// Configuration the broker was built with.
	pub fn config(&self) -> &BrokerConfig {
		&self.config
	}

	/// Transport shared with the gateway and the CDN client.
	pub fn transport(&self) -> &Arc<dyn HttpTransport> {
		&self.transport
	}

	/// Observer registry for auth-state changes.
	pub fn events(&self) -> &AuthEvents {
		&self.events
	}

	/// Activity counters.
	pub fn metrics(&self) -> &Arc<BrokerMetrics> {
		&self.metrics
	}

	/// Returns the cached credential without evaluating or acquiring.
	pub async fn current(&self) -> Result<Option<Credential>> {
		Ok(self.store.get().await?)
	}

	/// Returns a credential, reusing the cached one while it is outside the safety margin.
	pub async fn acquire(&self) -> Result<Credential> {
		const KIND: FlowKind = FlowKind::Acquire;

		let span = FlowSpan::new(KIND, "acquire");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let _singleflight = self.guard.lock().await;

				self.acquire_locked().await
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Drops the cached credential and acquires a new one.
	pub async fn refresh(&self) -> Result<Credential> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let _singleflight = self.guard.lock().await;

				self.refresh_locked().await
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Refreshes only if the store still holds `rejected`.
	///
	/// When another caller already replaced the rejected credential, the replacement is
	/// evaluated like a normal [`acquire`](Self::acquire) instead, so a burst of 401s shares
	/// one re-acquisition.
	pub async fn refresh_rejected(&self, rejected: &Credential) -> Result<Credential> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh_rejected");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let _singleflight = self.guard.lock().await;
				let still_cached = self
					.store
					.get()
					.await
					.map_err(Error::from)?
					.is_some_and(|current| current.value == rejected.value);

				if still_cached { self.refresh_locked().await } else { self.acquire_locked().await }
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Drops the cached credential without acquiring a new one.
	pub async fn invalidate(&self) -> Result<()> {
		let _singleflight = self.guard.lock().await;

		self.store.clear().await?;
		self.events.publish(&AuthEvent::Cleared);

		Ok(())
	}

	async fn acquire_locked(&self) -> Result<Credential> {
		self.metrics.record_acquisition();

		let now = OffsetDateTime::now_utc();

		if let Some(cached) = self
			.store
			.get()
			.await?
			.filter(|credential| credential.is_usable_at(now, self.config.safety_margin))
		{
			self.metrics.record_cache_hit();
			obs::credential_reused(cached.kind, cached.remaining_at(now));

			return Ok(cached);
		}

		self.run_strategies().await
	}

	async fn refresh_locked(&self) -> Result<Credential> {
		self.metrics.record_refresh();
		self.store.clear().await?;
		self.events.publish(&AuthEvent::Cleared);
		self.run_strategies().await
	}

	async fn run_strategies(&self) -> Result<Credential> {
		for strategy in &self.strategies {
			if !strategy.is_enabled() {
				obs::strategy_skipped(strategy.kind());

				continue;
			}

			self.metrics.record_strategy_attempt();

			match strategy.acquire(self.transport.as_ref(), self.config.request_timeout).await {
				Ok(credential) => {
					self.store.set(credential.clone()).await?;
					obs::credential_acquired(credential.kind, credential.expires_at);
					self.events.publish(&AuthEvent::Acquired {
						kind: credential.kind,
						expires_at: credential.expires_at,
					});

					return Ok(credential);
				},
				Err(e) => {
					self.metrics.record_strategy_failure();
					obs::record_strategy_failure(strategy.kind());
					obs::strategy_failed(strategy.kind(), &e);
					self.events.publish(&AuthEvent::StrategyFailed {
						strategy: strategy.kind(),
						reason: e.to_string(),
					});
				},
			}
		}

		self.events.publish(&AuthEvent::Unavailable);

		Err(Error::AuthUnavailable)
	}
}
impl Debug for TokenBroker {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenBroker")
			.field("api_base", &self.config.api_base.as_str())
			.field(
				"strategies",
				&self.strategies.iter().map(|strategy| strategy.kind()).collect::<Vec<_>>(),
			)
			.field("events", &self.events)
			.field("metrics", &self.metrics)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::{
		auth::CredentialKind,
		error::TransportError,
		http::{HttpRequest, TransportFuture},
		store::MemoryStore,
	};

	struct UnreachableTransport;
	impl HttpTransport for UnreachableTransport {
		fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
			panic!("No network traffic expected, got {request:?}.")
		}
	}

	struct CountingStrategy {
		kind: CredentialKind,
		calls: AtomicUsize,
		succeed: bool,
	}
	impl CountingStrategy {
		fn new(kind: CredentialKind, succeed: bool) -> Arc<Self> {
			Arc::new(Self { kind, calls: AtomicUsize::new(0), succeed })
		}
	}
	impl AcquisitionStrategy for CountingStrategy {
		fn kind(&self) -> CredentialKind {
			self.kind
		}

		fn acquire<'a>(&'a self, _: &'a dyn HttpTransport, _: StdDuration) -> StrategyFuture<'a> {
			Box::pin(async move {
				let call = self.calls.fetch_add(1, Ordering::SeqCst);

				tokio::task::yield_now().await;

				if !self.succeed {
					return Err(StrategyError::Transport(TransportError::Timeout {
						url: "http://unreachable.invalid".into(),
					}));
				}

				Ok(Credential::builder(self.kind)
					.value(format!("{}-{call}", self.kind))
					.expires_in(Duration::hours(1))
					.build()?)
			})
		}
	}

	fn config() -> BrokerConfig {
		BrokerConfig::builder(Url::parse("https://api.example.com").expect("URL should parse."))
			.build()
			.expect("Config should build.")
	}

	fn broker(
		store: Arc<MemoryStore>,
		strategies: Vec<Arc<dyn AcquisitionStrategy>>,
	) -> Arc<TokenBroker> {
		Arc::new(TokenBroker::with_strategies(
			config(),
			store,
			Arc::new(UnreachableTransport),
			strategies,
		))
	}

	#[tokio::test]
	async fn fresh_cache_is_reused_without_strategies() {
		let cached = Credential::builder(CredentialKind::Primary)
			.value("cached")
			.expires_in(Duration::hours(1))
			.build()
			.expect("Fixture credential should build.");
		let strategy = CountingStrategy::new(CredentialKind::Primary, true);
		let broker = broker(Arc::new(MemoryStore::with_credential(cached.clone())), vec![
			strategy.clone(),
		]);
		let credential = broker.acquire().await.expect("Cached credential should be returned.");

		assert_eq!(credential, cached);
		assert_eq!(strategy.calls.load(Ordering::SeqCst), 0);
		assert_eq!(broker.metrics().cache_hits(), 1);
	}

	#[tokio::test]
	async fn credentials_inside_the_margin_are_replaced() {
		let expiring = Credential::builder(CredentialKind::Primary)
			.value("expiring")
			.expires_in(Duration::seconds(20))
			.build()
			.expect("Fixture credential should build.");
		let strategy = CountingStrategy::new(CredentialKind::Secondary, true);
		let broker =
			broker(Arc::new(MemoryStore::with_credential(expiring)), vec![strategy.clone()]);
		let credential = broker.acquire().await.expect("A new credential should be acquired.");

		assert_eq!(credential.kind, CredentialKind::Secondary);
		assert_eq!(strategy.calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn concurrent_callers_share_one_acquisition() {
		let strategy = CountingStrategy::new(CredentialKind::Primary, true);
		let broker = broker(Arc::new(MemoryStore::default()), vec![strategy.clone()]);
		let (a, b, c) = tokio::join!(broker.acquire(), broker.acquire(), broker.acquire());

		assert_eq!(strategy.calls.load(Ordering::SeqCst), 1);
		assert_eq!(a.expect("First caller should succeed.").value.expose(), "primary-0");
		assert_eq!(b.expect("Second caller should succeed.").value.expose(), "primary-0");
		assert_eq!(c.expect("Third caller should succeed.").value.expose(), "primary-0");
	}

	#[tokio::test]
	async fn exhausted_chain_reports_unavailable() {
		let failing = CountingStrategy::new(CredentialKind::Primary, false);
		let broker = broker(Arc::new(MemoryStore::default()), vec![failing.clone()]);
		let events = Arc::new(Mutex::new(Vec::new()));
		let _subscription = broker.events().subscribe({
			let events = events.clone();

			Arc::new(move |event: &AuthEvent| events.lock().push(event.clone()))
		});
		let err = broker.acquire().await.expect_err("A failing chain should be unavailable.");

		assert!(matches!(err, Error::AuthUnavailable));
		assert_eq!(broker.metrics().strategy_failures(), 1);

		let events = events.lock();

		assert!(matches!(events[0], AuthEvent::StrategyFailed {
			strategy: CredentialKind::Primary,
			..
		}));
		assert_eq!(events[1], AuthEvent::Unavailable);
	}

	#[tokio::test]
	async fn refresh_rejected_skips_superseded_credentials() {
		let strategy = CountingStrategy::new(CredentialKind::Primary, true);
		let store = Arc::new(MemoryStore::default());
		let broker = broker(store.clone(), vec![strategy.clone()]);
		let first = broker.acquire().await.expect("Initial acquisition should succeed.");
		let second =
			broker.refresh_rejected(&first).await.expect("Rejected credential should refresh.");
		let again = broker
			.refresh_rejected(&first)
			.await
			.expect("A superseded rejection should reuse the replacement.");

		assert_eq!(second.value.expose(), "primary-1");
		assert_eq!(again, second);
		assert_eq!(strategy.calls.load(Ordering::SeqCst), 2);
		assert_eq!(broker.metrics().refreshes(), 1);

		broker.invalidate().await.expect("Invalidation should succeed.");

		assert!(store.snapshot().is_none());
	}
}
