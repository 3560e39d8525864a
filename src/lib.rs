//! Credential broker and CDN reconciliation core for video-catalog back offices: ordered token
//! strategies, single-flight caching, a retry-on-401 gateway, and catalog/CDN sync
//! classification in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod broker;
pub mod catalog;
pub mod cdn;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod obs;
pub mod reconcile;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		broker::TokenBroker,
		config::BrokerConfig,
		gateway::AuthenticatedGateway,
		http::{HttpTransport, ReqwestHttpClient},
		store::{MemoryStore, TokenStore},
	};

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Parses a mock server URL, panicking on malformed fixtures.
	pub fn test_url(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse mock server URL.")
	}

	/// Constructs a [`TokenBroker`] backed by an in-memory store and the reqwest transport used
	/// across integration tests.
	pub fn build_reqwest_test_broker(config: BrokerConfig) -> (Arc<TokenBroker>, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn TokenStore> = store_backend.clone();
		let transport: Arc<dyn HttpTransport> = Arc::new(test_reqwest_http_client());
		let broker = Arc::new(TokenBroker::new(config, store, transport));

		(broker, store_backend)
	}

	/// Constructs an [`AuthenticatedGateway`] sharing the broker returned alongside it.
	pub fn build_reqwest_test_gateway(
		config: BrokerConfig,
	) -> (AuthenticatedGateway, Arc<TokenBroker>, Arc<MemoryStore>) {
		let (broker, store) = build_reqwest_test_broker(config);
		let gateway = AuthenticatedGateway::new(broker.clone());

		(gateway, broker, store)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap, HashSet},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use tokio_util::sync::CancellationToken;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
