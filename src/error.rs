//! Crate-level error types shared by the broker, gateway, catalog client, and reconciler.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Strategy and CDN failures never reach this type directly; they are absorbed by the broker
/// and the reconciler respectively.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Every acquisition strategy failed or was disabled.
	#[error("No authentication strategy produced a credential.")]
	AuthUnavailable,
	/// The API rejected the request again after a credential refresh.
	#[error("The catalog API rejected the credential after a refresh (HTTP {status}).")]
	Unauthorized {
		/// HTTP status code returned by the API.
		status: u16,
		/// Response body, decoded lossily.
		body: String,
	},
	/// The API answered with a non-success status other than 401.
	#[error("The catalog API returned HTTP {status}: {body}.")]
	Api {
		/// HTTP status code returned by the API.
		status: u16,
		/// Response body, decoded lossily.
		body: String,
	},
	/// A response body could not be decoded into the expected shape.
	#[error("Response body could not be decoded at `{path}`.")]
	Decode {
		/// JSON path where decoding failed.
		path: String,
		/// Underlying JSON failure.
		#[source]
		source: serde_json::Error,
	},
	/// A request body could not be encoded as JSON.
	#[error("Request body could not be encoded.")]
	Encode(#[source] serde_json::Error),
	/// The operation observed a cancellation request.
	#[error("The operation was cancelled.")]
	Cancelled,
}
impl Error {
	/// Returns the HTTP status attached to API-level failures, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Unauthorized { status, .. } | Self::Api { status, .. } => Some(*status),
			_ => None,
		}
	}
}
impl From<serde_path_to_error::Error<serde_json::Error>> for Error {
	fn from(e: serde_path_to_error::Error<serde_json::Error>) -> Self {
		let path = e.path().to_string();

		Self::Decode { path, source: e.into_inner() }
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A configured endpoint uses an unsupported scheme.
	#[error("The {endpoint} endpoint must use HTTP or HTTPS: {url}.")]
	UnsupportedScheme {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// An endpoint could not be derived from the configured values.
	#[error("The {endpoint} endpoint could not be built.")]
	InvalidEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A resource identifier cannot be used as a single URL path segment.
	#[error("`{segment}` is not a valid path segment.")]
	InvalidSegment {
		/// Rejected identifier.
		segment: String,
	},
	/// An enabled strategy is missing a required value.
	#[error("The {strategy} strategy is enabled but `{field}` is empty.")]
	MissingValue {
		/// Strategy label.
		strategy: &'static str,
		/// Missing field name.
		field: &'static str,
	},
	/// Request timeout must be strictly positive.
	#[error("The request timeout must be positive.")]
	NonPositiveTimeout,
	/// Safety margin must not be negative.
	#[error("The credential safety margin must not be negative.")]
	NegativeSafetyMargin,
	/// Reconciliation fan-out must allow at least one request.
	#[error("The reconciliation concurrency must be at least 1.")]
	ZeroConcurrency,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO, timeouts).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {url}.")]
	Network {
		/// Target URL.
		url: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request exceeded its timeout.
	#[error("Request to {url} timed out.")]
	Timeout {
		/// Target URL.
		url: String,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during an HTTP call.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(url: &Url, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { url: url.to_string(), source: Box::new(src) }
	}

	/// Returns `true` when the failure was a timeout.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Timeout { .. })
	}
}
