//! Credential acquisition strategies tried by the broker in priority order.
//!
//! Every failure here is recoverable: the broker logs it, publishes an
//! [`AuthEvent::StrategyFailed`](crate::auth::AuthEvent::StrategyFailed), and moves on.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	auth::{Credential, CredentialBuilderError, CredentialKind, TokenSecret},
	config::{self, BrokerConfig, FirstPartyConfig, OidcConfig},
	error::{ConfigError, TransportError},
	http::{HttpMethod, HttpRequest, HttpTransport},
};

/// Lifetime applied when a token response omits `expires_in`, and to fallback tokens.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// Boxed future returned by [`AcquisitionStrategy::acquire`].
pub type StrategyFuture<'a> =
	Pin<Box<dyn Future<Output = Result<Credential, StrategyError>> + 'a + Send>>;

/// One source of bearer credentials.
pub trait AcquisitionStrategy
where
	Self: Send + Sync,
{
	/// Kind stamped on credentials produced by this strategy.
	fn kind(&self) -> CredentialKind;

	/// Disabled strategies are skipped without network traffic.
	fn is_enabled(&self) -> bool {
		true
	}

	/// Attempts to mint a credential.
	fn acquire<'a>(
		&'a self,
		transport: &'a dyn HttpTransport,
		timeout: StdDuration,
	) -> StrategyFuture<'a>;
}

/// Recoverable failure of a single strategy.
#[derive(Debug, ThisError)]
pub enum StrategyError {
	/// The endpoint could not be reached.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The endpoint answered with a non-success status.
	#[error("Token endpoint returned HTTP {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Bounded body preview.
		body: String,
	},
	/// The response was not a JSON token payload.
	#[error("Token response could not be decoded at `{path}`.")]
	Decode {
		/// JSON path where decoding failed.
		path: String,
		/// Underlying JSON failure.
		#[source]
		source: serde_json::Error,
	},
	/// The payload had no usable `access_token`.
	#[error("Token response did not include an access token.")]
	MissingAccessToken,
	/// The payload carried a zero or negative `expires_in`.
	#[error("Token response carried a non-positive expires_in of {expires_in}.")]
	NonPositiveExpiry {
		/// Reported lifetime in seconds.
		expires_in: i64,
	},
	/// The endpoint could not be derived from configuration.
	#[error(transparent)]
	Endpoint(#[from] ConfigError),
	/// The credential could not be assembled.
	#[error(transparent)]
	Credential(#[from] CredentialBuilderError),
	/// The request body could not be encoded.
	#[error("Token request could not be encoded.")]
	Encode(#[source] serde_json::Error),
}
impl From<serde_path_to_error::Error<serde_json::Error>> for StrategyError {
	fn from(e: serde_path_to_error::Error<serde_json::Error>) -> Self {
		let path = e.path().to_string();

		Self::Decode { path, source: e.into_inner() }
	}
}

/// Token endpoint payload; unknown fields are ignored.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TokenResponse {
	/// Bearer value.
	#[serde(default)]
	pub access_token: Option<String>,
	/// Lifetime in seconds.
	#[serde(default)]
	pub expires_in: Option<i64>,
	/// Token type, usually `Bearer`.
	#[serde(default)]
	pub token_type: Option<String>,
	/// Granted scopes.
	#[serde(default)]
	pub scope: Option<String>,
}
impl TokenResponse {
	/// Converts the payload into a credential issued at `issued_at`.
	pub fn into_credential(
		self,
		kind: CredentialKind,
		issued_at: OffsetDateTime,
	) -> Result<Credential, StrategyError> {
		let access_token = self
			.access_token
			.filter(|value| !value.trim().is_empty())
			.ok_or(StrategyError::MissingAccessToken)?;
		let ttl = match self.expires_in {
			Some(expires_in) if expires_in <= 0 =>
				return Err(StrategyError::NonPositiveExpiry { expires_in }),
			Some(expires_in) => expires_in,
			None => DEFAULT_TOKEN_TTL_SECS,
		};

		Ok(Credential::builder(kind)
			.value(access_token)
			.issued_at(issued_at)
			.expires_in(Duration::seconds(ttl))
			.build()?)
	}
}

async fn post_token<B>(
	transport: &dyn HttpTransport,
	url: Url,
	body: &B,
	timeout: StdDuration,
) -> Result<TokenResponse, StrategyError>
where
	B: Serialize,
{
	let payload = serde_json::to_vec(body).map_err(StrategyError::Encode)?;
	let request = HttpRequest::new(HttpMethod::Post, url)
		.header("accept", "application/json")
		.json_body(payload)
		.timeout(timeout);
	let response = transport.execute(request).await?;

	if !response.is_success() {
		return Err(StrategyError::Status {
			status: response.status,
			body: response.body_preview(),
		});
	}

	Ok(response.json()?)
}

/// Strategy A: the catalog API's own `/auth/client-credentials` endpoint.
#[derive(Clone, Debug)]
pub struct FirstPartyStrategy {
	api_base: Url,
	client_secret: TokenSecret,
	enabled: bool,
}
impl FirstPartyStrategy {
	/// Path appended to the API base.
	pub const PATH: &'static str = "auth/client-credentials";

	/// Builds the strategy from the API base and first-party settings.
	pub fn new(api_base: Url, config: &FirstPartyConfig) -> Self {
		Self { api_base, client_secret: config.client_secret.clone(), enabled: config.enabled }
	}

	fn endpoint(&self) -> Result<Url, ConfigError> {
		config::join_path(&self.api_base, Self::PATH).map_err(|source| {
			ConfigError::InvalidEndpoint { endpoint: "first-party token", source }
		})
	}
}
impl AcquisitionStrategy for FirstPartyStrategy {
	fn kind(&self) -> CredentialKind {
		CredentialKind::Primary
	}

	fn is_enabled(&self) -> bool {
		self.enabled
	}

	fn acquire<'a>(
		&'a self,
		transport: &'a dyn HttpTransport,
		timeout: StdDuration,
	) -> StrategyFuture<'a> {
		Box::pin(async move {
			#[derive(Serialize)]
			struct Body<'a> {
				client_secret: &'a str,
			}

			let url = self.endpoint()?;
			let issued_at = OffsetDateTime::now_utc();
			let body = Body { client_secret: self.client_secret.expose() };
			let response = post_token(transport, url, &body, timeout).await?;

			response.into_credential(self.kind(), issued_at)
		})
	}
}

/// Strategy B: a generic OIDC provider's client-credentials grant.
#[derive(Clone, Debug)]
pub struct OidcStrategy {
	config: OidcConfig,
}
impl OidcStrategy {
	/// Builds the strategy from OIDC settings.
	pub fn new(config: OidcConfig) -> Self {
		Self { config }
	}
}
impl AcquisitionStrategy for OidcStrategy {
	fn kind(&self) -> CredentialKind {
		CredentialKind::Secondary
	}

	fn is_enabled(&self) -> bool {
		self.config.enabled
	}

	fn acquire<'a>(
		&'a self,
		transport: &'a dyn HttpTransport,
		timeout: StdDuration,
	) -> StrategyFuture<'a> {
		Box::pin(async move {
			#[derive(Serialize)]
			struct Body<'a> {
				client_id: &'a str,
				client_secret: &'a str,
				audience: &'a str,
				grant_type: &'static str,
			}

			let url = self.config.token_url()?;
			let issued_at = OffsetDateTime::now_utc();
			let body = Body {
				client_id: &self.config.client_id,
				client_secret: self.config.client_secret.expose(),
				audience: &self.config.audience,
				grant_type: "client_credentials",
			};
			let response = post_token(transport, url, &body, timeout).await?;

			response.into_credential(self.kind(), issued_at)
		})
	}
}

/// Strategy C: a locally synthesized, unsigned development token.
///
/// The token embeds only a truncated SHA-256 fingerprint of the seed, never the seed itself.
#[derive(Clone)]
pub struct FallbackStrategy {
	fingerprint: String,
	ttl: Duration,
}
impl FallbackStrategy {
	const FINGERPRINT_BYTES: usize = 8;

	/// Builds the strategy from the configured seed.
	pub fn new(seed: &TokenSecret) -> Self {
		let digest = Sha256::digest(seed.expose().as_bytes());
		let fingerprint = digest
			.iter()
			.take(Self::FINGERPRINT_BYTES)
			.map(|byte| format!("{byte:02x}"))
			.collect::<String>();

		Self { fingerprint, ttl: Duration::seconds(DEFAULT_TOKEN_TTL_SECS) }
	}

	/// Hex fingerprint embedded in every token.
	pub fn fingerprint(&self) -> &str {
		&self.fingerprint
	}

	/// Mints a token issued at `issued_at`.
	pub fn mint(&self, issued_at: OffsetDateTime) -> Result<Credential, StrategyError> {
		let millis = issued_at.unix_timestamp_nanos() / 1_000_000;
		let nonce = rand::random::<u64>();
		let raw = format!("dev-fallback:{}:{millis}:{nonce:016x}", self.fingerprint);

		Ok(Credential::builder(CredentialKind::Fallback)
			.value(URL_SAFE_NO_PAD.encode(raw))
			.issued_at(issued_at)
			.expires_in(self.ttl)
			.build()?)
	}
}
impl Debug for FallbackStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FallbackStrategy").field("ttl", &self.ttl).finish_non_exhaustive()
	}
}
impl AcquisitionStrategy for FallbackStrategy {
	fn kind(&self) -> CredentialKind {
		CredentialKind::Fallback
	}

	fn acquire<'a>(&'a self, _: &'a dyn HttpTransport, _: StdDuration) -> StrategyFuture<'a> {
		Box::pin(async move { self.mint(OffsetDateTime::now_utc()) })
	}
}

/// Builds the standard `[first-party, oidc, fallback]` chain from `config`.
///
/// Unconfigured strategies are omitted; configured but disabled ones stay in the chain and are
/// skipped at acquisition time.
pub fn default_strategies(config: &BrokerConfig) -> Vec<Arc<dyn AcquisitionStrategy>> {
	let mut strategies = Vec::<Arc<dyn AcquisitionStrategy>>::with_capacity(3);

	if let Some(first_party) = &config.first_party {
		strategies.push(Arc::new(FirstPartyStrategy::new(config.api_base.clone(), first_party)));
	}
	if let Some(oidc) = &config.oidc {
		strategies.push(Arc::new(OidcStrategy::new(oidc.clone())));
	}

	strategies.push(Arc::new(FallbackStrategy::new(&config.fallback_seed)));

	strategies
}
