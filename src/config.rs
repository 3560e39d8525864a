//! Validated broker configuration.
//!
//! Hosts load values from wherever they like (the structs derive serde) and hand them to
//! [`BrokerConfig::builder`]; nothing in the crate reads the process environment.

// crates.io
use url::form_urlencoded;
// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Default CDN playlist feed base.
pub const DEFAULT_CDN_BASE: &str = "https://cdn.jwplayer.com/v2/playlists";
/// Default refresh safety margin in seconds.
pub const DEFAULT_SAFETY_MARGIN_SECS: i64 = 30;
/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(10);
/// Default number of concurrent CDN fetches during reconciliation.
pub const DEFAULT_RECONCILE_CONCURRENCY: usize = 4;

/// Settings for the catalog API's own client-credentials endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstPartyConfig {
	/// Disabled strategies are skipped without network traffic.
	pub enabled: bool,
	/// Secret posted to `/auth/client-credentials`.
	pub client_secret: TokenSecret,
}
impl FirstPartyConfig {
	/// Enabled strategy using `client_secret`.
	pub fn new(client_secret: impl Into<String>) -> Self {
		Self { enabled: true, client_secret: TokenSecret::new(client_secret) }
	}

	/// Returns a copy with the strategy turned off.
	pub fn disabled(mut self) -> Self {
		self.enabled = false;

		self
	}
}

/// Settings for a generic OIDC client-credentials provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OidcConfig {
	/// Disabled strategies are skipped without network traffic.
	pub enabled: bool,
	/// Provider domain; the token endpoint is `https://{domain}/oauth/token`.
	pub domain: String,
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
	/// Audience requested for the access token.
	pub audience: String,
	/// Explicit token endpoint overriding the one derived from `domain`.
	#[serde(default)]
	pub token_endpoint: Option<Url>,
}
impl OidcConfig {
	/// Enabled strategy for the given provider and client.
	pub fn new(
		domain: impl Into<String>,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		audience: impl Into<String>,
	) -> Self {
		Self {
			enabled: true,
			domain: domain.into(),
			client_id: client_id.into(),
			client_secret: TokenSecret::new(client_secret),
			audience: audience.into(),
			token_endpoint: None,
		}
	}

	/// Overrides the derived token endpoint.
	pub fn with_token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Returns a copy with the strategy turned off.
	pub fn disabled(mut self) -> Self {
		self.enabled = false;

		self
	}

	/// Resolves the token endpoint.
	pub fn token_url(&self) -> Result<Url, ConfigError> {
		if let Some(url) = &self.token_endpoint {
			return Ok(url.clone());
		}

		Url::parse(&format!("https://{}/oauth/token", self.domain.trim().trim_end_matches('/')))
			.map_err(|source| ConfigError::InvalidEndpoint { endpoint: "oidc token", source })
	}
}

/// Immutable configuration shared by the broker, gateway, CDN client, and reconciler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrokerConfig {
	/// Catalog API base URL.
	pub api_base: Url,
	/// First-party strategy settings; `None` disables it.
	pub first_party: Option<FirstPartyConfig>,
	/// OIDC strategy settings; `None` disables it.
	pub oidc: Option<OidcConfig>,
	/// Seed fingerprinted into fallback tokens.
	pub fallback_seed: TokenSecret,
	/// Credentials closer than this to expiry are re-acquired.
	pub safety_margin: Duration,
	/// Upper bound for every outbound request.
	pub request_timeout: StdDuration,
	/// CDN playlist feed base URL.
	pub cdn_base: Url,
	/// Maximum concurrent CDN fetches per reconciliation pass.
	pub reconcile_concurrency: usize,
}
impl BrokerConfig {
	/// Starts a builder targeting `api_base`.
	pub fn builder(api_base: Url) -> BrokerConfigBuilder {
		BrokerConfigBuilder::new(api_base)
	}

	/// Resolves `path` (optionally carrying a query string) against the catalog API base.
	pub fn api_url(&self, path: &str) -> Result<Url, ConfigError> {
		join_path(&self.api_base, path)
			.map_err(|source| ConfigError::InvalidEndpoint { endpoint: "api", source })
	}

	/// Returns `true` when the first-party strategy is configured and enabled.
	pub fn first_party_enabled(&self) -> bool {
		self.first_party.as_ref().is_some_and(|cfg| cfg.enabled)
	}

	/// Returns `true` when the OIDC strategy is configured and enabled.
	pub fn oidc_enabled(&self) -> bool {
		self.oidc.as_ref().is_some_and(|cfg| cfg.enabled)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		validate_endpoint("api", &self.api_base)?;
		validate_endpoint("cdn", &self.cdn_base)?;

		if let Some(first_party) = self.first_party.as_ref().filter(|cfg| cfg.enabled) {
			require("first-party", "client_secret", first_party.client_secret.expose())?;
		}
		if let Some(oidc) = self.oidc.as_ref().filter(|cfg| cfg.enabled) {
			if oidc.token_endpoint.is_none() {
				require("oidc", "domain", &oidc.domain)?;
			}

			require("oidc", "client_id", &oidc.client_id)?;
			require("oidc", "client_secret", oidc.client_secret.expose())?;
			validate_endpoint("oidc token", &oidc.token_url()?)?;
		}
		if self.request_timeout.is_zero() {
			return Err(ConfigError::NonPositiveTimeout);
		}
		if self.safety_margin.is_negative() {
			return Err(ConfigError::NegativeSafetyMargin);
		}
		if self.reconcile_concurrency == 0 {
			return Err(ConfigError::ZeroConcurrency);
		}

		Ok(())
	}
}

/// Builder for [`BrokerConfig`].
#[derive(Debug)]
pub struct BrokerConfigBuilder {
	api_base: Url,
	first_party: Option<FirstPartyConfig>,
	oidc: Option<OidcConfig>,
	fallback_seed: Option<String>,
	safety_margin: Duration,
	request_timeout: StdDuration,
	cdn_base: Option<Url>,
	reconcile_concurrency: usize,
}
impl BrokerConfigBuilder {
	fn new(api_base: Url) -> Self {
		Self {
			api_base,
			first_party: None,
			oidc: None,
			fallback_seed: None,
			safety_margin: Duration::seconds(DEFAULT_SAFETY_MARGIN_SECS),
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
			cdn_base: None,
			reconcile_concurrency: DEFAULT_RECONCILE_CONCURRENCY,
		}
	}

	/// Configures the first-party strategy.
	pub fn first_party(mut self, config: FirstPartyConfig) -> Self {
		self.first_party = Some(config);

		self
	}

	/// Configures the OIDC strategy.
	pub fn oidc(mut self, config: OidcConfig) -> Self {
		self.oidc = Some(config);

		self
	}

	/// Sets the fallback token seed (defaults to the API host).
	pub fn fallback_seed(mut self, seed: impl Into<String>) -> Self {
		self.fallback_seed = Some(seed.into());

		self
	}

	/// Overrides the 30 second safety margin.
	pub fn safety_margin(mut self, margin: Duration) -> Self {
		self.safety_margin = margin;

		self
	}

	/// Overrides the 10 second request timeout.
	pub fn request_timeout(mut self, timeout: StdDuration) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Overrides the CDN feed base.
	pub fn cdn_base(mut self, url: Url) -> Self {
		self.cdn_base = Some(url);

		self
	}

	/// Overrides the reconciliation fan-out.
	pub fn reconcile_concurrency(mut self, concurrency: usize) -> Self {
		self.reconcile_concurrency = concurrency;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<BrokerConfig, ConfigError> {
		let cdn_base = match self.cdn_base {
			Some(url) => url,
			None => Url::parse(DEFAULT_CDN_BASE)
				.map_err(|source| ConfigError::InvalidEndpoint { endpoint: "cdn", source })?,
		};
		let fallback_seed = self
			.fallback_seed
			.unwrap_or_else(|| self.api_base.host_str().unwrap_or("catalog-broker").to_owned());
		let config = BrokerConfig {
			api_base: self.api_base,
			first_party: self.first_party,
			oidc: self.oidc,
			fallback_seed: TokenSecret::new(fallback_seed),
			safety_margin: self.safety_margin,
			request_timeout: self.request_timeout,
			cdn_base,
			reconcile_concurrency: self.reconcile_concurrency,
		};

		config.validate()?;

		Ok(config)
	}
}

/// Appends `path` to `base` without discarding the base's own path segments.
pub(crate) fn join_path(base: &Url, path: &str) -> Result<Url, url::ParseError> {
	Url::parse(&format!("{}/{}", base.as_str().trim_end_matches('/'), path.trim_start_matches('/')))
}

/// Appends `segment` to `base` as exactly one percent-encoded path segment.
pub(crate) fn push_segment(base: &Url, segment: &str) -> Result<Url, ConfigError> {
	ensure_segment(segment)?;

	let mut url = base.clone();

	url.path_segments_mut()
		.map_err(|()| ConfigError::UnsupportedScheme {
			endpoint: "resource",
			url: base.to_string(),
		})?
		.pop_if_empty()
		.push(segment);

	Ok(url)
}

/// Percent-encodes `segment` so it survives [`join_path`] as exactly one path segment.
pub(crate) fn encode_segment(segment: &str) -> Result<String, ConfigError> {
	ensure_segment(segment)?;

	// `byte_serialize` leaves a literal `+` encoded as `%2B`, so every `+` it emits was a space.
	Ok(form_urlencoded::byte_serialize(segment.as_bytes()).collect::<String>().replace('+', "%20"))
}

fn ensure_segment(segment: &str) -> Result<(), ConfigError> {
	if matches!(segment, "" | "." | "..") {
		return Err(ConfigError::InvalidSegment { segment: segment.to_owned() });
	}

	Ok(())
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ConfigError> {
	match url.scheme() {
		"http" | "https" => Ok(()),
		_ => Err(ConfigError::UnsupportedScheme { endpoint: name, url: url.to_string() }),
	}
}

fn require(strategy: &'static str, field: &'static str, value: &str) -> Result<(), ConfigError> {
	if value.trim().is_empty() { Err(ConfigError::MissingValue { strategy, field }) } else { Ok(()) }
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn base() -> Url {
		Url::parse("https://api.example.com/v1/").expect("API base fixture should parse.")
	}

	#[test]
	fn segments_are_encoded_whole() {
		let encode = |segment| encode_segment(segment).expect("Segment should encode.");

		assert_eq!(encode("pl#1"), "pl%231");
		assert_eq!(encode("a b+c"), "a%20b%2Bc");
		assert_eq!(encode("../secret"), "..%2Fsecret");
		assert_eq!(encode("100%"), "100%25");

		for rejected in ["", ".", ".."] {
			assert!(matches!(encode_segment(rejected), Err(ConfigError::InvalidSegment { .. })));
			assert!(push_segment(&base(), rejected).is_err());
		}

		let url = push_segment(&base(), "x/y?z").expect("Segment should be pushed.");

		assert_eq!(url.as_str(), "https://api.example.com/v1/x%2Fy%3Fz");
	}

	#[test]
	fn defaults_are_applied() {
		let config = BrokerConfig::builder(base()).build().expect("Default config should build.");

		assert_eq!(config.safety_margin, Duration::seconds(30));
		assert_eq!(config.request_timeout, StdDuration::from_secs(10));
		assert_eq!(config.cdn_base.as_str(), DEFAULT_CDN_BASE);
		assert_eq!(config.reconcile_concurrency, 4);
		assert_eq!(config.fallback_seed.expose(), "api.example.com");
		assert!(!config.first_party_enabled());
		assert!(!config.oidc_enabled());
	}

	#[test]
	fn api_urls_keep_base_path_and_query() {
		let config = BrokerConfig::builder(base()).build().expect("Default config should build.");
		let url = config.api_url("/videos?active=1").expect("API path should resolve.");

		assert_eq!(url.as_str(), "https://api.example.com/v1/videos?active=1");
	}

	#[test]
	fn enabled_strategies_require_secrets() {
		let err = BrokerConfig::builder(base())
			.first_party(FirstPartyConfig::new("  "))
			.build()
			.expect_err("Blank first-party secrets should be rejected.");

		assert!(matches!(
			err,
			ConfigError::MissingValue { strategy: "first-party", field: "client_secret" }
		));

		// Disabled strategies are not validated.
		BrokerConfig::builder(base())
			.first_party(FirstPartyConfig::new("").disabled())
			.build()
			.expect("Disabled strategies should not be validated.");

		let err = BrokerConfig::builder(base())
			.oidc(OidcConfig::new("tenant.auth.example.com", "", "secret", "api"))
			.build()
			.expect_err("Missing OIDC client ids should be rejected.");

		assert!(matches!(err, ConfigError::MissingValue { strategy: "oidc", field: "client_id" }));
	}

	#[test]
	fn oidc_endpoint_is_derived_from_domain() {
		let oidc = OidcConfig::new("tenant.auth.example.com/", "id", "secret", "api");

		assert_eq!(
			oidc.token_url().expect("Derived endpoint should parse.").as_str(),
			"https://tenant.auth.example.com/oauth/token"
		);

		let overridden = oidc.with_token_endpoint(
			Url::parse("http://127.0.0.1:9000/oauth/token").expect("Override should parse."),
		);

		assert_eq!(
			overridden.token_url().expect("Override should be returned.").as_str(),
			"http://127.0.0.1:9000/oauth/token"
		);
	}

	#[test]
	fn numeric_bounds_are_validated() {
		assert!(matches!(
			BrokerConfig::builder(base()).request_timeout(StdDuration::ZERO).build(),
			Err(ConfigError::NonPositiveTimeout)
		));
		assert!(matches!(
			BrokerConfig::builder(base()).safety_margin(Duration::seconds(-1)).build(),
			Err(ConfigError::NegativeSafetyMargin)
		));
		assert!(matches!(
			BrokerConfig::builder(base()).reconcile_concurrency(0).build(),
			Err(ConfigError::ZeroConcurrency)
		));
		assert!(matches!(
			BrokerConfig::builder(Url::parse("ftp://files.example.com").expect("URL should parse."))
				.build(),
			Err(ConfigError::UnsupportedScheme { endpoint: "api", .. })
		));
	}
}
