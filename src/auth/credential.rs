//! Immutable bearer credentials, their provenance, and lifecycle helpers.

// self
use crate::_prelude::*;

/// Which acquisition strategy minted a credential.
///
/// The ordering mirrors strategy priority: `Primary` beats `Secondary`, which beats `Fallback`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
	/// First-party client-credentials endpoint of the catalog API.
	Primary,
	/// Generic OIDC client-credentials provider.
	Secondary,
	/// Locally synthesized development token; never sent as a bearer.
	Fallback,
}
impl CredentialKind {
	/// Returns a stable label suitable for logs and metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CredentialKind::Primary => "primary",
			CredentialKind::Secondary => "secondary",
			CredentialKind::Fallback => "fallback",
		}
	}

	/// Returns `true` when credentials of this kind are attached as `Authorization: Bearer`.
	pub const fn sends_authorization(self) -> bool {
		!matches!(self, CredentialKind::Fallback)
	}
}
impl Display for CredentialKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Current lifecycle status for a credential at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialStatus {
	/// Valid with more than the safety margin left.
	Fresh,
	/// Still valid but inside the safety margin; callers should re-acquire.
	Expiring,
	/// Past its hard expiry.
	Expired,
}

/// Redacted secret wrapper keeping bearer values out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("TokenSecret(<redacted>)")
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Errors produced by [`CredentialBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CredentialBuilderError {
	/// No token value was provided, or it was blank.
	#[error("Credential value is required.")]
	MissingValue,
	/// No expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
	/// The expiry does not fall strictly after the issue instant.
	#[error("Credential must expire after it was issued.")]
	NonPositiveLifetime,
}

/// Bearer credential held by the token store.
///
/// Credentials are replaced wholesale; there is no partial update.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
	/// Opaque token value; callers must avoid logging it.
	pub value: TokenSecret,
	/// Strategy that minted the credential.
	pub kind: CredentialKind,
	/// Instant the credential was minted.
	pub issued_at: OffsetDateTime,
	/// Hard expiry instant.
	pub expires_at: OffsetDateTime,
}
impl Credential {
	/// Returns a builder for a credential of the given kind.
	pub fn builder(kind: CredentialKind) -> CredentialBuilder {
		CredentialBuilder::new(kind)
	}

	/// Computes the lifecycle status at `instant` given a refresh safety margin.
	pub fn status_at(&self, instant: OffsetDateTime, margin: Duration) -> CredentialStatus {
		if instant >= self.expires_at {
			return CredentialStatus::Expired;
		}
		if self.expires_at - instant > margin {
			return CredentialStatus::Fresh;
		}

		CredentialStatus::Expiring
	}

	/// Returns `true` when the credential can be reused at `instant` without re-acquisition.
	pub fn is_usable_at(&self, instant: OffsetDateTime, margin: Duration) -> bool {
		matches!(self.status_at(instant, margin), CredentialStatus::Fresh)
	}

	/// Returns `true` if the credential is past its hard expiry at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Remaining lifetime at `instant`, clamped at zero.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.expires_at - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}

	/// Builds the `Authorization` header value, or `None` for fallback credentials.
	pub fn authorization_header(&self) -> Option<String> {
		self.kind.sends_authorization().then(|| format!("Bearer {}", self.value.expose()))
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("value", &"<redacted>")
			.field("kind", &self.kind)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`Credential`].
#[derive(Clone, Debug)]
pub struct CredentialBuilder {
	kind: CredentialKind,
	value: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl CredentialBuilder {
	fn new(kind: CredentialKind) -> Self {
		Self { kind, value: None, issued_at: None, expires_at: None, expires_in: None }
	}

	/// Provides the token value.
	pub fn value(mut self, token: impl Into<String>) -> Self {
		self.value = Some(TokenSecret::new(token));

		self
	}

	/// Sets the issued-at instant (defaults to now).
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a lifetime relative to the issue instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Consumes the builder and produces a [`Credential`].
	pub fn build(self) -> Result<Credential, CredentialBuilderError> {
		let value = self
			.value
			.filter(|secret| !secret.expose().trim().is_empty())
			.ok_or(CredentialBuilderError::MissingValue)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => issued_at + delta,
			(None, None) => return Err(CredentialBuilderError::MissingExpiry),
		};

		if expires_at <= issued_at {
			return Err(CredentialBuilderError::NonPositiveLifetime);
		}

		Ok(Credential { value, kind: self.kind, issued_at, expires_at })
	}
}
