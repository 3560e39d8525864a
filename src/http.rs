//! Transport primitives shared by the broker, the authenticated gateway, and the CDN client.
//!
//! The module exposes [`HttpTransport`] alongside the crate-owned [`HttpRequest`] and
//! [`HttpResponse`] types so downstream crates can plug in custom HTTP stacks (or scripted
//! fakes in tests) without the rest of the crate depending on reqwest. Every request carries
//! its own timeout; implementations must honor it.

// std
use std::borrow::Cow;
// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing a single request.
///
/// Implementations must be `Send + Sync` so one transport can be shared by the broker, the
/// gateway, and the CDN client behind an `Arc<dyn HttpTransport>`. A response with any HTTP
/// status is a successful execution; only failures to obtain a response map to
/// [`TransportError`].
pub trait HttpTransport
where
	Self: Send + Sync,
{
	/// Executes `request` and buffers the full response body.
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// HTTP verbs used by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
	/// `GET`
	Get,
	/// `HEAD`
	Head,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `DELETE`
	Delete,
}
impl HttpMethod {
	/// Returns the canonical upper-case verb.
	pub const fn as_str(self) -> &'static str {
		match self {
			HttpMethod::Get => "GET",
			HttpMethod::Head => "HEAD",
			HttpMethod::Post => "POST",
			HttpMethod::Put => "PUT",
			HttpMethod::Delete => "DELETE",
		}
	}
}
impl Display for HttpMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Transport-agnostic outbound request.
#[derive(Clone)]
pub struct HttpRequest {
	/// HTTP verb.
	pub method: HttpMethod,
	/// Absolute target URL.
	pub url: Url,
	/// Header pairs in insertion order.
	pub headers: Vec<(Cow<'static, str>, String)>,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
	/// Upper bound for the whole exchange.
	pub timeout: Option<StdDuration>,
}
impl HttpRequest {
	/// Creates a request without headers, body, or timeout.
	pub fn new(method: HttpMethod, url: Url) -> Self {
		Self { method, url, headers: Vec::new(), body: None, timeout: None }
	}

	/// Appends a header.
	pub fn header(mut self, name: impl Into<Cow<'static, str>>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Attaches a JSON body and the matching content type.
	pub fn json_body(self, body: Vec<u8>) -> Self {
		let mut request = self.header("content-type", "application/json");

		request.body = Some(body);

		request
	}

	/// Sets the request timeout.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Returns the value of the first header matching `name` (ASCII case-insensitive).
	pub fn header_value(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}
}
impl Debug for HttpRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let headers = self
			.headers
			.iter()
			.map(|(key, value)| {
				let shown =
					if key.eq_ignore_ascii_case("authorization") { "<redacted>" } else { value };

				(key.as_ref(), shown)
			})
			.collect::<Vec<_>>();

		f.debug_struct("HttpRequest")
			.field("method", &self.method)
			.field("url", &self.url.as_str())
			.field("headers", &headers)
			.field("body_len", &self.body.as_ref().map(Vec::len))
			.field("timeout", &self.timeout)
			.finish()
	}
}

/// Buffered HTTP response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpResponse {
	/// HTTP status code.
	pub status: u16,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl HttpResponse {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates a response from a status and body.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, body: body.into() }
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns `true` when the body is empty or whitespace only.
	pub fn is_empty(&self) -> bool {
		self.body.iter().all(u8::is_ascii_whitespace)
	}

	/// Decodes the body as JSON, reporting the failing path on error.
	pub fn json<T>(&self) -> Result<T, serde_path_to_error::Error<serde_json::Error>>
	where
		T: DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut de)
	}

	/// Returns the body decoded lossily as UTF-8.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Returns a bounded, lossy preview of the body for diagnostics.
	pub fn body_preview(&self) -> String {
		let text = self.text();

		if text.chars().count() <= Self::BODY_PREVIEW_LIMIT {
			return text;
		}

		let mut buf = text.chars().take(Self::BODY_PREVIEW_LIMIT).collect::<String>();

		buf.push('…');

		buf
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Redirects are followed according to the wrapped client's policy; per-request timeouts from
/// [`HttpRequest::timeout`] override any client-level timeout.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client whose connections fail after `timeout`.
	pub fn with_timeout(timeout: StdDuration) -> Result<Self, crate::error::ConfigError> {
		let client = ReqwestClient::builder().connect_timeout(timeout).timeout(timeout).build()?;

		Ok(Self(client))
	}

	fn convert_method(method: HttpMethod) -> reqwest::Method {
		match method {
			HttpMethod::Get => reqwest::Method::GET,
			HttpMethod::Head => reqwest::Method::HEAD,
			HttpMethod::Post => reqwest::Method::POST,
			HttpMethod::Put => reqwest::Method::PUT,
			HttpMethod::Delete => reqwest::Method::DELETE,
		}
	}

	fn map_error(url: &Url, err: ReqwestError) -> TransportError {
		if err.is_timeout() {
			TransportError::Timeout { url: url.to_string() }
		} else {
			TransportError::network(url, err)
		}
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestHttpClient {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let HttpRequest { method, url, headers, body, timeout } = request;
			let mut builder = self.0.request(Self::convert_method(method), url.clone());

			for (name, value) in &headers {
				builder = builder.header(name.as_ref(), value.as_str());
			}
			if let Some(body) = body {
				builder = builder.body(body);
			}
			if let Some(timeout) = timeout {
				builder = builder.timeout(timeout);
			}

			let response = builder.send().await.map_err(|e| Self::map_error(&url, e))?;
			let status = response.status().as_u16();
			let body = response.bytes().await.map_err(|e| Self::map_error(&url, e))?.to_vec();

			Ok(HttpResponse { status, body })
		})
	}
}
