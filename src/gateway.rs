//! Authenticated access to the catalog API with a single refresh-and-retry on rejection.

pub mod retry;

pub use retry::RetryPolicy;

// self
use crate::{
	_prelude::*,
	auth::Credential,
	broker::TokenBroker,
	http::{HttpMethod, HttpRequest, HttpResponse},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Wraps outbound catalog calls with broker-issued credentials.
#[derive(Clone, Debug)]
pub struct AuthenticatedGateway {
	broker: Arc<TokenBroker>,
	retry: RetryPolicy,
}
impl AuthenticatedGateway {
	/// Creates a gateway with the default retry policy.
	pub fn new(broker: Arc<TokenBroker>) -> Self {
		Self { broker, retry: RetryPolicy::default() }
	}

	/// Replaces the retry policy.
	pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}

	/// Broker backing this gateway.
	pub fn broker(&self) -> &Arc<TokenBroker> {
		&self.broker
	}

	/// Active retry policy.
	pub fn retry_policy(&self) -> RetryPolicy {
		self.retry
	}

	/// Issues an authenticated call and returns the 2xx response.
	///
	/// A 401 triggers at most one refresh and one retry; a second 401 yields
	/// [`Error::Unauthorized`]. Every other non-2xx status yields [`Error::Api`].
	pub async fn request(
		&self,
		method: HttpMethod,
		path: &str,
		body: Option<serde_json::Value>,
	) -> Result<HttpResponse> {
		let body =
			body.map(|value| serde_json::to_vec(&value)).transpose().map_err(Error::Encode)?;

		self.execute(method, path, body).await
	}

	/// Like [`request`](Self::request) but serializes any `Serialize` body.
	pub async fn send<B>(
		&self,
		method: HttpMethod,
		path: &str,
		body: Option<&B>,
	) -> Result<HttpResponse>
	where
		B: ?Sized + Serialize,
	{
		let body = body.map(serde_json::to_vec).transpose().map_err(Error::Encode)?;

		self.execute(method, path, body).await
	}

	/// Issues a call without credentials; any status is returned as-is.
	pub async fn request_anonymous(&self, method: HttpMethod, path: &str) -> Result<HttpResponse> {
		let config = self.broker.config();
		let request = HttpRequest::new(method, config.api_url(path)?)
			.header("accept", "application/json")
			.timeout(config.request_timeout);

		Ok(self.broker.transport().execute(request).await?)
	}

	async fn execute(
		&self,
		method: HttpMethod,
		path: &str,
		body: Option<Vec<u8>>,
	) -> Result<HttpResponse> {
		const KIND: FlowKind = FlowKind::Request;

		let span = FlowSpan::new(KIND, "request");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let url = self.broker.config().api_url(path)?;
				let mut credential = self.broker.acquire().await?;
				let mut attempt = 1;
				let mut refreshed = false;

				loop {
					let request = self.build_request(method, url.clone(), &credential, body.clone());
					let response = self.broker.transport().execute(request).await?;

					if response.is_success() {
						return Ok(response);
					}
					if !self.retry.is_trigger(response.status) {
						return Err(Error::Api { status: response.status, body: response.text() });
					}
					if !self.retry.should_refresh(attempt, refreshed) {
						return Err(Error::Unauthorized {
							status: response.status,
							body: response.text(),
						});
					}

					obs::credential_rejected(credential.kind, response.status);

					credential = self.broker.refresh_rejected(&credential).await?;
					refreshed = true;
					attempt += 1;

					if !self.retry.backoff().is_zero() {
						tokio::time::sleep(self.retry.backoff()).await;
					}
				}
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	fn build_request(
		&self,
		method: HttpMethod,
		url: Url,
		credential: &Credential,
		body: Option<Vec<u8>>,
	) -> HttpRequest {
		let mut request = HttpRequest::new(method, url)
			.header("accept", "application/json")
			.timeout(self.broker.config().request_timeout);

		if let Some(authorization) = credential.authorization_header() {
			request = request.header("authorization", authorization);
		}
		if let Some(body) = body {
			request = request.json_body(body);
		}

		request
	}
}
