//! Unauthenticated client for the JW Player v2 playlist feed.
//!
//! A missing feed is an expected condition (plenty of catalog playlists have no CDN
//! counterpart), so every failure is logged and collapsed to `None` or `false`.

// self
use crate::{
	_prelude::*,
	broker::TokenBroker,
	config,
	error::{ConfigError, TransportError},
	http::{HttpMethod, HttpRequest, HttpTransport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Player embed page prefix.
pub const EMBED_BASE: &str = "https://content.jwplatform.com/players";

/// A rendition of a CDN video.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CdnSource {
	/// Media URL.
	#[serde(rename = "file")]
	pub file_url: String,
	/// MIME type, e.g. `video/mp4` or `application/vnd.apple.mpegurl`.
	#[serde(rename = "type", default)]
	pub mime_type: String,
	/// Frame width in pixels.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub width: Option<u32>,
	/// Frame height in pixels.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub height: Option<u32>,
}

/// A video entry in a CDN playlist feed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CdnVideo {
	/// CDN media identifier.
	#[serde(rename = "mediaid")]
	pub media_id: String,
	/// Display title.
	#[serde(default)]
	pub title: String,
	/// Long-form description.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	/// Duration in seconds.
	#[serde(rename = "duration", default, skip_serializing_if = "Option::is_none")]
	pub duration_seconds: Option<f64>,
	/// Poster image URL.
	#[serde(rename = "image", default, skip_serializing_if = "Option::is_none")]
	pub thumbnail_url: Option<String>,
	/// Canonical page link.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub link: Option<String>,
	/// Publication instant in Unix seconds.
	#[serde(rename = "pubdate", default, skip_serializing_if = "Option::is_none")]
	pub published_at: Option<i64>,
	/// Available renditions.
	#[serde(default)]
	pub sources: Vec<CdnSource>,
}

/// A full playlist feed document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CdnPlaylistFeed {
	/// Playlist title.
	#[serde(default)]
	pub title: String,
	/// Playlist description.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	/// Feed kind reported by the CDN.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub kind: Option<String>,
	/// Feed identifier reported by the CDN.
	#[serde(rename = "feedid", default, skip_serializing_if = "Option::is_none")]
	pub feed_id: Option<String>,
	/// Entries in feed order.
	#[serde(default)]
	pub playlist: Vec<CdnVideo>,
}

#[derive(Debug, ThisError)]
enum CdnError {
	#[error(transparent)]
	Endpoint(#[from] ConfigError),
	#[error(transparent)]
	Transport(#[from] TransportError),
	#[error("CDN returned HTTP {0}.")]
	Status(u16),
	#[error("CDN feed could not be decoded at `{path}`: {source}.")]
	Decode { path: String, source: serde_json::Error },
}
impl From<serde_path_to_error::Error<serde_json::Error>> for CdnError {
	fn from(e: serde_path_to_error::Error<serde_json::Error>) -> Self {
		let path = e.path().to_string();

		Self::Decode { path, source: e.into_inner() }
	}
}

/// Typed accessor for CDN playlist feeds.
#[derive(Clone)]
pub struct CdnClient {
	transport: Arc<dyn HttpTransport>,
	base: Url,
	timeout: StdDuration,
}
impl CdnClient {
	/// Creates a client for `base` (e.g. `https://cdn.jwplayer.com/v2/playlists`).
	pub fn new(transport: Arc<dyn HttpTransport>, base: Url, timeout: StdDuration) -> Self {
		Self { transport, base, timeout }
	}

	/// Shares the broker's transport and configuration.
	pub fn from_broker(broker: &TokenBroker) -> Self {
		let config = broker.config();

		Self::new(broker.transport().clone(), config.cdn_base.clone(), config.request_timeout)
	}

	/// Feed base URL.
	pub fn base(&self) -> &Url {
		&self.base
	}

	/// JSON feed URL for `playlist_id`.
	pub fn playlist_url(&self, playlist_id: &str) -> Result<Url> {
		Ok(self.feed_url(playlist_id)?)
	}

	/// Player embed page for `media_id`.
	pub fn embed_url(&self, media_id: &str) -> String {
		format!("{EMBED_BASE}/{media_id}.html")
	}

	/// Fetches the whole feed document, or `None` when it is unavailable.
	pub async fn fetch_feed(&self, playlist_id: &str) -> Option<CdnPlaylistFeed> {
		const KIND: FlowKind = FlowKind::CdnFetch;

		let span = FlowSpan::new(KIND, "fetch_playlist");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.try_fetch_feed(playlist_id)).await;

		obs::record_result(KIND, &result);

		match result {
			Ok(feed) => Some(feed),
			Err(e) => {
				obs::cdn_unavailable(playlist_id, &e);

				None
			},
		}
	}

	/// Fetches the entries of a playlist, or `None` when the feed is unavailable.
	pub async fn fetch_playlist(&self, playlist_id: &str) -> Option<Vec<CdnVideo>> {
		self.fetch_feed(playlist_id).await.map(|feed| feed.playlist)
	}

	/// Checks the feed with `HEAD`; `false` on any failure.
	pub async fn is_available(&self, playlist_id: &str) -> bool {
		match self.try_head(playlist_id).await {
			Ok(()) => true,
			Err(e) => {
				obs::cdn_unavailable(playlist_id, &e);

				false
			},
		}
	}

	/// Entries whose title or description contains `term`, case-insensitively.
	pub async fn search_in_playlist(&self, playlist_id: &str, term: &str) -> Vec<CdnVideo> {
		let needle = term.to_lowercase();

		self.fetch_playlist(playlist_id)
			.await
			.unwrap_or_default()
			.into_iter()
			.filter(|video| {
				video.title.to_lowercase().contains(&needle)
					|| video
						.description
						.as_deref()
						.is_some_and(|description| description.to_lowercase().contains(&needle))
			})
			.collect()
	}

	async fn try_fetch_feed(&self, playlist_id: &str) -> Result<CdnPlaylistFeed, CdnError> {
		let request = HttpRequest::new(HttpMethod::Get, self.feed_url(playlist_id)?)
			.header("accept", "application/json")
			.timeout(self.timeout);
		let response = self.transport.execute(request).await?;

		if !response.is_success() {
			return Err(CdnError::Status(response.status));
		}

		Ok(response.json()?)
	}

	async fn try_head(&self, playlist_id: &str) -> Result<(), CdnError> {
		let request =
			HttpRequest::new(HttpMethod::Head, self.feed_url(playlist_id)?).timeout(self.timeout);
		let response = self.transport.execute(request).await?;

		if response.is_success() { Ok(()) } else { Err(CdnError::Status(response.status)) }
	}

	fn feed_url(&self, playlist_id: &str) -> Result<Url, ConfigError> {
		let mut url = config::push_segment(&self.base, playlist_id)?;

		url.query_pairs_mut().append_pair("format", "json");

		Ok(url)
	}
}
impl Debug for CdnClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CdnClient")
			.field("base", &self.base.as_str())
			.field("timeout", &self.timeout)
			.finish_non_exhaustive()
	}
}
