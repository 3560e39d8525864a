//! Catalog/CDN reconciliation.
//!
//! A pass loads every catalog video and playlist link, fetches each distinct CDN playlist once
//! with bounded concurrency, and classifies every video. Results keep catalog order and are
//! never cached between passes.

pub mod matching;

pub use matching::{MatchRule, find_match};

// std
use std::pin::pin;
// crates.io
use futures::{
	StreamExt,
	future::{self, Either},
	stream,
};
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	broker::TokenBroker,
	catalog::{CatalogClient, CatalogVideo, Playlist},
	cdn::{CdnClient, CdnVideo},
	gateway::AuthenticatedGateway,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Synchronization status of a catalog video.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncStatus {
	/// Matched to a CDN entry.
	#[serde(rename = "synced")]
	Synced,
	/// Linked to a CDN playlist that is absent, empty, or has no matching entry.
	#[serde(rename = "missing_jwplayer")]
	MissingCdn,
	/// No playlist link exists for the video's season.
	#[serde(rename = "api_only")]
	ApiOnly,
	/// Present only on the CDN; never produced by the catalog-driven scan.
	#[serde(rename = "jwplayer_only")]
	CdnOnly,
}
impl SyncStatus {
	/// Wire label.
	pub const fn as_str(self) -> &'static str {
		match self {
			SyncStatus::Synced => "synced",
			SyncStatus::MissingCdn => "missing_jwplayer",
			SyncStatus::ApiOnly => "api_only",
			SyncStatus::CdnOnly => "jwplayer_only",
		}
	}
}
impl Display for SyncStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// A catalog video enriched with its CDN counterpart.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnhancedVideo {
	/// Catalog record.
	#[serde(flatten)]
	pub video: CatalogVideo,
	/// Matched CDN entry, only set when `sync_status` is [`SyncStatus::Synced`].
	pub cdn: Option<CdnVideo>,
	/// Resolved CDN playlist, set whenever a link exists.
	pub playlist_id: Option<String>,
	/// Rule that produced the match.
	pub match_rule: Option<MatchRule>,
	/// Classification.
	pub sync_status: SyncStatus,
}
impl EnhancedVideo {
	fn matches(&self, needle: &str) -> bool {
		let hit = |text: &str| text.to_lowercase().contains(needle);

		hit(&self.video.title)
			|| self.video.description.as_deref().is_some_and(hit)
			|| self.cdn.as_ref().is_some_and(|cdn| {
				hit(&cdn.title) || cdn.description.as_deref().is_some_and(hit)
			})
	}
}

/// Counters accumulated during one pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationStats {
	/// Catalog videos examined.
	pub total_api_videos: usize,
	/// Catalog videos with a CDN match.
	pub total_cdn_videos: usize,
	/// Videos classified [`SyncStatus::Synced`].
	pub synced: usize,
	/// Videos classified [`SyncStatus::MissingCdn`].
	pub missing_cdn: usize,
	/// Videos classified [`SyncStatus::ApiOnly`].
	pub api_only: usize,
	/// Videos classified [`SyncStatus::CdnOnly`]; always zero.
	pub cdn_only: usize,
	/// Distinct playlist ids resolved during the pass.
	pub playlists_referenced: usize,
	/// Referenced playlists whose feed could be fetched.
	pub playlists_available: usize,
}
impl ReconciliationStats {
	/// Returns `true` when the classification counts add up to the catalog total.
	pub fn is_consistent(&self) -> bool {
		self.synced + self.missing_cdn + self.api_only == self.total_api_videos
	}

	fn record(&mut self, status: SyncStatus) {
		self.total_api_videos += 1;

		match status {
			SyncStatus::Synced => {
				self.synced += 1;
				self.total_cdn_videos += 1;
			},
			SyncStatus::MissingCdn => self.missing_cdn += 1,
			SyncStatus::ApiOnly => self.api_only += 1,
			SyncStatus::CdnOnly => self.cdn_only += 1,
		}
	}
}

/// Output of one pass.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Reconciliation {
	/// Enriched videos in catalog order.
	pub videos: Vec<EnhancedVideo>,
	/// Pass counters.
	pub stats: ReconciliationStats,
}
impl Reconciliation {
	/// Videos whose catalog or CDN title/description contains `term`, case-insensitively.
	pub fn search(&self, term: &str) -> Vec<&EnhancedVideo> {
		let needle = term.to_lowercase();

		self.videos.iter().filter(|video| video.matches(&needle)).collect()
	}

	/// Videos with the given status.
	pub fn by_status(&self, status: SyncStatus) -> Vec<&EnhancedVideo> {
		self.videos.iter().filter(|video| video.sync_status == status).collect()
	}
}

/// CDN availability for one catalog playlist.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlaylistStatus {
	/// Catalog record.
	#[serde(flatten)]
	pub playlist: Playlist,
	/// Whether the feed answered the availability check.
	pub available: bool,
	/// Entries in the feed (zero when unavailable).
	pub video_count: usize,
}

/// Classifies catalog videos against CDN playlist feeds.
#[derive(Clone, Debug)]
pub struct Reconciler {
	catalog: CatalogClient,
	cdn: CdnClient,
	concurrency: usize,
}
impl Reconciler {
	/// Creates a reconciler; fan-out defaults to the broker's `reconcile_concurrency`.
	pub fn new(catalog: CatalogClient, cdn: CdnClient) -> Self {
		let concurrency = catalog.gateway().broker().config().reconcile_concurrency;

		Self { catalog, cdn, concurrency }
	}

	/// Wires a catalog client, a CDN client, and a reconciler onto `broker`.
	pub fn from_broker(broker: Arc<TokenBroker>) -> Self {
		let cdn = CdnClient::from_broker(&broker);

		Self::new(CatalogClient::new(AuthenticatedGateway::new(broker)), cdn)
	}

	/// Overrides the number of concurrent CDN fetches (minimum one).
	pub fn with_concurrency(mut self, concurrency: usize) -> Self {
		self.concurrency = concurrency.max(1);

		self
	}

	/// Catalog client in use.
	pub fn catalog(&self) -> &CatalogClient {
		&self.catalog
	}

	/// CDN client in use.
	pub fn cdn(&self) -> &CdnClient {
		&self.cdn
	}

	/// Runs a full pass.
	pub async fn reconcile(&self) -> Result<Reconciliation> {
		self.reconcile_with(&CancellationToken::new()).await
	}

	/// Runs a full pass, aborting with [`Error::Cancelled`] once `cancel` fires.
	pub async fn reconcile_with(&self, cancel: &CancellationToken) -> Result<Reconciliation> {
		const KIND: FlowKind = FlowKind::Reconcile;

		let span = FlowSpan::new(KIND, "reconcile");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(until_cancelled(cancel, self.run_pass())).await;

		if let Ok(pass) = &result {
			obs::record_sync_stats(&pass.stats);
		}

		obs::record_result(KIND, &result);

		result
	}

	/// Lists every catalog playlist with CDN availability and entry counts.
	pub async fn playlist_report(&self) -> Result<Vec<PlaylistStatus>> {
		let playlists = self.catalog.playlists().list(None).await?;
		let ids = distinct(playlists.iter().map(|playlist| playlist.playlist_id.as_str()));
		let availability = stream::iter(ids)
			.map(|id| async move {
				let count = if self.cdn.is_available(id).await {
					Some(self.cdn.fetch_playlist(id).await.map_or(0, |videos| videos.len()))
				} else {
					None
				};

				(id.to_owned(), count)
			})
			.buffer_unordered(self.concurrency)
			.collect::<HashMap<_, _>>()
			.await;

		Ok(playlists
			.into_iter()
			.map(|playlist| {
				let count = availability.get(&playlist.playlist_id).copied().flatten();

				PlaylistStatus {
					available: count.is_some(),
					video_count: count.unwrap_or(0),
					playlist,
				}
			})
			.collect())
	}

	async fn run_pass(&self) -> Result<Reconciliation> {
		let videos = self.catalog.videos().list(None).await?;
		let links = self.catalog.playlist_links().await?;
		let referenced = distinct(
			videos.iter().filter_map(|video| links.get(&video.season_id)).map(String::as_str),
		);
		let feeds = self.fetch_feeds(&referenced).await;
		let mut stats = ReconciliationStats {
			playlists_referenced: referenced.len(),
			playlists_available: feeds.values().filter(|feed| feed.is_some()).count(),
			..Default::default()
		};
		let videos = videos
			.into_iter()
			.map(|video| {
				let playlist_id = links.get(&video.season_id).cloned();
				let feed = playlist_id.as_ref().and_then(|id| feeds.get(id)).and_then(Option::as_ref);
				let enhanced = classify(video, playlist_id, feed.map(Vec::as_slice));

				stats.record(enhanced.sync_status);

				enhanced
			})
			.collect();

		Ok(Reconciliation { videos, stats })
	}

	async fn fetch_feeds(&self, ids: &[&str]) -> HashMap<String, Option<Vec<CdnVideo>>> {
		stream::iter(ids.iter().copied())
			.map(|id| async move { (id.to_owned(), self.cdn.fetch_playlist(id).await) })
			.buffer_unordered(self.concurrency)
			.collect()
			.await
	}
}

fn classify(
	video: CatalogVideo,
	playlist_id: Option<String>,
	feed: Option<&[CdnVideo]>,
) -> EnhancedVideo {
	let matched = match (&playlist_id, feed) {
		(Some(_), Some(feed)) => find_match(&video, feed),
		_ => None,
	};
	let (cdn, match_rule) = match matched {
		Some((cdn, rule)) => (Some(cdn.clone()), Some(rule)),
		None => (None, None),
	};
	let sync_status = match (&playlist_id, &cdn) {
		(None, _) => SyncStatus::ApiOnly,
		(Some(_), Some(_)) => SyncStatus::Synced,
		(Some(_), None) => SyncStatus::MissingCdn,
	};

	EnhancedVideo { video, cdn, playlist_id, match_rule, sync_status }
}

fn distinct<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
	let mut seen = HashSet::new();

	ids.filter(|id| seen.insert(*id)).collect()
}

async fn until_cancelled<F, T>(cancel: &CancellationToken, fut: F) -> Result<T>
where
	F: Future<Output = Result<T>>,
{
	if cancel.is_cancelled() {
		return Err(Error::Cancelled);
	}

	match future::select(pin!(fut), pin!(cancel.cancelled())).await {
		Either::Left((result, _)) => result,
		Either::Right(_) => Err(Error::Cancelled),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn catalog(id: &str, season_id: i64, title: &str) -> CatalogVideo {
		serde_json::from_value(serde_json::json!({
			"video_id": id,
			"season_id": season_id,
			"title": title,
			"active": 1,
		}))
		.expect("Catalog fixture should decode.")
	}

	fn cdn(media_id: &str, title: &str) -> CdnVideo {
		serde_json::from_value(serde_json::json!({ "mediaid": media_id, "title": title }))
			.expect("CDN fixture should decode.")
	}

	#[test]
	fn classification_covers_every_branch() {
		let feed = vec![cdn("v1", "X")];

		let synced = classify(catalog("v1", 5, "X"), Some("pl1".into()), Some(&feed));
		let missing = classify(catalog("v2", 5, "Y"), Some("pl1".into()), Some(&feed));
		let empty = classify(catalog("v3", 5, "Z"), Some("pl1".into()), Some(&[]));
		let absent = classify(catalog("v4", 5, "Z"), Some("pl1".into()), None);
		let api_only = classify(catalog("v5", 6, "Z"), None, None);

		assert_eq!(synced.sync_status, SyncStatus::Synced);
		assert_eq!(synced.cdn.as_ref().map(|cdn| cdn.media_id.as_str()), Some("v1"));
		assert_eq!(synced.match_rule, Some(MatchRule::MediaId));
		assert_eq!(missing.sync_status, SyncStatus::MissingCdn);
		assert_eq!(missing.playlist_id.as_deref(), Some("pl1"));
		assert_eq!(empty.sync_status, SyncStatus::MissingCdn);
		assert_eq!(absent.sync_status, SyncStatus::MissingCdn);
		assert_eq!(api_only.sync_status, SyncStatus::ApiOnly);
		assert!(api_only.playlist_id.is_none());
	}

	#[test]
	fn stats_stay_consistent() {
		let mut stats = ReconciliationStats::default();

		for status in [SyncStatus::Synced, SyncStatus::MissingCdn, SyncStatus::ApiOnly] {
			stats.record(status);
		}

		assert!(stats.is_consistent());
		assert_eq!(stats.total_cdn_videos, 1);
		assert_eq!(stats.cdn_only, 0);
	}

	#[test]
	fn enhanced_videos_serialize_flat_with_wire_status() {
		let feed = vec![cdn("v1", "X")];
		let video = classify(catalog("v1", 5, "X"), Some("pl1".into()), Some(&feed));
		let value = serde_json::to_value(&video).expect("Enhanced video should encode.");

		assert_eq!(value["video_id"], "v1");
		assert_eq!(value["sync_status"], "synced");
		assert_eq!(value["match_rule"], "media_id");
		assert_eq!(value["cdn"]["mediaid"], "v1");
		assert_eq!(
			serde_json::to_value(SyncStatus::MissingCdn).expect("Status should encode."),
			"missing_jwplayer"
		);
	}

	#[test]
	fn search_and_filters_inspect_both_sides() {
		let feed = vec![cdn("v1", "Finale Special")];
		let pass = Reconciliation {
			videos: vec![
				classify(catalog("v1", 5, "Episode 10"), Some("pl1".into()), Some(&feed)),
				classify(catalog("v2", 6, "Pilot"), None, None),
			],
			stats: ReconciliationStats::default(),
		};

		assert_eq!(pass.search("special").len(), 1);
		assert_eq!(pass.search("PILOT")[0].video.id, "v2");
		assert_eq!(pass.by_status(SyncStatus::ApiOnly).len(), 1);
		assert!(pass.by_status(SyncStatus::CdnOnly).is_empty());
	}

	#[tokio::test]
	async fn cancelled_tokens_abort_before_work() {
		let cancel = CancellationToken::new();

		cancel.cancel();

		let result = until_cancelled(&cancel, async { Ok::<_, Error>(1) }).await;

		assert!(matches!(result, Err(Error::Cancelled)));
		assert_eq!(
			until_cancelled(&CancellationToken::new(), async { Ok::<_, Error>(2) })
				.await
				.expect("Uncancelled work should complete."),
			2
		);
	}
}
