//! Deterministic catalog-to-CDN matching heuristics.

// self
use crate::{_prelude::*, catalog::CatalogVideo, cdn::CdnVideo};

/// Catalog title tokens must be longer than this many characters to be used for matching.
pub const MIN_TOKEN_CHARS: usize = 3;

/// Heuristic that paired a catalog video with a CDN entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
	/// The catalog id equals the CDN media id.
	MediaId,
	/// Titles are equal after trimming and lowercasing.
	ExactTitle,
	/// The CDN title contains a significant token of the catalog title.
	TitleToken,
}

/// Finds the CDN entry for `video`, trying each rule in priority order.
///
/// Within a rule the first candidate in feed order wins.
pub fn find_match<'a>(
	video: &CatalogVideo,
	candidates: &'a [CdnVideo],
) -> Option<(&'a CdnVideo, MatchRule)> {
	if let Some(hit) = candidates.iter().find(|cdn| cdn.media_id == video.id) {
		return Some((hit, MatchRule::MediaId));
	}

	let title = video.title.trim().to_lowercase();

	if let Some(hit) = candidates.iter().find(|cdn| cdn.title.trim().to_lowercase() == title) {
		return Some((hit, MatchRule::ExactTitle));
	}

	let tokens = title
		.split(' ')
		.filter(|token| token.chars().count() > MIN_TOKEN_CHARS)
		.collect::<Vec<_>>();

	if tokens.is_empty() {
		return None;
	}

	candidates
		.iter()
		.find(|cdn| {
			let cdn_title = cdn.title.to_lowercase();

			tokens.iter().any(|token| cdn_title.contains(token))
		})
		.map(|hit| (hit, MatchRule::TitleToken))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn catalog(id: &str, title: &str) -> CatalogVideo {
		serde_json::from_value(serde_json::json!({
			"video_id": id,
			"season_id": 5,
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
	fn media_id_beats_titles() {
		let feed = [cdn("other", "Pilot"), cdn("v1", "Something else")];
		let (hit, rule) = find_match(&catalog("v1", "Pilot"), &feed).expect("Should match.");

		assert_eq!(hit.media_id, "v1");
		assert_eq!(rule, MatchRule::MediaId);
	}

	#[test]
	fn exact_titles_ignore_case_and_padding() {
		let feed = [cdn("a", "The Pilot Episode Extended"), cdn("b", "  the PILOT episode ")];
		let (hit, rule) =
			find_match(&catalog("v1", "The Pilot Episode"), &feed).expect("Should match.");

		assert_eq!(hit.media_id, "b");
		assert_eq!(rule, MatchRule::ExactTitle);
	}

	#[test]
	fn tokens_pick_the_first_candidate_in_feed_order() {
		let feed = [cdn("a", "Behind the scenes"), cdn("b", "Finale: Reunion"), cdn("c", "Reunion")];
		let (hit, rule) =
			find_match(&catalog("v1", "Big Reunion Night"), &feed).expect("Should match.");

		assert_eq!(hit.media_id, "b");
		assert_eq!(rule, MatchRule::TitleToken);
	}

	#[test]
	fn short_tokens_never_match() {
		let feed = [cdn("a", "The Big Day")];

		assert!(find_match(&catalog("v1", "the big day!"), &feed).is_none());
		assert!(find_match(&catalog("v1", "Big Day"), &feed).is_none());
		assert!(find_match(&catalog("v1", "Pilot"), &[]).is_none());
	}
}
