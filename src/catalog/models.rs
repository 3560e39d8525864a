//! Wire models for the catalog API.
//!
//! Status flags travel as `0`/`1` (booleans and numeric strings are tolerated) and are exposed
//! as `bool`. Free-form fields that the API emits as either strings or numbers decode to
//! `Option<String>`.

// self
use crate::_prelude::*;

/// A catalog video.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogVideo {
	/// Video identifier, shared with the CDN's `mediaid` when both sides agree.
	#[serde(rename = "video_id")]
	pub id: String,
	/// Owning season.
	pub season_id: i64,
	/// Display title.
	pub title: String,
	/// Long-form description.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	/// Thumbnail URL.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub thumbnail: Option<String>,
	/// Duration as reported by the API (free-form).
	#[serde(default, with = "lenient_text", skip_serializing_if = "Option::is_none")]
	pub duration: Option<String>,
	/// Publication timestamp as sent by the API.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub published_at: Option<String>,
	/// Comma-separated tags.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tags: Option<String>,
	/// Total views.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub view_count: Option<u64>,
	/// Whether the video is published.
	#[serde(with = "flag", default = "flag::on")]
	pub active: bool,
}
impl CatalogVideo {
	/// Resource key used by `/videos/{season_id}/{video_id}`.
	pub fn key(&self) -> VideoKey {
		VideoKey::new(self.season_id, self.id.clone())
	}
}

/// Composite key for a video.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VideoKey {
	/// Owning season.
	pub season_id: i64,
	/// Video identifier.
	pub video_id: String,
}
impl VideoKey {
	/// Builds a key.
	pub fn new(season_id: i64, video_id: impl Into<String>) -> Self {
		Self { season_id, video_id: video_id.into() }
	}
}
impl Display for VideoKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}/{}", self.season_id, self.video_id)
	}
}

/// A season grouping videos.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Season {
	/// Numeric identifier.
	pub id: i64,
	/// Public season identifier.
	pub season_id: String,
	/// Display title.
	pub title: String,
	/// Long-form description.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	/// Thumbnail URL.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub thumbnail: Option<String>,
	/// Position within the series.
	pub season_number: i64,
	/// Publication timestamp as sent by the API.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub published_at: Option<String>,
	/// Whether the item is published.
	#[serde(with = "flag", default = "flag::on")]
	pub active: bool,
}

/// A catalog playlist pointing at a CDN playlist feed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
	/// Numeric identifier.
	pub id: i64,
	/// CDN playlist identifier.
	pub playlist_id: String,
	/// Owner key; catalog videos resolve their playlist through their `season_id`.
	pub segment_id: i64,
	/// Whether the item is published.
	#[serde(with = "flag", default = "flag::on")]
	pub active: bool,
	/// Display title.
	pub title: String,
	/// Long-form description.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	/// Thumbnail URL.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub thumbnail: Option<String>,
	/// Publication timestamp as sent by the API.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub published_at: Option<String>,
	/// Comma-separated tags.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tags: Option<String>,
}

/// A home-page segment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
	/// Numeric identifier.
	pub id: i64,
	/// Display name.
	pub name: String,
	/// Long-form description.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	/// Image URL.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub image: Option<String>,
	/// Whether the item is published.
	#[serde(with = "flag", default = "flag::on")]
	pub active: bool,
	/// Display position.
	#[serde(default)]
	pub order: i64,
}

/// A home-carousel slide.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HomeCarouselItem {
	/// Numeric identifier.
	pub id: i64,
	/// Display title.
	pub title: String,
	/// Long-form description.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	/// Image URL.
	pub image: String,
	/// Link target.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
	/// Whether the item is published.
	#[serde(with = "flag", default = "flag::on")]
	pub active: bool,
	/// Display position.
	#[serde(default)]
	pub order: i64,
}

/// Association from an owner key to a CDN playlist identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaylistLink {
	/// Owner key (the playlist's `segment_id`, matched against a video's `season_id`).
	pub owner_id: i64,
	/// CDN playlist identifier.
	pub playlist_id: String,
}
impl From<&Playlist> for PlaylistLink {
	fn from(playlist: &Playlist) -> Self {
		Self { owner_id: playlist.segment_id, playlist_id: playlist.playlist_id.clone() }
	}
}

/// `0`/`1` status flags exposed as `bool`.
pub mod flag {
	// crates.io
	use serde::{Deserializer, Serializer, de::Error as _};
	// self
	use crate::_prelude::*;

	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Wire {
		Bool(bool),
		Int(i64),
		Text(String),
	}

	/// Serializes as `0` or `1`.
	pub fn serialize<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_u8(u8::from(*value))
	}

	/// Accepts booleans, integers, and numeric strings.
	pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
	where
		D: Deserializer<'de>,
	{
		match Wire::deserialize(deserializer)? {
			Wire::Bool(value) => Ok(value),
			Wire::Int(value) => Ok(value != 0),
			Wire::Text(text) => match text.trim() {
				"1" | "true" => Ok(true),
				"0" | "false" | "" => Ok(false),
				other => Err(D::Error::custom(format!("invalid status flag `{other}`"))),
			},
		}
	}

	/// Default for omitted flags.
	pub fn on() -> bool {
		true
	}
}

mod lenient_text {
	// crates.io
	use serde::{Deserializer, Serializer};
	// self
	use crate::_prelude::*;

	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Wire {
		Text(String),
		Number(serde_json::Number),
	}

	pub fn serialize<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		value.serialize(serializer)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
	where
		D: Deserializer<'de>,
	{
		Ok(Option::<Wire>::deserialize(deserializer)?.map(|wire| match wire {
			Wire::Text(text) => text,
			Wire::Number(number) => number.to_string(),
		}))
	}
}
