//! Typed accessors for the catalog API.
//!
//! Every call goes through [`AuthenticatedGateway`]; the client adds nothing beyond paths and
//! JSON shape mapping.

pub mod models;

pub use models::*;

// std
use std::marker::PhantomData;
// crates.io
use url::form_urlencoded::Serializer as QuerySerializer;
// self
use crate::{
	_prelude::*,
	config,
	gateway::AuthenticatedGateway,
	http::{HttpMethod, HttpResponse},
};

/// A catalog collection reachable under `/{PATH}`.
pub trait Resource
where
	Self: 'static + Send + Sync + Serialize + DeserializeOwned,
{
	/// Collection path without slashes.
	const PATH: &'static str;
}
impl Resource for CatalogVideo {
	const PATH: &'static str = "videos";
}
impl Resource for Season {
	const PATH: &'static str = "seasons";
}
impl Resource for Playlist {
	const PATH: &'static str = "playlists";
}
impl Resource for Segment {
	const PATH: &'static str = "segments";
}

/// Identifier addressing one catalog item.
///
/// Each segment is percent-encoded on its own, so a `/` or `?` inside an id never changes the
/// request path.
pub trait ResourceKey {
	/// Raw path segments, outermost first.
	fn segments(&self) -> Vec<String>;
}
impl ResourceKey for VideoKey {
	fn segments(&self) -> Vec<String> {
		vec![self.season_id.to_string(), self.video_id.clone()]
	}
}
impl ResourceKey for i64 {
	fn segments(&self) -> Vec<String> {
		vec![self.to_string()]
	}
}
impl ResourceKey for str {
	fn segments(&self) -> Vec<String> {
		vec![self.to_owned()]
	}
}
impl ResourceKey for String {
	fn segments(&self) -> Vec<String> {
		vec![self.clone()]
	}
}
impl<K> ResourceKey for &K
where
	K: ?Sized + ResourceKey,
{
	fn segments(&self) -> Vec<String> {
		(**self).segments()
	}
}
impl Resource for HomeCarouselItem {
	const PATH: &'static str = "home-carousel";
}

/// Optional list filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListFilter {
	/// Restrict to active (`true`) or inactive (`false`) items.
	pub active: Option<bool>,
}
impl ListFilter {
	/// Only active items.
	pub const fn active() -> Self {
		Self { active: Some(true) }
	}

	/// Only inactive items.
	pub const fn inactive() -> Self {
		Self { active: Some(false) }
	}

	fn query(&self) -> Option<String> {
		let active = flag_value(self.active?);

		Some(QuerySerializer::new(String::new()).append_pair("active", active).finish())
	}
}

/// Entry point for catalog resources.
#[derive(Clone, Debug)]
pub struct CatalogClient {
	gateway: AuthenticatedGateway,
}
impl CatalogClient {
	/// Creates a client on top of `gateway`.
	pub fn new(gateway: AuthenticatedGateway) -> Self {
		Self { gateway }
	}

	/// Gateway used for every call.
	pub fn gateway(&self) -> &AuthenticatedGateway {
		&self.gateway
	}

	/// `/videos`, keyed by [`VideoKey`].
	pub fn videos(&self) -> ResourceClient<CatalogVideo> {
		ResourceClient::new(self.gateway.clone())
	}

	/// `/seasons`.
	pub fn seasons(&self) -> ResourceClient<Season> {
		ResourceClient::new(self.gateway.clone())
	}

	/// `/playlists`, plus search helpers.
	pub fn playlists(&self) -> ResourceClient<Playlist> {
		ResourceClient::new(self.gateway.clone())
	}

	/// `/segments`.
	pub fn segments(&self) -> ResourceClient<Segment> {
		ResourceClient::new(self.gateway.clone())
	}

	/// `/home-carousel`.
	pub fn home_carousel(&self) -> ResourceClient<HomeCarouselItem> {
		ResourceClient::new(self.gateway.clone())
	}

	/// Derives playlist links from every listed playlist.
	///
	/// When several playlists share an owner key, the last one listed wins.
	pub async fn playlist_links(&self) -> Result<HashMap<i64, String>> {
		let playlists = self.playlists().list(None).await?;

		Ok(playlists
			.iter()
			.map(PlaylistLink::from)
			.map(|link| (link.owner_id, link.playlist_id))
			.collect())
	}

	/// Unauthenticated `GET /health`; `false` on any failure.
	pub async fn health(&self) -> bool {
		self.gateway
			.request_anonymous(HttpMethod::Get, "health")
			.await
			.is_ok_and(|response| response.is_success())
	}
}

/// CRUD accessor for one catalog collection.
pub struct ResourceClient<R> {
	gateway: AuthenticatedGateway,
	_resource: PhantomData<fn() -> R>,
}
impl<R> ResourceClient<R>
where
	R: Resource,
{
	fn new(gateway: AuthenticatedGateway) -> Self {
		Self { gateway, _resource: PhantomData }
	}

	/// Lists the collection; an empty or `null` body yields an empty vector.
	pub async fn list(&self, filter: Option<ListFilter>) -> Result<Vec<R>> {
		let path = match filter.and_then(|filter| filter.query()) {
			Some(query) => format!("{}?{query}", R::PATH),
			None => R::PATH.to_owned(),
		};

		self.fetch_list(&path).await
	}

	/// Fetches one item.
	pub async fn get(&self, key: impl ResourceKey) -> Result<R> {
		let response = self.gateway.request(HttpMethod::Get, &Self::item_path(key)?, None).await?;

		Ok(response.json()?)
	}

	/// Creates an item and returns the stored representation.
	pub async fn create<B>(&self, item: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
	{
		let response = self.gateway.send(HttpMethod::Post, R::PATH, Some(item)).await?;

		Ok(response.json()?)
	}

	/// Updates an item with a full or partial payload and returns the stored representation.
	pub async fn update<B>(&self, key: impl ResourceKey, patch: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
	{
		let response =
			self.gateway.send(HttpMethod::Put, &Self::item_path(key)?, Some(patch)).await?;

		Ok(response.json()?)
	}

	/// Deletes an item.
	pub async fn delete(&self, key: impl ResourceKey) -> Result<()> {
		self.gateway.request(HttpMethod::Delete, &Self::item_path(key)?, None).await?;

		Ok(())
	}

	fn item_path(key: impl ResourceKey) -> Result<String> {
		let mut path = R::PATH.to_owned();

		for segment in key.segments() {
			path.push('/');
			path.push_str(&config::encode_segment(&segment)?);
		}

		Ok(path)
	}

	async fn fetch_list(&self, path: &str) -> Result<Vec<R>> {
		let response = self.gateway.request(HttpMethod::Get, path, None).await?;

		decode_list(&response)
	}
}
impl ResourceClient<Playlist> {
	/// `GET /playlists/search?q=&active=&limit=`.
	pub async fn search(&self, query: &str, active: bool, limit: u32) -> Result<Vec<Playlist>> {
		let query = QuerySerializer::new(String::new())
			.append_pair("q", query)
			.append_pair("active", flag_value(active))
			.append_pair("limit", &limit.to_string())
			.finish();

		self.fetch_list(&format!("{}/search?{query}", Playlist::PATH)).await
	}

	/// `GET /playlists/by-segment/{segment_id}?active=`.
	pub async fn by_segment(&self, segment_id: i64, active: bool) -> Result<Vec<Playlist>> {
		let query =
			QuerySerializer::new(String::new()).append_pair("active", flag_value(active)).finish();

		self.fetch_list(&format!("{}/by-segment/{segment_id}?{query}", Playlist::PATH)).await
	}
}
impl<R> Clone for ResourceClient<R> {
	fn clone(&self) -> Self {
		Self { gateway: self.gateway.clone(), _resource: PhantomData }
	}
}
impl<R> Debug for ResourceClient<R>
where
	R: Resource,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ResourceClient").field("path", &R::PATH).finish()
	}
}

fn flag_value(active: bool) -> &'static str {
	if active { "1" } else { "0" }
}

fn decode_list<R>(response: &HttpResponse) -> Result<Vec<R>>
where
	R: DeserializeOwned,
{
	if response.is_empty() {
		return Ok(Vec::new());
	}

	Ok(response.json::<Option<Vec<R>>>()?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::ConfigError;

	#[test]
	fn list_filters_encode_flags() {
		assert_eq!(ListFilter::active().query().as_deref(), Some("active=1"));
		assert_eq!(ListFilter::inactive().query().as_deref(), Some("active=0"));
		assert_eq!(ListFilter::default().query(), None);
	}

	#[test]
	fn item_keys_are_encoded_per_segment() {
		let path = ResourceClient::<CatalogVideo>::item_path(VideoKey::new(5, "a/b c"))
			.expect("Video keys should encode.");

		assert_eq!(path, "videos/5/a%2Fb%20c");
		assert_eq!(
			ResourceClient::<Playlist>::item_path("pl?x#1").expect("Playlist ids should encode."),
			"playlists/pl%3Fx%231"
		);
		assert_eq!(
			ResourceClient::<Season>::item_path(&7_i64).expect("Numeric ids should encode."),
			"seasons/7"
		);
		assert!(matches!(
			ResourceClient::<Segment>::item_path(".."),
			Err(Error::Config(ConfigError::InvalidSegment { .. }))
		));
	}

	#[test]
	fn list_bodies_tolerate_empty_payloads() {
		let empty = decode_list::<Segment>(&HttpResponse::new(200, ""))
			.expect("Empty bodies should decode.");
		let null = decode_list::<Segment>(&HttpResponse::new(200, "null"))
			.expect("Null bodies should decode.");

		assert!(empty.is_empty());
		assert!(null.is_empty());

		let err = decode_list::<Segment>(&HttpResponse::new(200, r#"[{"id":"x"}]"#))
			.expect_err("Malformed items should fail.");

		assert!(matches!(err, Error::Decode { .. }));
	}
}
