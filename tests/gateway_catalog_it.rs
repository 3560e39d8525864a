#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use catalog_broker::{
	_preludet::*,
	auth::{Credential, CredentialKind},
	catalog::{CatalogClient, ListFilter, VideoKey},
	config::{BrokerConfig, FirstPartyConfig},
	http::HttpMethod,
	store::TokenStore,
};

fn config(server: &MockServer) -> BrokerConfig {
	BrokerConfig::builder(test_url(&server.url("/api")))
		.first_party(FirstPartyConfig::new("gateway-secret"))
		.build()
		.expect("Broker configuration should build for gateway tests.")
}

fn seeded(value: &str) -> Credential {
	Credential::builder(CredentialKind::Primary)
		.value(value)
		.expires_in(Duration::hours(1))
		.build()
		.expect("Seeded credential fixture should build.")
}

#[tokio::test]
async fn rejected_credentials_are_refreshed_once_and_retried() {
	let server = MockServer::start_async().await;
	let (gateway, broker, store) = build_reqwest_test_gateway(config(&server));

	store.set(seeded("old")).await.expect("Seeding the store should succeed.");

	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/client-credentials");
			then.status(200).json_body(json!({ "access_token": "fresh", "expires_in": 3600 }));
		})
		.await;
	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/videos").header("authorization", "Bearer old");
			then.status(401).body("expired");
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/videos").header("authorization", "Bearer fresh");
			then.status(200).json_body(json!([]));
		})
		.await;
	let response = gateway
		.request(HttpMethod::Get, "videos", None)
		.await
		.expect("The retried request should succeed.");

	assert_eq!(response.status, 200);
	assert_eq!(broker.metrics().refreshes(), 1);
	assert_eq!(store.snapshot().map(|credential| credential.value.expose().to_owned()), Some(
		"fresh".to_owned()
	));

	token.assert_calls_async(1).await;
	rejected.assert_calls_async(1).await;
	accepted.assert_calls_async(1).await;
}

#[tokio::test]
async fn a_second_rejection_surfaces_as_unauthorized() {
	let server = MockServer::start_async().await;
	let (gateway, broker, store) = build_reqwest_test_gateway(config(&server));

	store.set(seeded("old")).await.expect("Seeding the store should succeed.");

	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/client-credentials");
			then.status(200).json_body(json!({ "access_token": "fresh", "expires_in": 3600 }));
		})
		.await;
	let videos = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/videos");
			then.status(401).body("nope");
		})
		.await;
	let err = gateway
		.request(HttpMethod::Get, "videos", None)
		.await
		.expect_err("A second 401 should not be retried.");

	assert!(matches!(err, Error::Unauthorized { status: 401, ref body } if body == "nope"));
	assert_eq!(broker.metrics().refreshes(), 1);

	token.assert_calls_async(1).await;
	videos.assert_calls_async(2).await;
}

#[tokio::test]
async fn server_errors_are_typed_and_not_retried() {
	let server = MockServer::start_async().await;
	let (gateway, broker, store) = build_reqwest_test_gateway(config(&server));

	store.set(seeded("valid")).await.expect("Seeding the store should succeed.");

	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/seasons");
			then.status(503).body("maintenance");
		})
		.await;
	let err = CatalogClient::new(gateway)
		.seasons()
		.list(None)
		.await
		.expect_err("A 503 should surface.");

	assert!(matches!(err, Error::Api { status: 503, .. }));
	assert_eq!(broker.metrics().refreshes(), 0);

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn catalog_crud_hits_resource_paths() {
	let server = MockServer::start_async().await;
	let (gateway, _broker, store) = build_reqwest_test_gateway(config(&server));

	store.set(seeded("crud")).await.expect("Seeding the store should succeed.");

	let list = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/videos")
				.query_param("active", "1")
				.header("authorization", "Bearer crud");
			then.status(200).json_body(json!([
				{ "video_id": "v1", "season_id": 5, "title": "Pilot", "active": 1 },
				{ "video_id": "v2", "season_id": 5, "title": "Finale", "active": "1" },
			]));
		})
		.await;
	let get = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/videos/5/v1");
			then.status(200)
				.json_body(json!({ "video_id": "v1", "season_id": 5, "title": "Pilot", "active": 1 }));
		})
		.await;
	let update = server
		.mock_async(|when, then| {
			when.method(PUT).path("/api/videos/5/v1").json_body(json!({ "title": "Pilot (HD)" }));
			then.status(200).json_body(
				json!({ "video_id": "v1", "season_id": 5, "title": "Pilot (HD)", "active": 1 }),
			);
		})
		.await;
	let delete = server
		.mock_async(|when, then| {
			when.method(DELETE).path("/api/videos/5/v2");
			then.status(204);
		})
		.await;
	let catalog = CatalogClient::new(gateway);
	let videos = catalog
		.videos()
		.list(Some(ListFilter::active()))
		.await
		.expect("Video listing should succeed.");

	assert_eq!(videos.len(), 2);
	assert!(videos.iter().all(|video| video.active));

	let pilot =
		catalog.videos().get(videos[0].key()).await.expect("Fetching one video should succeed.");
	let updated = catalog
		.videos()
		.update(pilot.key(), &json!({ "title": "Pilot (HD)" }))
		.await
		.expect("Updating a video should succeed.");

	assert_eq!(updated.title, "Pilot (HD)");

	catalog
		.videos()
		.delete(VideoKey::new(5, "v2"))
		.await
		.expect("Deleting a video should succeed.");

	list.assert_calls_async(1).await;
	get.assert_calls_async(1).await;
	update.assert_calls_async(1).await;
	delete.assert_calls_async(1).await;
}

#[tokio::test]
async fn playlist_helpers_and_links() {
	let server = MockServer::start_async().await;
	let (gateway, _broker, store) = build_reqwest_test_gateway(config(&server));

	store.set(seeded("links")).await.expect("Seeding the store should succeed.");

	let search = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/playlists/search")
				.query_param("q", "news")
				.query_param("active", "1")
				.query_param("limit", "5");
			then.status(200).json_body(json!([
				{ "id": 1, "playlist_id": "pl-news", "segment_id": 7, "title": "News" },
			]));
		})
		.await;
	let by_segment = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/playlists/by-segment/7").query_param("active", "0");
			then.status(200).body("null");
		})
		.await;
	let all = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/playlists");
			then.status(200).json_body(json!([
				{ "id": 1, "playlist_id": "pl-a", "segment_id": 5, "title": "A" },
				{ "id": 2, "playlist_id": "pl-b", "segment_id": 5, "title": "B" },
				{ "id": 3, "playlist_id": "pl-c", "segment_id": 6, "title": "C", "active": 0 },
			]));
		})
		.await;
	let catalog = CatalogClient::new(gateway);
	let found = catalog
		.playlists()
		.search("news", true, 5)
		.await
		.expect("Playlist search should succeed.");

	assert_eq!(found[0].playlist_id, "pl-news");
	assert!(
		catalog
			.playlists()
			.by_segment(7, false)
			.await
			.expect("A null body should decode as empty.")
			.is_empty()
	);

	let links = catalog.playlist_links().await.expect("Playlist links should resolve.");

	assert_eq!(links.get(&5).map(String::as_str), Some("pl-b"));
	assert_eq!(links.get(&6).map(String::as_str), Some("pl-c"));

	search.assert_calls_async(1).await;
	by_segment.assert_calls_async(1).await;
	all.assert_calls_async(1).await;
}

#[tokio::test]
async fn health_checks_are_anonymous() {
	let server = MockServer::start_async().await;
	let (gateway, broker, _store) = build_reqwest_test_gateway(config(&server));
	let health = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/health");
			then.status(200).body("ok");
		})
		.await;
	let token = server
		.mock_async(|when, _| {
			when.path("/api/auth/client-credentials");
		})
		.await;

	assert!(CatalogClient::new(gateway).health().await);
	assert!(broker.current().await.expect("Reading the store should succeed.").is_none());

	health.assert_calls_async(1).await;
	token.assert_calls_async(0).await;
}
