//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the token endpoint and the
//! catalog API and run the full crawl cycle end-to-end.

use catalog_ripple::config::{Config, CrawlerConfig};
use catalog_ripple::crawler::{
    crawl, AccessToken, CatalogApi, Coordinator, Credentials, RateLimitedFetcher,
};
use catalog_ripple::output::{read_snapshot, JsonSnapshotSink, ResultSink};
use catalog_ripple::storage::{CatalogStore, SqliteSink, Storage};
use catalog_ripple::Provenance;
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Crawler settings without backoff, jitter or pauses
fn fast_crawler_config() -> CrawlerConfig {
    CrawlerConfig {
        max_retries: 2,
        backoff_scale_ms: 0,
        jitter_min_ms: 0,
        jitter_max_ms: 0,
        artist_pause_min_ms: 0,
        artist_pause_max_ms: 0,
        album_pause_min_ms: 0,
        album_pause_max_ms: 0,
        ..CrawlerConfig::default()
    }
}

fn create_test_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.api.base_url = server.uri();
    config.api.token_url = format!("{}/api/token", server.uri());
    config.api.search_terms = vec!["pop".to_string()];
    config.crawler = fast_crawler_config();
    config
}

fn api_for(server: &MockServer, config: &CrawlerConfig) -> CatalogApi {
    let fetcher = RateLimitedFetcher::from_config(config).unwrap();
    let headers = AccessToken::new("test-token").auth_headers().unwrap();
    CatalogApi::new(fetcher, &server.uri(), headers, config.album_page_size)
}

async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn artist_json(id: &str, popularity: u32) -> serde_json::Value {
    json!({
        "id": id,
        "name": format!("Artist {}", id),
        "genres": ["pop"],
        "popularity": popularity
    })
}

fn album_json(id: &str, artist_id: &str, track_ids: &[&str]) -> serde_json::Value {
    let items: Vec<_> = track_ids.iter().map(|t| json!({ "id": t })).collect();
    json!({
        "id": id,
        "name": format!("Album {}", id),
        "release_date": "2021-05-14",
        "total_tracks": track_ids.len(),
        "popularity": 70,
        "artists": [{ "id": artist_id, "name": format!("Artist {}", artist_id) }],
        "tracks": { "items": items }
    })
}

fn track_json(id: &str, artist_id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": format!("Track {}", id),
        "artists": [{ "id": artist_id, "name": format!("Artist {}", artist_id) }],
        "duration_ms": 201000,
        "explicit": false,
        "popularity": 55
    })
}

async fn mount_slow_json(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(body)
                .set_delay(Duration::from_millis(25)),
        )
        .mount(server)
        .await;
}

/// One popular artist with one album of two tracks, one unpopular artist
async fn mount_small_catalog(server: &MockServer) {
    mount_json(server, "/artists/A1", artist_json("A1", 85)).await;
    mount_json(server, "/artists/A2", artist_json("A2", 70)).await;
    mount_json(server, "/artists/A1/albums", json!({ "items": [{ "id": "L1" }] })).await;
    mount_json(server, "/albums/L1", album_json("L1", "A1", &["T1", "T2"])).await;
    mount_json(server, "/tracks/T1", track_json("T1", "A1")).await;
    mount_json(server, "/tracks/T2", track_json("T2", "A1")).await;
}

#[tokio::test]
async fn test_full_crawl_with_token_and_search() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "abc123",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "pop"))
        .and(query_param("type", "artist"))
        .and(header("authorization", "Bearer abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "artists": { "items": [
                artist_json("A1", 85),
                artist_json("A2", 70),
                { "id": "", "name": "", "popularity": 95 }
            ] }
        })))
        .mount(&server)
        .await;

    mount_small_catalog(&server).await;

    let config = create_test_config(&server);
    let report = crawl(&config, &Credentials::new("id", "secret"))
        .await
        .expect("Crawl failed");

    let output = &report.output;
    assert_eq!(output.artists.len(), 1);
    assert_eq!(output.artists[0].id, "A1");

    assert_eq!(output.albums.len(), 1);
    let track_ids: Vec<&str> = output.albums[0].tracks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(track_ids, vec!["T1", "T2"]);

    assert_eq!(output.tracks.len(), 2);
    for track in &output.tracks {
        assert_eq!(track.album.id, "L1");
        assert_eq!(track.album.name, "Album L1");
    }

    // A2 was below the threshold at search time and the blank hit was skipped
    assert_eq!(report.summary.seeds, 1);
    assert_eq!(report.summary.artists_crawled, 1);
}

#[tokio::test]
async fn test_seed_below_threshold_is_filtered() {
    let server = MockServer::start().await;
    mount_small_catalog(&server).await;

    let config = fast_crawler_config();
    let report = Coordinator::new(
        api_for(&server, &config),
        Provenance::now(&Default::default()),
        &config,
    )
    .run(vec!["A1".to_string(), "A2".to_string()])
    .await;

    assert_eq!(report.output.artists.len(), 1);
    assert_eq!(report.summary.artists_filtered, 1);
    assert_eq!(report.summary.artists_crawled, 1);
}

#[tokio::test]
async fn test_duplicate_album_ids_fetched_once() {
    let server = MockServer::start().await;

    mount_json(&server, "/artists/A1", artist_json("A1", 90)).await;
    mount_json(
        &server,
        "/artists/A1/albums",
        json!({ "items": [{ "id": "L1" }, { "id": "L1" }] }),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/albums/L1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(album_json("L1", "A1", &["T1"])))
        .expect(1)
        .mount(&server)
        .await;
    mount_json(&server, "/tracks/T1", track_json("T1", "A1")).await;

    let config = fast_crawler_config();
    let report = Coordinator::new(
        api_for(&server, &config),
        Provenance::now(&Default::default()),
        &config,
    )
    .run(vec!["A1".to_string()])
    .await;

    assert_eq!(report.output.albums.len(), 1);
    assert_eq!(report.output.tracks.len(), 1);
}

#[tokio::test]
async fn test_failed_track_is_left_out_of_album_summaries() {
    let server = MockServer::start().await;

    mount_json(&server, "/artists/A1", artist_json("A1", 90)).await;
    mount_json(&server, "/artists/A1/albums", json!({ "items": [{ "id": "L1" }] })).await;
    mount_json(&server, "/albums/L1", album_json("L1", "A1", &["T1", "T2", "T3"])).await;
    mount_json(&server, "/tracks/T1", track_json("T1", "A1")).await;
    Mock::given(method("GET"))
        .and(path("/tracks/T2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_json(&server, "/tracks/T3", track_json("T3", "A1")).await;

    let config = fast_crawler_config();
    let report = Coordinator::new(
        api_for(&server, &config),
        Provenance::now(&Default::default()),
        &config,
    )
    .run(vec!["A1".to_string()])
    .await;

    let album = &report.output.albums[0];
    assert_eq!(album.total_tracks, 3);
    let ids: Vec<&str> = album.tracks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["T1", "T3"]);
    assert_eq!(report.output.tracks.len(), 2);
}

#[tokio::test]
async fn test_missing_artist_yields_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/artists/GONE"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let config = fast_crawler_config();
    let report = Coordinator::new(
        api_for(&server, &config),
        Provenance::now(&Default::default()),
        &config,
    )
    .run(vec!["GONE".to_string()])
    .await;

    assert!(report.output.artists.is_empty());
    assert_eq!(report.summary.artists_missing, 1);
}

#[tokio::test]
async fn test_malformed_artist_fails_only_that_task() {
    let server = MockServer::start().await;
    mount_small_catalog(&server).await;

    // Valid JSON but without a name: decode error inside the task
    mount_json(&server, "/artists/BAD", json!({ "id": "BAD" })).await;

    let config = fast_crawler_config();
    let report = Coordinator::new(
        api_for(&server, &config),
        Provenance::now(&Default::default()),
        &config,
    )
    .run(vec!["BAD".to_string(), "A1".to_string()])
    .await;

    assert_eq!(report.summary.artist_failures, 1);
    assert_eq!(report.output.artists.len(), 1);
    assert_eq!(report.output.tracks.len(), 2);
}

#[tokio::test]
async fn test_blank_artist_name_is_never_emitted() {
    let server = MockServer::start().await;
    mount_small_catalog(&server).await;
    mount_json(&server, "/artists/BLANK", json!({ "id": "BLANK", "name": "", "popularity": 99 })).await;

    let config = fast_crawler_config();
    let report = Coordinator::new(
        api_for(&server, &config),
        Provenance::now(&Default::default()),
        &config,
    )
    .run(vec!["BLANK".to_string(), "A1".to_string()])
    .await;

    assert_eq!(report.summary.artist_failures, 1);
    let ids: Vec<&str> = report.output.artists.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["A1"]);
    assert!(report.output.artists.iter().all(|a| !a.name.is_empty()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_artists_stay_under_request_cap() {
    let server = MockServer::start().await;

    let seeds: Vec<String> = (0..20).map(|i| format!("A{}", i)).collect();
    for artist in &seeds {
        let album = format!("L{}", artist);
        let tracks = [format!("T{}a", artist), format!("T{}b", artist)];

        mount_slow_json(&server, &format!("/artists/{}", artist), artist_json(artist, 90)).await;
        mount_slow_json(
            &server,
            &format!("/artists/{}/albums", artist),
            json!({ "items": [{ "id": album }] }),
        )
        .await;
        mount_slow_json(
            &server,
            &format!("/albums/{}", album),
            album_json(&album, artist, &[tracks[0].as_str(), tracks[1].as_str()]),
        )
        .await;
        for track in &tracks {
            mount_slow_json(&server, &format!("/tracks/{}", track), track_json(track, artist)).await;
        }
    }

    let config = CrawlerConfig {
        max_concurrent_requests: 4,
        ..fast_crawler_config()
    };
    let report = Coordinator::new(
        api_for(&server, &config),
        Provenance::now(&Default::default()),
        &config,
    )
    .run(seeds)
    .await;

    assert_eq!(report.summary.artists_crawled, 20);
    assert_eq!(report.output.tracks.len(), 40);
    // artist, album page, album and two tracks per seed
    assert_eq!(report.summary.requests, 100);
    assert!(report.summary.peak_in_flight <= 4);
    assert!(report.summary.peak_in_flight >= 2);
}

#[tokio::test]
async fn test_records_share_one_provenance() {
    let server = MockServer::start().await;
    mount_small_catalog(&server).await;

    let config = fast_crawler_config();
    let report = Coordinator::new(
        api_for(&server, &config),
        Provenance::now(&Default::default()),
        &config,
    )
    .run(vec!["A1".to_string()])
    .await;

    let stamp = &report.output.artists[0].provenance.extraction_datetime;
    assert!(report
        .output
        .albums
        .iter()
        .all(|a| &a.provenance.extraction_datetime == stamp));
    assert!(report
        .output
        .tracks
        .iter()
        .all(|t| &t.provenance.extraction_datetime == stamp));
}

#[tokio::test]
async fn test_crawl_output_reaches_both_sinks() {
    let server = MockServer::start().await;
    mount_small_catalog(&server).await;

    let config = fast_crawler_config();
    let report = Coordinator::new(
        api_for(&server, &config),
        Provenance::now(&Default::default()),
        &config,
    )
    .run(vec!["A1".to_string()])
    .await;

    let dir = TempDir::new().unwrap();
    JsonSnapshotSink::new(dir.path())
        .consume(&report.output)
        .unwrap();

    let tracks: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("tracks.json")).unwrap())
            .unwrap();
    let first = &tracks[0];
    assert_eq!(first["artist"][0]["id"], "A1");
    assert_eq!(first["album"]["id"], "L1");
    assert_eq!(first["source"], "Spotify API v1");
    assert!(first["extraction_datetime"].is_string());

    let snapshot = read_snapshot(dir.path()).unwrap();
    let store = CatalogStore::open(&dir.path().join("catalog.db"), "main").unwrap();
    let mut sink = SqliteSink::new(store, "hash");
    sink.consume(&snapshot).unwrap();

    assert_eq!(sink.storage().count_rows("artists").unwrap(), 1);
    assert_eq!(sink.storage().count_rows("albums").unwrap(), 1);
    assert_eq!(sink.storage().count_rows("tracks").unwrap(), 2);
}

#[tokio::test]
async fn test_failed_search_aborts_run() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "abc123"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = create_test_config(&server);
    let result = crawl(&config, &Credentials::new("id", "secret")).await;

    assert!(matches!(
        result,
        Err(catalog_ripple::CatalogError::SeedDiscovery { .. })
    ));
}

#[tokio::test]
async fn test_rejected_credentials_abort_run() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
        .mount(&server)
        .await;

    let config = create_test_config(&server);
    let result = crawl(&config, &Credentials::new("id", "wrong")).await;

    assert!(matches!(result, Err(catalog_ripple::CatalogError::Auth(_))));
}
