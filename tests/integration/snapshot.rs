use crate::{create_test_config, create_test_storage};
use chrono::{TimeZone, Utc};
use hubstats::crawler::{FetchClient, SnapshotProcessor};
use hubstats::state::SnapshotOutcome;
use hubstats::storage::{SharedStorage, Storage};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn processor(base_url: &str, storage: SharedStorage) -> SnapshotProcessor {
    let config = create_test_config(base_url);
    let client = FetchClient::new(&config.registry).unwrap();
    SnapshotProcessor::new(&config, client, storage)
}

#[tokio::test]
async fn test_successful_fetch_records_snapshot() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/repositories/library/redis/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "redis",
            "star_count": 12000,
            "pull_count": 1500000000,
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let storage = create_test_storage(&["library/redis"]);
    let processor = processor(&mock_server.uri(), storage.clone());
    let fetched_at = Utc.with_ymd_and_hms(2024, 1, 1, 15, 0, 0).unwrap();

    let outcome = processor.process_at("library/redis", fetched_at).await;

    let next_anchor = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    assert_eq!(
        outcome,
        SnapshotOutcome::Recorded {
            stars: 12000,
            pulls: 1_500_000_000,
            next_anchor,
        }
    );

    let storage = storage.lock().unwrap();
    let repository = storage.get_repository("library/redis").unwrap().unwrap();
    assert_eq!(repository.last_scrapped_at, next_anchor);

    let history = storage.list_snapshots(repository.id).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].fetched_at, fetched_at);
    assert_eq!(history[0].stars, 12000);

    // Excluded for the rest of the window, due again at the anchor
    let later_that_day = Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap();
    assert!(storage.list_due_slugs(later_that_day, 10).unwrap().is_empty());
    assert_eq!(
        storage.list_due_slugs(next_anchor, 10).unwrap(),
        vec!["library/redis"]
    );
}

#[tokio::test]
async fn test_error_status_is_sticky() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/repositories/library/gone/"))
        .respond_with(ResponseTemplate::new(404).set_body_string("object not found"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let storage = create_test_storage(&["library/gone"]);
    let processor = processor(&mock_server.uri(), storage.clone());
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 15, 0, 0).unwrap();

    let outcome = processor.process_at("library/gone", now).await;
    assert_eq!(outcome, SnapshotOutcome::Sticky { status_code: 404 });

    let storage = storage.lock().unwrap();
    let repository = storage.get_repository("library/gone").unwrap().unwrap();
    assert_eq!(repository.error_code, 404);
    assert_eq!(repository.error_at, now);
    assert_eq!(storage.count_snapshots().unwrap(), 0);

    let far_future = Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).unwrap();
    assert!(storage.list_due_slugs(far_future, 10).unwrap().is_empty());
}

#[tokio::test]
async fn test_server_error_after_retries_is_sticky() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/repositories/library/flaky/"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;

    let storage = create_test_storage(&["library/flaky"]);
    let processor = processor(&mock_server.uri(), storage.clone());

    let outcome = processor.process("library/flaky").await;

    assert_eq!(outcome, SnapshotOutcome::Sticky { status_code: 502 });
    assert_eq!(
        storage.lock().unwrap().count_healthy_repositories().unwrap(),
        0
    );
}

#[tokio::test]
async fn test_decode_failure_is_transient() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/repositories/library/redis/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&mock_server)
        .await;

    let storage = create_test_storage(&["library/redis"]);
    let processor = processor(&mock_server.uri(), storage.clone());
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 15, 0, 0).unwrap();

    let outcome = processor.process_at("library/redis", now).await;
    assert!(outcome.is_transient());

    let storage = storage.lock().unwrap();
    let repository = storage.get_repository("library/redis").unwrap().unwrap();
    assert!(repository.is_healthy());
    assert_eq!(storage.count_snapshots().unwrap(), 0);
    assert_eq!(storage.list_due_slugs(now, 10).unwrap(), vec!["library/redis"]);
}

#[tokio::test]
async fn test_missing_counters_record_zero() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/repositories/library/quiet/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "quiet" })))
        .mount(&mock_server)
        .await;

    let storage = create_test_storage(&["library/quiet"]);
    let processor = processor(&mock_server.uri(), storage.clone());
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 15, 0, 0).unwrap();

    let outcome = processor.process_at("library/quiet", now).await;
    assert_eq!(
        outcome,
        SnapshotOutcome::Recorded {
            stars: 0,
            pulls: 0,
            next_anchor: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        }
    );
}

#[tokio::test]
async fn test_anchor_overflow_is_transient() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/repositories/library/redis/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "star_count": 1,
            "pull_count": 2,
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let storage = create_test_storage(&["library/redis"]);
    let mut config = create_test_config(&mock_server.uri());
    config.scraper.snapshot_interval_days = u32::MAX;
    let client = FetchClient::new(&config.registry).unwrap();
    let processor = SnapshotProcessor::new(&config, client, storage.clone());
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 15, 0, 0).unwrap();

    let outcome = processor.process_at("library/redis", now).await;
    assert!(outcome.is_transient());

    let storage = storage.lock().unwrap();
    assert_eq!(storage.count_snapshots().unwrap(), 0);
    assert_eq!(storage.list_due_slugs(now, 10).unwrap(), vec!["library/redis"]);
}

#[tokio::test]
async fn test_unreachable_registry_is_transient() {
    let storage = create_test_storage(&["library/redis"]);
    let processor = processor("http://127.0.0.1:1", storage.clone());

    let outcome = processor.process("library/redis").await;

    assert!(outcome.is_transient());
    assert_eq!(
        storage.lock().unwrap().count_healthy_repositories().unwrap(),
        1
    );
}

#[tokio::test]
async fn test_unknown_repository_is_transient() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/repositories/library/stray/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "star_count": 1,
            "pull_count": 2,
        })))
        .mount(&mock_server)
        .await;

    let storage = create_test_storage(&[]);
    let processor = processor(&mock_server.uri(), storage.clone());

    let outcome = processor.process("library/stray").await;

    assert!(outcome.is_transient());
    let storage = storage.lock().unwrap();
    assert_eq!(storage.count_snapshots().unwrap(), 0);
    assert_eq!(storage.count_total_repositories().unwrap(), 0);
}
