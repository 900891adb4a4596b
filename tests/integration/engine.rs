use crate::{create_test_config, create_test_storage};
use hubstats::config::load_config;
use hubstats::storage::{DiscoverySource, Storage};
use hubstats::Engine;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_full_run_discovers_and_snapshots() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "next": "",
            "summaries": [{ "slug": "redis" }, { "slug": "bitnami/nginx" }],
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/v2/repositories/[^/]+/[^/]+/$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "star_count": 7,
            "pull_count": 700,
        })))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let engine = Arc::new(Engine::with_storage(config, create_test_storage(&[])).unwrap());
    let cancel = CancellationToken::new();

    let runner = {
        let engine = Arc::clone(&engine);
        let cancel = cancel.clone();
        tokio::spawn(async move { engine.run(cancel).await })
    };

    let waited = tokio::time::timeout(Duration::from_secs(10), async {
        while engine.stats().total_snapshots < 2 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "snapshots were not recorded in time");

    cancel.cancel();
    runner.await.unwrap().unwrap();

    let stats = engine.stats();
    assert_eq!(stats.total_repositories, 2);
    assert_eq!(stats.repositories_without_errors, 2);
    assert_eq!(stats.total_snapshots, 2);
    // Both repositories are scheduled for the next day
    assert_eq!(stats.due_repositories, 0);
    assert!(stats.discoveries_completed >= 1);
    assert!(stats.snapshots_completed >= 2);
    assert_eq!(stats.queue_length, 0);

    let history = engine.find_snapshots("redis").unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].pulls, 700);

    let mut slugs = engine.list_repository_slugs().unwrap();
    slugs.sort();
    assert_eq!(slugs, vec!["bitnami/nginx", "library/redis"]);
}

#[tokio::test]
async fn test_run_returns_after_cancel() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "next": "" })))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let engine = Engine::with_storage(config, create_test_storage(&[])).unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), engine.run(cancel)).await;

    assert!(result.is_ok(), "engine did not stop after cancellation");
    assert!(result.unwrap().is_ok());
}

#[tokio::test]
async fn test_history_lookup_of_unknown_repository() {
    let config = create_test_config("http://127.0.0.1:1");
    let engine = Engine::with_storage(config, create_test_storage(&["library/redis"])).unwrap();

    let history = engine.find_snapshots("library/nonexistent").unwrap();
    assert!(history.is_empty());

    let storage = engine.storage().lock().unwrap();
    assert_eq!(storage.count_total_repositories().unwrap(), 2);
    let repository = storage
        .get_repository("library/nonexistent")
        .unwrap()
        .unwrap();
    assert_eq!(repository.source, DiscoverySource::Search);
    assert!(repository.is_healthy());
}

#[test]
fn test_engine_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("hubstats.db");

    let mut config_file = tempfile::NamedTempFile::new().unwrap();
    write!(
        config_file,
        r#"
[scraper]
task-count = 4
snapshot-interval-days = 2

[storage]
database-path = "{}"
"#,
        db_path.display()
    )
    .unwrap();
    config_file.flush().unwrap();

    let config = load_config(config_file.path()).unwrap();
    assert_eq!(config.scraper.task_count, 4);
    assert_eq!(config.discovery.page_size, 500);

    let engine = Engine::new(config).unwrap();
    assert!(db_path.exists());
    assert_eq!(engine.stats().refresh_interval, "2 days");
    assert!(engine.find_snapshots("redis").unwrap().is_empty());
    drop(engine);

    // Reopening keeps the catalog
    let config = load_config(config_file.path()).unwrap();
    let engine = Engine::new(config).unwrap();
    assert_eq!(engine.stats().total_repositories, 1);
}
