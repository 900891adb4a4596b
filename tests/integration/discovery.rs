use crate::{create_test_config, create_test_storage};
use hubstats::crawler::{DiscoveryCrawler, FetchClient};
use hubstats::state::ProcessCounters;
use hubstats::storage::{DiscoverySource, Storage};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn page(next: &str, slugs: &[&str]) -> ResponseTemplate {
    let summaries: Vec<_> = slugs.iter().map(|slug| json!({ "slug": slug })).collect();
    ResponseTemplate::new(200).set_body_json(json!({
        "next": next,
        "previous": "",
        "count": 5,
        "summaries": summaries,
    }))
}

#[tokio::test]
async fn test_pagination_fetches_each_page_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", ""))
        .and(header("Search-Version", "v3"))
        .respond_with(page(&format!("{}/search/page2", base_url), &["redis", "nginx"]))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search/page2"))
        .and(header("Search-Version", "v3"))
        .respond_with(page(&format!("{}/search/page3", base_url), &["bitnami/redis", "redis"]))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search/page3"))
        .and(header("Search-Version", "v3"))
        .respond_with(page("", &["grafana/grafana"]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url);
    let storage = create_test_storage(&[]);
    let counters = Arc::new(ProcessCounters::new());
    let crawler = DiscoveryCrawler::new(
        &config,
        FetchClient::new(&config.registry).unwrap(),
        storage.clone(),
        counters.clone(),
    )
    .unwrap();

    let seed = crawler.seeds()[0].clone();
    let pages = crawler
        .crawl_seed(&seed, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(pages, 3);
    assert_eq!(counters.discoveries_completed(), 3);

    let storage = storage.lock().unwrap();
    assert_eq!(storage.count_total_repositories().unwrap(), 4);
    let redis = storage.get_repository("library/redis").unwrap().unwrap();
    assert_eq!(redis.source, DiscoverySource::Discovery);
    assert!(storage.get_repository("bitnami/redis").unwrap().is_some());
}

#[tokio::test]
async fn test_cursor_cycle_stops_seed() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/search/a"))
        .respond_with(page(&format!("{}/search/b", base_url), &["redis"]))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search/b"))
        .respond_with(page(&format!("{}/search/a", base_url), &["nginx"]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url);
    let crawler = DiscoveryCrawler::new(
        &config,
        FetchClient::new(&config.registry).unwrap(),
        create_test_storage(&[]),
        Arc::new(ProcessCounters::new()),
    )
    .unwrap();

    let pages = crawler
        .crawl_seed(&format!("{}/search/a", base_url), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(pages, 2);
}

#[tokio::test]
async fn test_failing_seed_does_not_stop_sweep() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Default-order listing is broken
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", ""))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Recently-updated listing works
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("sort", "updated_at"))
        .and(query_param("order", "desc"))
        .respond_with(page("", &["redis", "nginx"]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url);
    let storage = create_test_storage(&[]);
    let crawler = DiscoveryCrawler::new(
        &config,
        FetchClient::new(&config.registry).unwrap(),
        storage.clone(),
        Arc::new(ProcessCounters::new()),
    )
    .unwrap();

    let pages = crawler.sweep(&CancellationToken::new()).await;

    assert_eq!(pages, 1);
    assert_eq!(storage.lock().unwrap().count_total_repositories().unwrap(), 2);
}

#[tokio::test]
async fn test_undecodable_page_aborts_seed() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/search/broken"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url);
    let crawler = DiscoveryCrawler::new(
        &config,
        FetchClient::new(&config.registry).unwrap(),
        create_test_storage(&[]),
        Arc::new(ProcessCounters::new()),
    )
    .unwrap();

    let result = crawler
        .crawl_seed(&format!("{}/search/broken", base_url), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(hubstats::HubError::Decode { .. })));
}

#[tokio::test]
async fn test_rediscovery_is_idempotent() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(page("", &["redis", "nginx", "bitnami/redis"]))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url);
    let storage = create_test_storage(&[]);
    let crawler = DiscoveryCrawler::new(
        &config,
        FetchClient::new(&config.registry).unwrap(),
        storage.clone(),
        Arc::new(ProcessCounters::new()),
    )
    .unwrap();

    let cancel = CancellationToken::new();
    crawler.sweep(&cancel).await;
    let after_first = storage.lock().unwrap().count_total_repositories().unwrap();
    crawler.sweep(&cancel).await;
    let after_second = storage.lock().unwrap().count_total_repositories().unwrap();

    assert_eq!(after_first, 3);
    assert_eq!(after_second, after_first);
}
