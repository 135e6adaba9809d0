//! ABOUTME: End-to-end smoke test for the crawler task orchestration core
//! ABOUTME: Boots the real server on an ephemeral port and drives it over HTTP

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tc_config::Config;
use tc_crawlers::{CrawlerRegistry, MockCrawler};
use tc_db::Db;
use tc_service::AppServices;
use tc_web::AppState;
use tokio::net::TcpListener;

async fn spawn_server() -> (String, Arc<AppServices>) {
    let pool = test_support::create_test_pool().await;
    let db = Db::from_pool(pool);

    let mut registry = CrawlerRegistry::new();
    registry.register(Arc::new(MockCrawler::new("mock_crawler")));

    let services = Arc::new(
        AppServices::build(&Config::default(), db, registry)
            .await
            .expect("failed to build services"),
    );
    services.start().await.expect("failed to start services");

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port")
        .into_std()
        .expect("convert to std listener");
    let addr = listener.local_addr().expect("read bound addr");

    let state = AppState::new(services.clone());
    let server = actix_web::HttpServer::new(move || tc_web::create_app(state.clone()))
        .listen(listener)
        .expect("listen on bound socket")
        .run();
    tokio::spawn(server);

    // Give the listener a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (format!("http://{addr}"), services)
}

#[tokio::test]
async fn full_crawler_task_lifecycle_over_http() {
    let (base_url, services) = spawn_server().await;
    let client = Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("build http client");

    let health = client
        .get(format!("{base_url}/healthz"))
        .send()
        .await
        .expect("healthz request");
    assert!(health.status().is_success());

    let ready = client
        .get(format!("{base_url}/readyz"))
        .send()
        .await
        .expect("readyz request");
    assert!(ready.status().is_success());

    let create_crawler_body = json!({
        "crawler_name": "smoke-crawler",
        "crawler_type": "mock",
        "module_name": "mock_crawler",
        "base_url": "https://example.com",
        "config_file_name": "smoke.json",
        "config": {
            "site_name": "Example",
            "base_url": "https://example.com",
            "list_url_template": "https://example.com/{category}",
            "categories": {"news": "/news"},
            "crawler_settings": {"max_retries": 3, "retry_delay": 5, "timeout": 30}
        }
    });

    let resp = client
        .post(format!("{base_url}/api/crawlers"))
        .json(&create_crawler_body)
        .send()
        .await
        .expect("create crawler request");
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.expect("parse crawler response");
    let crawler_id = body["data"]["id"].as_i64().expect("crawler id");

    let create_task_body = json!({
        "task_name": "smoke task",
        "crawler_id": crawler_id,
        "is_auto": false,
    });
    let resp = client
        .post(format!("{base_url}/api/tasks"))
        .json(&create_task_body)
        .send()
        .await
        .expect("create task request");
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.expect("parse task response");
    let task_id = body["data"]["id"].as_i64().expect("task id");

    let resp = client
        .post(format!("{base_url}/api/tasks/{task_id}/execute"))
        .json(&json!({ "is_async": false }))
        .send()
        .await
        .expect("execute task request");
    assert_eq!(resp.status(), 200);

    let resp = client
        .get(format!("{base_url}/api/tasks/{task_id}/status"))
        .send()
        .await
        .expect("task status request");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("parse status response");
    assert_eq!(body["data"]["task_status"], "COMPLETED");

    let resp = client
        .get(format!("{base_url}/api/scheduler/status"))
        .send()
        .await
        .expect("scheduler status request");
    assert_eq!(resp.status(), 200);

    services.shutdown().await.expect("shutdown services");
}
