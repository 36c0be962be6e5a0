use super::common;

use common::test_server::TestServer;

#[tokio::test]
async fn test_health_endpoint() {
    let server = TestServer::with_tokens(&[]).await;
    let client = reqwest::Client::new();

    let response = client.get(server.url("/health")).send().await.unwrap();

    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["storage"], "ok");
    assert!(body["uptime_seconds"].is_number());
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_health_ready_reports_remaining() {
    let server = TestServer::with_tokens(&["ABC123", "XYZ789"]).await;
    let client = reqwest::Client::new();

    let response = client.get(server.url("/health/ready")).send().await.unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ready");
    assert_eq!(body["remaining"], 2);
}

#[tokio::test]
async fn test_health_ready_fails_when_storage_is_gone() {
    let server = TestServer::with_tokens(&["ABC123"]).await;
    server.repository.pool().close().await;
    let client = reqwest::Client::new();

    let response = client.get(server.url("/health/ready")).send().await.unwrap();
    assert_eq!(response.status(), 503);

    let response = client.get(server.url("/code")).send().await.unwrap();
    assert_eq!(response.status(), 503);
    assert!(response.text().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_health_live_endpoint() {
    let server = TestServer::with_tokens(&[]).await;
    let client = reqwest::Client::new();

    let response = client.get(server.url("/health/live")).send().await.unwrap();

    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "alive");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let server = TestServer::with_tokens(&["ABC123", "XYZ789", "QRS456"]).await;
    let client = reqwest::Client::new();

    client.get(server.url("/code")).send().await.unwrap();

    let response = client.get(server.url("/metrics")).send().await.unwrap();
    assert_eq!(response.status(), 200);

    let text = response.text().await.unwrap();
    assert!(text.contains("tokenpool_dispense_total{outcome=\"dispensed\"} 1"));
    assert!(text.contains("tokenpool_pool_remaining 2"));
}
