use super::common;

use common::test_server::TestServer;
use futures::future::join_all;
use std::collections::HashSet;
use tokenpool::persistence::TokenRepository;

#[tokio::test]
async fn test_get_code_dispenses_once() {
    let server = TestServer::with_tokens(&["ABC123"]).await;
    let client = reqwest::Client::new();

    let response = client.get(server.url("/code")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"],
        "text/plain; charset=utf-8"
    );
    assert_eq!(response.headers()["cache-control"], "no-store");
    assert_eq!(
        response.text().await.unwrap(),
        "Your access code is: ABC123"
    );

    let response = client.get(server.url("/code")).send().await.unwrap();
    assert_eq!(response.status(), 204);
    assert!(response.text().await.unwrap().is_empty());

    assert_eq!(server.repository.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_post_code() {
    let server = TestServer::with_tokens(&["XYZ789"]).await;
    let client = reqwest::Client::new();

    let response = client.post(server.url("/code")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().ends_with("XYZ789"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_get_distinct_codes() {
    let codes: Vec<String> = (0..6).map(|i| format!("HTTP{:03}", i)).collect();
    let refs: Vec<&str> = codes.iter().map(String::as_str).collect();
    let server = TestServer::with_tokens(&refs).await;
    let client = reqwest::Client::new();

    let requests = (0..10).map(|_| {
        let client = client.clone();
        let url = server.url("/code");
        async move {
            let response = client.get(url).send().await.unwrap();
            let status = response.status().as_u16();
            (status, response.text().await.unwrap())
        }
    });
    let results = join_all(requests).await;

    let granted: Vec<&String> = results
        .iter()
        .filter(|(status, _)| *status == 200)
        .map(|(_, body)| body)
        .collect();
    let unique: HashSet<&&String> = granted.iter().collect();

    assert_eq!(granted.len(), 6);
    assert_eq!(unique.len(), 6);
    assert_eq!(results.iter().filter(|(status, _)| *status == 204).count(), 4);
    assert_eq!(server.repository.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_cors_preflight_echoes_origin() {
    let server = TestServer::with_tokens(&[]).await;
    let client = reqwest::Client::new();

    let response = client
        .request(reqwest::Method::OPTIONS, server.url("/code"))
        .header("Origin", "https://survey.example.org")
        .header("Access-Control-Request-Method", "GET")
        .header("Access-Control-Request-Headers", "x-requested-with")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let headers = response.headers();
    assert_eq!(
        headers["access-control-allow-origin"],
        "https://survey.example.org"
    );
    assert_eq!(headers["access-control-allow-credentials"], "true");
    assert_eq!(headers["access-control-allow-headers"], "x-requested-with");
    assert!(headers["access-control-allow-methods"]
        .to_str()
        .unwrap()
        .contains("DELETE"));
}

#[tokio::test]
async fn test_cors_headers_on_actual_request() {
    let server = TestServer::with_tokens(&["ABC123"]).await;
    let client = reqwest::Client::new();

    let response = client
        .get(server.url("/code"))
        .header("Origin", "http://localhost:8000")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://localhost:8000"
    );
}
