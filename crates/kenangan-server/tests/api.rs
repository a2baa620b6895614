use kenangan_server::{config::StorageSettings, router, AppState};
use reqwest::StatusCode;
use tempfile::TempDir;

async fn spawn_server(max_body_bytes: usize) -> (String, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let storage = StorageSettings {
        data_dir: dir.path().join("data"),
        max_body_bytes,
    };
    let app = router(AppState::open(&storage).await.unwrap());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/api"), dir)
}

#[tokio::test]
async fn test_health_endpoint() {
    let (base, _dir) = spawn_server(1024).await;
    let resp = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_unwritten_key_is_404() {
    let (base, _dir) = spawn_server(1024).await;
    let resp = reqwest::get(format!("{base}/documents/albums")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers()["cache-control"], "no-store");
}

#[tokio::test]
async fn test_post_then_get_returns_exact_body() {
    let (base, _dir) = spawn_server(1024).await;
    let client = reqwest::Client::new();
    let url = format!("{base}/documents/albums");
    let body = r#"[{"id":"1","name":"Trip","createdAt":1000,"photos":[]}]"#;

    let resp = client.post(&url).body(body).send().await.unwrap();
    assert!(resp.status().is_success());

    // Cache busting query parameters are ignored by the store
    let resp = client.get(format!("{url}?_=123-0")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["cache-control"], "no-store");
    assert_eq!(resp.headers()["content-type"], "application/json");
    assert_eq!(resp.text().await.unwrap(), body);
}

#[tokio::test]
async fn test_second_post_overwrites_first() {
    let (base, _dir) = spawn_server(1024).await;
    let client = reqwest::Client::new();
    let url = format!("{base}/documents/albums");

    client.post(&url).body("[1]").send().await.unwrap();
    client.post(&url).body("[2]").send().await.unwrap();
    let text = client.get(&url).send().await.unwrap().text().await.unwrap();
    assert_eq!(text, "[2]");
}

#[tokio::test]
async fn test_keys_are_independent() {
    let (base, _dir) = spawn_server(1024).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{base}/documents/family"))
        .body("[]")
        .send()
        .await
        .unwrap();
    let resp = client.get(format!("{base}/documents/friends")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_oversized_body_rejected_with_413() {
    let (base, _dir) = spawn_server(64).await;
    let client = reqwest::Client::new();
    let url = format!("{base}/documents/albums");
    let big = format!("[\"{}\"]", "x".repeat(500));

    let resp = client.post(&url).body(big).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let resp = client.get(&url).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_json_rejected() {
    let (base, _dir) = spawn_server(1024).await;
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{base}/documents/albums"))
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_key_rejected() {
    let (base, _dir) = spawn_server(1024).await;
    let resp = reqwest::get(format!("{base}/documents/bad.key")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
