use crate::TestServer;
use pretty_assertions::assert_eq;

#[tokio::test]
async fn health_reports_online() {
    let server = TestServer::spawn().await;

    let response = server
        .client()
        .get(server.url("/health"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({"status": "online"}));
}

#[tokio::test]
async fn save_and_read_back_through_the_binary() {
    let server = TestServer::spawn().await;
    let client = server.client();

    let response = client
        .post(server.url("/save"))
        .json(&serde_json::json!({"data": [
            {"id": "e2e-1", "title": "First"},
            {"id": "e2e-2", "title": "Second"},
        ]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Saved 2 records");

    let listings: Vec<serde_json::Value> = client
        .get(server.url("/api/listings"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listings.len(), 2);

    let html = client
        .get(server.url("/"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("Total Listings: 2"));
    assert!(html.contains("First"));
}

#[tokio::test]
async fn file_store_persists_across_restarts() {
    let data_dir = tempfile::tempdir().unwrap();
    let dir_arg = data_dir.path().to_str().unwrap();
    let args = ["--object-store", "file", "--data-dir", dir_arg];

    {
        let server = TestServer::spawn_with(&args).await;
        let response = server
            .client()
            .post(server.url("/save"))
            .json(&serde_json::json!({"data": {"id": "e2e-1", "title": "Survives"}}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        // dropped here, which kills the process
    }

    let server = TestServer::spawn_with(&args).await;
    let listings: Vec<serde_json::Value> = server
        .client()
        .get(server.url("/api/listings"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0]["title"], "Survives");
}

#[tokio::test]
async fn invalid_payload_is_rejected_with_400() {
    let server = TestServer::spawn().await;

    let response = server
        .client()
        .post(server.url("/save"))
        .json(&serde_json::json!({"data": []}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid JSON data format");
}
