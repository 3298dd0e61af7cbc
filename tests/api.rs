//! Endpoint-level tests
//!
//! Drives the whole surface against a scripted extractor: upload, batch
//! processing, renamed downloads, archive export and clearing.

use std::io::Cursor;
use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::Value;
use zip::ZipArchive;

use luminaria_server::config::Config;
use luminaria_server::db;
use luminaria_server::extraction::MockExtractor;
use luminaria_server::routes;
use luminaria_server::state::AppState;

async fn spawn_server(extractor: Arc<MockExtractor>) -> (TestServer, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}/test.db", dir.path().display());
    let pool = db::create_pool(&url).await.unwrap();

    let state = AppState::new(Config::default(), pool, extractor);
    state.restore().await.unwrap();

    let server = TestServer::new(routes::app(state)).unwrap();
    (server, dir)
}

fn photo(name: &str, bytes: &[u8]) -> Part {
    Part::bytes(bytes.to_vec())
        .file_name(name)
        .mime_type("image/jpeg")
}

#[tokio::test]
async fn full_flow_upload_process_export_clear() {
    let extractor = Arc::new(MockExtractor::with_script(vec![
        Ok("08390".to_string()),
        Ok("12345".to_string()),
    ]));
    let (server, _dir) = spawn_server(extractor).await;

    // Upload two photos.
    let form = MultipartForm::new()
        .add_part("files", photo("poste_1.jpg", b"first jpeg"))
        .add_part("files", photo("poste_2.jpg", b"second jpeg"));
    let response = server.post("/api/v1/images").multipart(form).await;
    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["images"].as_array().unwrap().len(), 2);

    // Without a credential the run fails its precondition and nothing moves.
    let response = server.post("/api/v1/process").await;
    response.assert_status(StatusCode::PRECONDITION_FAILED);
    let body: Value = server.get("/api/v1/images").await.json();
    assert_eq!(body["counts"]["pending"], 2);

    // Store the key and run the batch.
    let response = server
        .put("/api/v1/settings/api-key")
        .json(&serde_json::json!({ "apiKey": "clave-de-prueba" }))
        .await;
    response.assert_status(StatusCode::NO_CONTENT);

    let response = server.post("/api/v1/process").await;
    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["outcome"], "completed");
    assert_eq!(body["summary"]["attempted"], 2);
    assert_eq!(body["summary"]["succeeded"], 2);

    // Both records carry their codes now.
    let body: Value = server.get("/api/v1/images").await.json();
    let images = body["images"].as_array().unwrap();
    assert_eq!(images[0]["status"], "success");
    assert_eq!(images[0]["extractedCode"], "08390");
    assert_eq!(images[0]["found"], true);
    assert_eq!(images[1]["extractedCode"], "12345");

    // A single download is renamed to the extracted code.
    let id = images[0]["id"].as_str().unwrap();
    let response = server.get(&format!("/api/v1/images/{}/file", id)).await;
    response.assert_status(StatusCode::OK);
    let disposition = response.header("content-disposition");
    assert!(
        disposition.to_str().unwrap().contains("08390.jpg"),
        "got: {:?}",
        disposition
    );

    // The archive uses the same names.
    let response = server.get("/api/v1/export").await;
    response.assert_status(StatusCode::OK);
    assert_eq!(response.header("content-type"), "application/zip");
    let mut archive = ZipArchive::new(Cursor::new(response.as_bytes().to_vec())).unwrap();
    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    assert!(names.contains(&"luminarias_procesadas/08390.jpg".to_string()));
    assert!(names.contains(&"luminarias_procesadas/12345.jpg".to_string()));

    let mut content = Vec::new();
    std::io::Read::read_to_end(
        &mut archive.by_name("luminarias_procesadas/08390.jpg").unwrap(),
        &mut content,
    )
    .unwrap();
    assert_eq!(content, b"first jpeg");

    // Clearing empties everything; the next run is a no-op.
    let response = server.delete("/api/v1/images").await;
    response.assert_status(StatusCode::NO_CONTENT);

    let body: Value = server.get("/api/v1/images").await.json();
    assert!(body["images"].as_array().unwrap().is_empty());

    let body: Value = server.post("/api/v1/process").await.json();
    assert_eq!(body["outcome"], "empty");
}

#[tokio::test]
async fn export_without_processed_images_is_not_found() {
    let (server, _dir) = spawn_server(Arc::new(MockExtractor::returning("08390"))).await;

    let response = server.get("/api/v1/export").await;
    response.assert_status(StatusCode::NOT_FOUND);

    // Pending-only records do not export either.
    let form = MultipartForm::new().add_part("files", photo("poste.jpg", b"jpeg"));
    server.post("/api/v1/images").multipart(form).await;

    let response = server.get("/api/v1/export").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn run_status_tracks_the_last_run() {
    let extractor = Arc::new(MockExtractor::returning(""));
    let (server, _dir) = spawn_server(extractor).await;

    let body: Value = server.get("/api/v1/process/status").await.json();
    assert_eq!(body["state"], "idle");

    let form = MultipartForm::new().add_part("files", photo("poste.jpg", b"jpeg"));
    server.post("/api/v1/images").multipart(form).await;
    server
        .put("/api/v1/settings/api-key")
        .json(&serde_json::json!({ "apiKey": "clave" }))
        .await;
    server.post("/api/v1/process").await;

    let body: Value = server.get("/api/v1/process/status").await.json();
    assert_eq!(body["state"], "completed");
    assert_eq!(body["message"], "Lote de 1 imágenes completado.");

    // An empty answer still counts as processed, with the fallback code.
    let body: Value = server.get("/api/v1/images").await.json();
    assert_eq!(body["images"][0]["status"], "success");
    assert_eq!(body["images"][0]["extractedCode"], "No encontrado");
    assert_eq!(body["images"][0]["found"], false);
}

#[tokio::test]
async fn environment_fallback_credential_is_used() {
    let extractor = Arc::new(MockExtractor::returning("77012"));
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}/test.db", dir.path().display());
    let pool = db::create_pool(&url).await.unwrap();

    let mut config = Config::default();
    config.extraction.api_key = Some("clave-del-entorno".to_string());
    let state = AppState::new(config, pool, extractor);
    let server = TestServer::new(routes::app(state)).unwrap();

    let form = MultipartForm::new().add_part("files", photo("poste.jpg", b"jpeg"));
    server.post("/api/v1/images").multipart(form).await;

    let body: Value = server.get("/api/v1/settings/api-key").await.json();
    assert_eq!(body["configured"], true);
    assert_eq!(body["source"], "environment");

    let body: Value = server.post("/api/v1/process").await.json();
    assert_eq!(body["outcome"], "completed");
    assert_eq!(body["summary"]["attempted"], 1);
}
