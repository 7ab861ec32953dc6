//! Static asset server tests

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use envscope::http_server::{HttpServer, HttpServerConfig, WASM_CONTENT_TYPE};
use tempfile::TempDir;
use tower::ServiceExt;

fn asset_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("index.html"), "<!doctype html>").unwrap();
    std::fs::create_dir(dir.path().join("pkg")).unwrap();
    std::fs::write(dir.path().join("pkg/envscope_bg.wasm"), b"\0asm\x01\0\0\0").unwrap();
    std::fs::write(dir.path().join("pkg/envscope.js"), "export {}").unwrap();
    dir
}

fn server(dir: &TempDir, cors_origins: Vec<String>) -> HttpServer {
    HttpServer::with_config(HttpServerConfig {
        cors_origins,
        ..HttpServerConfig::default().root(dir.path().to_string_lossy().to_string())
    })
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_root_serves_index() {
    let dir = asset_dir();
    let response = server(&dir, vec![]).router().oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"<!doctype html>");
}

#[tokio::test]
async fn test_nested_wasm_gets_wasm_type() {
    let dir = asset_dir();
    let response = server(&dir, vec![])
        .router()
        .oneshot(get("/pkg/envscope_bg.wasm"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        WASM_CONTENT_TYPE
    );
}

#[tokio::test]
async fn test_script_keeps_guessed_type() {
    let dir = asset_dir();
    let response = server(&dir, vec![])
        .router()
        .oneshot(get("/pkg/envscope.js"))
        .await
        .unwrap();

    let content_type = response.headers().get(header::CONTENT_TYPE).unwrap();
    assert!(content_type.to_str().unwrap().contains("javascript"));
}

#[tokio::test]
async fn test_traversal_does_not_escape_root() {
    let dir = asset_dir();
    let response = server(&dir, vec![])
        .router()
        .oneshot(get("/../../etc/passwd"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_headers_only_when_configured() {
    let dir = asset_dir();
    let request = || {
        Request::builder()
            .uri("/index.html")
            .header(header::ORIGIN, "http://localhost:3000")
            .body(Body::empty())
            .unwrap()
    };

    let plain = server(&dir, vec![]).router().oneshot(request()).await.unwrap();
    assert!(plain
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());

    let cors = server(&dir, vec!["http://localhost:3000".into()])
        .router()
        .oneshot(request())
        .await
        .unwrap();
    assert_eq!(
        cors.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:3000"
    );
}
