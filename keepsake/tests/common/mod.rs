#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use keepsake::api::{create_router, AppState};
use keepsake::config::Config;
use keepsake::db::{Database, DatabaseBackend, LibSqlBackend};
use keepsake::media;

/// A router over a fresh file-backed store. Keep the `TempDir` alive for the test.
pub struct TestApp {
    pub _dir: tempfile::TempDir,
    pub state: AppState,
    pub router: Router,
}

pub async fn test_app() -> TestApp {
    test_app_with(|_| {}).await
}

pub async fn test_app_with(tweak: impl FnOnce(&mut Config)) -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config =
        Config::for_database_url(format!("file:{}", dir.path().join("keepsake.db").display()));
    tweak(&mut config);

    let db = Database::new(&config.database).await.expect("open database");
    let backend: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(db));
    let state = AppState::new(config, backend, CancellationToken::new());
    let router = create_router(state.clone());

    TestApp {
        _dir: dir,
        state,
        router,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, uri: &str, body: &serde_json::Value) -> Response<Body> {
        self.send(json_request("POST", uri, body)).await
    }

    pub async fn patch_json(&self, uri: &str, body: &serde_json::Value) -> Response<Body> {
        self.send(json_request("PATCH", uri, body)).await
    }

    pub async fn delete(&self, uri: &str) -> Response<Body> {
        self.send(Request::delete(uri).body(Body::empty()).unwrap())
            .await
    }

    /// Upload `body` and return the stored memory JSON, asserting `201`.
    pub async fn upload(&self, body: serde_json::Value) -> serde_json::Value {
        let response = self.post_json("/memory/upload", &body).await;
        assert_eq!(response.status(), 201, "upload failed");
        body_json(response).await
    }
}

pub fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body")
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("json body")
}

/// A solid-colour PNG, base64 encoded.
pub fn png_base64(width: u32, height: u32) -> String {
    let image = RgbImage::from_pixel(width, height, Rgb([200, 120, 40]));
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .expect("encode png");
    media::encode(&out)
}

pub fn memory_body(title: &str, timestamp: &str) -> serde_json::Value {
    serde_json::json!({ "title": title, "timestamp": timestamp })
}
