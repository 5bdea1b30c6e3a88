//! Shared helpers for the `api` integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use api_lib::adapters::{ChimeCue, JsonFileRepository};
use api_lib::config::Config;
use api_lib::web::{build_router, state::AppState};
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use pomodoro_core::TaskStore;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// A router over a fresh JSON document in a temporary directory.
///
/// The `TempDir` must stay alive for as long as the app is used.
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub dir: TempDir,
}

impl TestApp {
    pub fn db_path(&self) -> std::path::PathBuf {
        self.dir.path().join("db.json")
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Sends `body` verbatim, with an optional `content-type`.
    pub async fn raw(
        &self,
        method: Method,
        uri: &str,
        content_type: Option<&str>,
        body: &'static str,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(content_type) = content_type {
            builder = builder.header("content-type", content_type);
        }
        let request = builder.body(Body::from(body)).unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> Response<Body> {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> Response<Body> {
        self.request(Method::PATCH, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> Response<Body> {
        self.request(Method::DELETE, uri, None).await
    }
}

pub fn test_config(dir: &TempDir, chime_enabled: bool) -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        db_path: dir.path().join("db.json"),
        log_level: tracing::Level::DEBUG,
        cors_origin: None,
        chime_enabled,
    }
}

/// Build the full application router, the same way the binary does.
pub async fn build_test_app() -> TestApp {
    build_app(false).await
}

/// Like `build_test_app`, with completion chimes pushed to timer clients.
pub async fn build_test_app_with_chime() -> TestApp {
    build_app(true).await
}

async fn build_app(chime_enabled: bool) -> TestApp {
    let dir = TempDir::new().unwrap();
    let config = Arc::new(test_config(&dir, chime_enabled));

    let repo = Arc::new(JsonFileRepository::new(config.db_path.clone()));
    repo.init().await.unwrap();
    let store = Arc::new(TaskStore::new(repo));
    let chime = chime_enabled.then(|| Arc::new(ChimeCue::new().unwrap()));
    let state = Arc::new(AppState::new(store, config, chime));

    TestApp {
        router: build_router(state.clone()),
        state,
        dir,
    }
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
