//! Common test utilities for API testing with mocks.
//!
//! Builds the agent router in-process around a real pipeline whose torrent
//! client and mover are mocks, so requests exercise the whole stack without
//! qBittorrent or rclone.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use haul_agent::{api::create_router, state::AppState};
use haul_core::{
    config::NotifierConfig,
    testing::{MockMover, MockTorrentClient},
    Config, DownloadPipeline, Notifier, WebhookNotifier,
};

/// Re-export fixtures for test convenience
pub use haul_core::testing::fixtures;

/// Test fixture with an in-process router.
///
/// The webhook notifier is real; point it at a local receiver with
/// `PUT /api/v1/notifier/webhook` to observe outcome events.
pub struct TestFixture {
    pub router: Router,
    pub pipeline: Arc<DownloadPipeline>,
    pub torrent_client: Arc<MockTorrentClient>,
    pub mover: Arc<MockMover>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_notifier(NotifierConfig::default())
    }

    pub fn with_notifier(notifier: NotifierConfig) -> Self {
        let torrent_client = Arc::new(MockTorrentClient::new());
        let mover = Arc::new(MockMover::new());
        let webhook =
            Arc::new(WebhookNotifier::new(&notifier).expect("Failed to create webhook notifier"));

        let config = Config {
            monitor: fixtures::fast_monitor_config(),
            resolver: fixtures::fast_resolver_config(),
            notifier,
            ..Default::default()
        };

        let pipeline = Arc::new(DownloadPipeline::new(
            config.monitor.clone(),
            config.resolver.clone(),
            torrent_client.clone(),
            mover.clone(),
            Arc::clone(&webhook) as Arc<dyn Notifier>,
        ));

        let state = Arc::new(AppState::new(config, Arc::clone(&pipeline), webhook));
        let router = create_router(state);

        Self {
            router,
            pipeline,
            torrent_client,
            mover,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Fetch a plain-text response body.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
