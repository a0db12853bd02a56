//! Completion monitor and notifier API handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use haul_core::{PipelineStatus, ScanReport};
use serde::{Deserialize, Serialize};

use super::handlers::{api_error, ApiError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SetWebhookRequest {
    /// New webhook URL; `null` disables delivery.
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub configured: bool,
}

/// GET /api/v1/monitor/status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<PipelineStatus> {
    Json(state.pipeline().status().await)
}

/// POST /api/v1/monitor/scan
///
/// Run one scan immediately. A scan already in progress makes this one
/// report `skipped`.
pub async fn scan_now(State(state): State<Arc<AppState>>) -> Json<ScanReport> {
    Json(state.pipeline().scan_now().await)
}

/// PUT /api/v1/notifier/webhook
pub async fn set_webhook(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SetWebhookRequest>, JsonRejection>,
) -> Result<Json<WebhookResponse>, ApiError> {
    let Json(body) =
        payload.map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?;

    let url = body.url.as_deref().map(str::trim).filter(|u| !u.is_empty());
    state
        .webhook()
        .set_url(url)
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    let url = state.webhook().url().await;
    Ok(Json(WebhookResponse {
        configured: url.is_some(),
        url,
    }))
}
