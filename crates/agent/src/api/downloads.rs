//! Download submission API handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use haul_core::registry::normalize_id;
use haul_core::{MoveAction, PipelineError, RegisterOutcome, ResolverError, SubmitRequest};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::handlers::{api_error, ApiError};
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

/// Where to move a download once it completes.
#[derive(Debug, Clone, Deserialize)]
pub struct MoveTarget {
    /// rclone remote, e.g. `remote1:`
    pub remote: String,
    /// Path within the remote, e.g. `/movies/`
    pub dest: String,
}

impl From<MoveTarget> for MoveAction {
    fn from(target: MoveTarget) -> Self {
        MoveAction::new(target.remote, target.dest)
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitDownloadRequest {
    /// Magnet URI or .torrent URL.
    pub url: String,
    #[serde(default)]
    pub save_path: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, rename = "move")]
    pub move_to: Option<MoveTarget>,
}

#[derive(Debug, Serialize)]
pub struct SubmitDownloadResponse {
    pub id: String,
    pub name: String,
    pub move_registered: bool,
}

#[derive(Debug, Serialize)]
pub struct RegisterMoveResponse {
    pub id: String,
    pub target: String,
    pub replaced: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/downloads
///
/// Submit a download and wait until the backend reports its id. An optional
/// `move` target is registered for execution on completion.
pub async fn submit_download(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SubmitDownloadRequest>, JsonRejection>,
) -> Result<Json<SubmitDownloadResponse>, ApiError> {
    let Json(body) =
        payload.map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?;

    let request = SubmitRequest {
        locator: body.url,
        destination_path: body.save_path,
        category_label: body.category,
        action: body.move_to.map(MoveAction::from),
    };

    match state.pipeline().submit(request).await {
        Ok(result) => Ok(Json(SubmitDownloadResponse {
            id: result.id,
            name: result.display_name,
            move_registered: result.action_registered,
        })),
        Err(e) => {
            warn!(error = %e, "Download submission failed");
            Err(pipeline_error(e))
        }
    }
}

/// POST /api/v1/downloads/{id}/move
///
/// Register or replace the move action for a known download.
pub async fn register_move(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<MoveTarget>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterMoveResponse>), ApiError> {
    let Json(target) =
        payload.map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?;
    if id.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Download id is required"));
    }

    let action = MoveAction::from(target);
    let descriptor = action.target_descriptor();

    let outcome = state
        .pipeline()
        .register_action(&id, action)
        .await
        .map_err(pipeline_error)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(RegisterMoveResponse {
            id: normalize_id(&id),
            target: descriptor,
            replaced: outcome == RegisterOutcome::Replaced,
        }),
    ))
}

fn pipeline_error(error: PipelineError) -> ApiError {
    let status = match &error {
        PipelineError::Resolver(ResolverError::InvalidLocator(_)) => StatusCode::BAD_REQUEST,
        PipelineError::Resolver(ResolverError::AddRejected { .. }) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        PipelineError::Resolver(ResolverError::ResolutionTimeout { .. }) => {
            StatusCode::GATEWAY_TIMEOUT
        }
        PipelineError::Resolver(ResolverError::Client(_)) => StatusCode::BAD_GATEWAY,
        PipelineError::Busy(_) => StatusCode::CONFLICT,
    };
    api_error(status, error.to_string())
}
