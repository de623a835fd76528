//! Manual catalog sync trigger.

use axum::extract::State;
use axum::http::Extensions;
use axum::Json;
use tracing::{info, Instrument};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::get_request_id;
use crate::services::{SyncReport, SyncScope};

/// POST /api/v1/sync
///
/// Runs a full sync in a background task and waits for it. The body is optional; without
/// `organization_ids` every active organization is synced.
pub async fn trigger_sync(
    State(state): State<AppState>,
    extensions: Extensions,
    body: Option<Json<SyncScope>>,
) -> Result<Json<SyncReport>, ApiError> {
    let scope = body.map(|Json(scope)| scope).unwrap_or_default();
    info!(
        request_id = %get_request_id(&extensions),
        organizations = ?scope.organization_ids,
        "Manual catalog sync requested"
    );

    // Detached from the request so a timeout does not abort a sync halfway.
    let sync = state.catalog_sync.clone();
    let report = tokio::spawn(async move { sync.run_full_sync(scope).await }.in_current_span())
        .await
        .map_err(|e| ApiError::Internal(format!("sync task failed: {}", e)))??;
    Ok(Json(report))
}
