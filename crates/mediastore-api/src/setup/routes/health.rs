//! Health check handlers.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::time::Duration;

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);
const PROBE_KEY: &str = "health-check-non-existent-key";

/// Liveness probe - process is running.
pub async fn liveness_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "alive" })),
    )
}

/// Readiness probe - the storage backend answers within the timeout.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let storage = match tokio::time::timeout(CHECK_TIMEOUT, state.storage.exists(PROBE_KEY)).await {
        Ok(Ok(_)) => "ready".to_string(),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Storage readiness check failed");
            format!("not_ready: {}", e)
        }
        Err(_) => {
            tracing::error!("Storage readiness check timed out");
            "timeout".to_string()
        }
    };

    let status_code = if storage == "ready" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let status = if status_code == StatusCode::OK {
        "ready"
    } else {
        "not_ready"
    };

    (
        status_code,
        Json(serde_json::json!({
            "status": status,
            "storage": storage,
            "backend": state.storage.kind().to_string(),
        })),
    )
}
