use crate::auth::Session;
use crate::error::{ApiResult, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use mediastore_core::MediaRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteIngestRequest {
    pub file_url: String,
    /// Collection to store the record in instead of the remote-media default.
    #[serde(default)]
    pub collection_types: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteIngestResponse {
    pub success: bool,
    pub id: String,
    pub file_info: MediaRecord,
    pub deduplicated: bool,
}

/// Fetch a remote file and record it. Returns 201 for a new record and 200
/// when the content was already known.
#[tracing::instrument(skip(state, session, request), fields(user_id = %session.user_id, file_url = %request.file_url))]
pub async fn ingest_remote(
    State(state): State<AppState>,
    session: Session,
    ValidatedJson(request): ValidatedJson<RemoteIngestRequest>,
) -> ApiResult<(StatusCode, Json<RemoteIngestResponse>)> {
    let ingested = state
        .remote
        .ingest_remote(
            &request.file_url,
            request.collection_types.as_deref(),
            &session.user_id,
        )
        .await?;

    let status = if ingested.deduplicated {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(RemoteIngestResponse {
            success: true,
            id: ingested.id,
            file_info: ingested.record,
            deduplicated: ingested.deduplicated,
        }),
    ))
}
