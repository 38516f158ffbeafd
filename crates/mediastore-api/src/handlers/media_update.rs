use crate::auth::Session;
use crate::error::{ApiResult, ValidatedJson};
use crate::handlers::load_authorized;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use mediastore_core::{AccessEntry, MediaRecord, Permission};
use serde_json::Value;

/// Merge a JSON object into the record. Immutable fields are rejected by the
/// service.
#[tracing::instrument(skip(state, session, patch), fields(user_id = %session.user_id))]
pub async fn update_media(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    ValidatedJson(patch): ValidatedJson<Value>,
) -> ApiResult<Json<MediaRecord>> {
    load_authorized(&state, &session, &id, Permission::Write).await?;
    Ok(Json(state.ingestion.update(&id, patch).await?))
}

#[tracing::instrument(skip(state, session, entries), fields(user_id = %session.user_id, entries = entries.len()))]
pub async fn update_access(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    ValidatedJson(entries): ValidatedJson<Vec<AccessEntry>>,
) -> ApiResult<Json<MediaRecord>> {
    load_authorized(&state, &session, &id, Permission::Write).await?;
    Ok(Json(state.ingestion.update_access(&id, entries).await?))
}
