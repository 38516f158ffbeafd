use crate::auth::Session;
use crate::error::{ApiResult, ValidatedJson};
use crate::handlers::load_authorized;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use mediastore_core::{AppError, MediaRecord, Permission};
use mediastore_services::{BulkDeleteResult, TrashOutcome};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<String>,
}

#[tracing::instrument(skip(state, session), fields(user_id = %session.user_id))]
pub async fn delete_media(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    load_authorized(&state, &session, &id, Permission::Delete).await?;
    state.ingestion.delete_media(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete several records. Unknown ids are reported, while a single id the
/// caller may not delete fails the whole request before anything is removed.
#[tracing::instrument(skip(state, session, request), fields(user_id = %session.user_id, requested = request.ids.len()))]
pub async fn bulk_delete(
    State(state): State<AppState>,
    session: Session,
    ValidatedJson(request): ValidatedJson<BulkDeleteRequest>,
) -> ApiResult<Json<BulkDeleteResult>> {
    for id in &request.ids {
        match load_authorized(&state, &session, id, Permission::Delete).await {
            Ok(_) | Err(AppError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(Json(state.ingestion.bulk_delete(&request.ids).await?))
}

#[tracing::instrument(skip(state, session), fields(user_id = %session.user_id))]
pub async fn trash_media(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> ApiResult<Json<TrashOutcome>> {
    load_authorized(&state, &session, &id, Permission::Delete).await?;
    Ok(Json(state.trash.move_record_to_trash(&id, None).await?))
}

#[tracing::instrument(skip(state, session), fields(user_id = %session.user_id))]
pub async fn restore_media(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> ApiResult<Json<MediaRecord>> {
    load_authorized(&state, &session, &id, Permission::Delete).await?;
    Ok(Json(state.trash.restore(&id, None).await?))
}
