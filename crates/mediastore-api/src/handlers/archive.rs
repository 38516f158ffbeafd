use crate::auth::Session;
use crate::error::{ApiResult, ValidatedJson};
use crate::handlers::load_authorized;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use mediastore_core::{AppError, Permission};
use mediastore_services::archive::CONTENT_TYPE;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ArchiveRequest {
    pub ids: Vec<String>,
}

/// Stream a `.tar.gz` of the originals of the selected records. The temporary
/// archive is removed once the response body is dropped.
#[tracing::instrument(skip(state, session, request), fields(user_id = %session.user_id, requested = request.ids.len()))]
pub async fn download_archive(
    State(state): State<AppState>,
    session: Session,
    ValidatedJson(request): ValidatedJson<ArchiveRequest>,
) -> ApiResult<Response> {
    for id in &request.ids {
        match load_authorized(&state, &session, id, Permission::Read).await {
            Ok(_) | Err(AppError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    let archive = state.exporter.export_records(&request.ids).await?;
    let disposition = HeaderValue::from_str(&archive.content_disposition())
        .map_err(|e| AppError::Internal(format!("Invalid archive filename: {}", e)))?;
    tracing::info!(
        entries = archive.entries,
        skipped = archive.skipped,
        size_bytes = archive.size,
        "Streaming archive"
    );

    let stream = archive.into_stream().await?;
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}
