use crate::auth::Session;
use crate::error::ApiResult;
use crate::handlers::load_authorized;
use crate::state::AppState;
use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use mediastore_core::{AppError, MediaRecord, Permission};
use mediastore_services::UploadedFile;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Upload form: a `file` part and an optional `path` part naming the folder.
struct UploadForm {
    file: UploadedFile,
    path: String,
}

fn multipart_error(e: MultipartError) -> AppError {
    AppError::InvalidInput(format!("Invalid multipart body: {}", e.body_text()))
}

async fn read_upload(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut file = None;
    let mut path = String::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or(DEFAULT_CONTENT_TYPE)
                    .to_string();
                let data = field.bytes().await.map_err(multipart_error)?;
                file = Some(UploadedFile {
                    filename,
                    mime_type,
                    data,
                });
            }
            Some("path") => path = field.text().await.map_err(multipart_error)?,
            _ => {}
        }
    }

    let file = file.ok_or_else(|| AppError::InvalidInput("Missing 'file' field".to_string()))?;
    Ok(UploadForm { file, path })
}

#[tracing::instrument(skip(state, session, multipart), fields(user_id = %session.user_id))]
pub async fn upload_media(
    State(state): State<AppState>,
    session: Session,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<MediaRecord>)> {
    let form = read_upload(multipart).await?;
    let record = state
        .ingestion
        .ingest(form.file, &form.path, &session.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Replace the bytes of an existing record, appending a version entry.
#[tracing::instrument(skip(state, session, multipart), fields(user_id = %session.user_id))]
pub async fn add_version(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<MediaRecord>> {
    load_authorized(&state, &session, &id, Permission::Write).await?;
    let form = read_upload(multipart).await?;
    let record = state
        .ingestion
        .add_version(&id, form.file, &session.user_id)
        .await?;
    Ok(Json(record))
}
