use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mediastore_core::{AppError, ErrorMetadata, LogLevel};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Error response structure
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,
    /// Client-facing error message
    pub error: String,
    /// Machine-readable error code (e.g. "STORAGE_ERROR")
    pub code: String,
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

impl ErrorResponse {
    fn from_app_error(error: &AppError) -> Self {
        Self {
            success: false,
            error: error.client_message(),
            code: error.error_code().to_string(),
            recoverable: error.is_recoverable(),
            suggested_action: error.suggested_action().map(String::from),
        }
    }
}

/// HTTP wrapper for AppError. `AppError` lives in mediastore-core, so the
/// IntoResponse impl needs a local type.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

pub type ApiResult<T> = Result<T, HttpAppError>;

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

/// Log with the level the error asks for. The full internal message is
/// logged; the client only sees `client_message`.
fn log_error(error: &AppError) {
    let code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => tracing::debug!(error = %error, code, "Request rejected"),
        LogLevel::Warn => tracing::warn!(error = %error, code, "Request failed"),
        LogLevel::Error => tracing::error!(error = %error, code, "Request failed"),
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;
        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        (status, Json(ErrorResponse::from_app_error(app_error))).into_response()
    }
}

/// JSON extractor whose rejections use the regular error body.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| {
                HttpAppError(AppError::InvalidInput(rejection.body_text()))
            })?;
        Ok(ValidatedJson(value))
    }
}
