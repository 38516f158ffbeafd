use crate::auth::Session;
use crate::error::ApiResult;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use mediastore_services::StorageReport;
use serde::Deserialize;

const DEFAULT_MONTHS_AHEAD: u32 = 3;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportParams {
    pub months_ahead: Option<u32>,
}

pub async fn storage_report(
    State(state): State<AppState>,
    _session: Session,
    Query(params): Query<ReportParams>,
) -> ApiResult<Json<StorageReport>> {
    let months_ahead = params.months_ahead.unwrap_or(DEFAULT_MONTHS_AHEAD);
    Ok(Json(state.analytics.report(months_ahead).await?))
}
