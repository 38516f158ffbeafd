use crate::auth::Session;
use crate::error::ApiResult;
use crate::handlers::load_authorized;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use mediastore_core::{MediaRecord, MediaType, Permission};
use mediastore_db::{MediaQuery, Page};
use serde::Deserialize;

const DEFAULT_PAGE_LIMIT: u32 = 20;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(rename = "type")]
    pub media_type: Option<MediaType>,
    pub folder: Option<String>,
    pub owner: Option<String>,
    /// Case-insensitive filename search.
    pub q: Option<String>,
}

pub async fn get_media(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> ApiResult<Json<MediaRecord>> {
    let record = load_authorized(&state, &session, &id, Permission::Read).await?;
    Ok(Json(record))
}

/// Active records the caller may list, newest first, optionally filtered
/// and searched.
pub async fn list_media(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Page<MediaRecord>>> {
    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    let query = MediaQuery {
        search: None,
        media_type: params.media_type,
        folder: params.folder,
        owner: params.owner,
    };
    let query = state
        .ingestion
        .scope_query(query, &session.user_id, &session.roles)
        .await?;

    let results = match params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        Some(term) => state.ingestion.search(term, query, page, limit).await?,
        None => state.ingestion.list(&query, page, limit).await?,
    };
    Ok(Json(results))
}
