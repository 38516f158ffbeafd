//! HTTP handlers. Each one resolves the caller's session, checks access on
//! the record it touches and delegates to a service.

pub mod analytics;
pub mod archive;
pub mod media_delete;
pub mod media_get;
pub mod media_update;
pub mod media_upload;
pub mod remote_ingest;

use crate::auth::Session;
use crate::state::AppState;
use mediastore_core::{AppResult, MediaRecord, Permission};

/// Load a record the session may read and additionally holds `permission` on.
pub(crate) async fn load_authorized(
    state: &AppState,
    session: &Session,
    id: &str,
    permission: Permission,
) -> AppResult<MediaRecord> {
    let record = state
        .ingestion
        .get_media(id, &session.user_id, &session.roles)
        .await?;
    if permission != Permission::Read {
        state
            .ingestion
            .authorize(&record, &session.user_id, &session.roles, permission)
            .await?;
    }
    Ok(record)
}
