use crate::handlers::{
    analytics, archive, media_delete, media_get, media_update, media_upload, remote_ingest,
};
use crate::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};

pub(super) fn media_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/media",
            get(media_get::list_media).post(media_upload::upload_media),
        )
        .route("/media/remote", post(remote_ingest::ingest_remote))
        .route("/media/archive", post(archive::download_archive))
        .route("/media/bulk-delete", post(media_delete::bulk_delete))
        .route(
            "/media/{id}",
            get(media_get::get_media)
                .patch(media_update::update_media)
                .delete(media_delete::delete_media),
        )
        .route("/media/{id}/access", put(media_update::update_access))
        .route("/media/{id}/versions", post(media_upload::add_version))
        .route("/media/{id}/trash", post(media_delete::trash_media))
        .route("/media/{id}/restore", post(media_delete::restore_media))
        .route("/analytics/storage", get(analytics::storage_report))
}
