//! Router assembly: public health probes, session-protected media API and
//! static serving of the local backend.

mod health;
mod media;

use crate::auth::require_session;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    routing::get,
    Router,
};
use mediastore_core::constants::LOCAL_PUBLIC_ROUTE;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    trace::TraceLayer,
};

pub const API_PREFIX: &str = "/api/v1";

/// Room for multipart boundaries and text parts on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

fn setup_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .expose_headers([header::CONTENT_DISPOSITION])
}

pub fn setup_routes(state: AppState) -> Result<Router, anyhow::Error> {
    let protected_routes = media::media_routes().layer(axum::middleware::from_fn_with_state(
        state.clone(),
        require_session,
    ));

    let mut app = Router::new()
        .route("/health", get(health::liveness_check))
        .route("/health/ready", get(health::readiness_check))
        .nest(API_PREFIX, protected_routes);

    if let Some(root) = &state.public_root {
        app = app.nest_service(LOCAL_PUBLIC_ROUTE, ServeDir::new(root));
    }

    let http_concurrency_limit = std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10_000)
        .max(1);
    let body_limit = usize::try_from(state.config.max_file_size_bytes())
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    tracing::info!(http_concurrency_limit, body_limit, "HTTP limits configured");

    let app = app
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(DefaultBodyLimit::disable())
        .layer(setup_cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}
