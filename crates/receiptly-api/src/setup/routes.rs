//! Route configuration and setup

use crate::auth::middleware::auth_middleware;
use crate::constants::{AUTHORIZE_PATH, CALLBACK_PATH, HOME_PATH, MULTIPART_OVERHEAD_BYTES};
use crate::handlers;
use crate::session::session_middleware;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use receiptly_core::Config;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub async fn setup_routes(
    config: &Config,
    state: Arc<AppState>,
) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    // Session routes: every request gets a session; pipeline routes also need credentials.
    let session_routes = public_routes()
        .merge(
            protected_routes().layer(axum::middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ));

    // Server-level concurrency limit to protect against resource exhaustion under extreme load
    let http_concurrency_limit = std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10_000)
        .max(1);
    tracing::info!(
        http_concurrency_limit = http_concurrency_limit,
        "HTTP concurrency limit layer enabled"
    );

    let body_limit = config.max_upload_size_bytes() + MULTIPART_OVERHEAD_BYTES;

    let app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
        .merge(utoipa_rapidoc::RapiDoc::new("/api/openapi.json").path("/docs"))
        .merge(session_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins().contains(&"*".to_string()) {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

        // Credentialed requests carry the session cookie.
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([axum::http::header::CONTENT_TYPE])
            .allow_credentials(true)
    };
    Ok(cors)
}

/// Routes that need a session but no ledger credentials.
fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(HOME_PATH, get(handlers::auth::session_status))
        .route(AUTHORIZE_PATH, get(handlers::auth::authorize))
        .route(CALLBACK_PATH, get(handlers::auth::callback))
        .route("/logout", get(handlers::auth::logout))
        .route("/upload", post(handlers::upload::upload_receipt))
}

/// Pipeline routes (require ledger credentials).
fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/receipts/process",
            post(handlers::receipts::process_receipt),
        )
        .route(
            "/receipts/confirm",
            post(handlers::receipts::confirm_receipt),
        )
        .route("/receipts/submit", post(handlers::receipts::submit_receipt))
        .route("/receipts/cancel", post(handlers::receipts::cancel_receipt))
        .route("/categories", get(handlers::catalog::list_categories))
        .route("/groups", get(handlers::catalog::list_groups))
        .route("/groups/current", post(handlers::catalog::select_group))
}
