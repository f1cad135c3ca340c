pub mod api;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::ServerConfig;
use crate::services::notifier::NotificationChannel;
use crate::services::storage::{FileInventory, LocalFileStore, PersistenceSink};
use crate::services::throttle::{Clock, SystemClock};
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware::from_fn,
    response::{IntoResponse, Response},
    routing::get,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{Span, info};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::files::list_files,
        api::handlers::files::upload_files,
        api::handlers::files::preflight,
    ),
    components(
        schemas(
            models::FileMetadata,
            models::UploadResponse,
            models::ProgressEvent,
        )
    ),
    tags(
        (name = "files", description = "Upload and list files")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub notifier: Arc<dyn NotificationChannel>,
    pub sink: Arc<dyn PersistenceSink>,
    pub inventory: Arc<dyn FileInventory>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Local disk storage and wall-clock time.
    pub fn new(config: ServerConfig, notifier: Arc<dyn NotificationChannel>) -> Self {
        let store = Arc::new(LocalFileStore::new());
        Self {
            config,
            notifier,
            sink: store.clone(),
            inventory: store,
            clock: Arc::new(SystemClock),
        }
    }
}

async fn openapi_json() -> Response {
    let mut response = Json(ApiDoc::openapi()).into_response();
    api::routes::allow_any_origin(&mut response);
    response
}

pub fn create_app(state: AppState) -> Router {
    let body_limit = state.config.max_request_size;

    Router::new()
        .route(
            "/api-docs/openapi.json",
            get(openapi_json).fallback(api::routes::handler),
        )
        .fallback(api::routes::handler)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(api::middleware::request_id::request_span)
                .on_request(|request: &axum::extract::Request, _span: &Span| {
                    info!("📥 {} {}", request.method(), request.uri());
                })
                .on_response(|response: &Response, latency: Duration, _span: &Span| {
                    info!(
                        "📤 Finished in {:?} with status {}",
                        latency,
                        response.status()
                    );
                }),
        )
        // outside the trace layer so generated ids reach the span
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
