use crate::AppState;
use crate::api::error::AppError;
use crate::models::{FileMetadata, UploadResponse, UploadSession};
use crate::services::upload_handler::UploadHandler;
use axum::{Json, extract::Request, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    /// Room that should receive progress events for this upload
    #[serde(rename = "socketId", alias = "sessionId")]
    pub socket_id: Option<String>,
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Files stored in the downloads folder", body = Vec<FileMetadata>),
        (status = 500, description = "Downloads folder could not be read")
    ),
    tag = "files"
)]
pub async fn list_files(state: &AppState) -> Result<Json<Vec<FileMetadata>>, AppError> {
    let files = state
        .inventory
        .file_status(&state.config.downloads_folder)
        .await?;
    Ok(Json(files))
}

#[utoipa::path(
    post,
    path = "/",
    request_body(content = String, description = "multipart/form-data with one or more files", content_type = "multipart/form-data"),
    params(
        ("socketId" = Option<String>, Query, description = "Session that receives progress events")
    ),
    responses(
        (status = 200, description = "Every file was stored", body = UploadResponse),
        (status = 400, description = "Malformed multipart body"),
        (status = 413, description = "Request body too large"),
        (status = 500, description = "Files could not be stored")
    ),
    tag = "files"
)]
pub async fn upload_files(
    state: &AppState,
    request: Request,
) -> Result<Json<UploadResponse>, AppError> {
    info!("📤 Receiving upload {}", request.uri());

    let query: UploadQuery = serde_urlencoded::from_str(request.uri().query().unwrap_or_default())
        .map_err(|e| AppError::BadRequest(format!("Invalid query string: {}", e)))?;

    let session = UploadSession::new(
        query.socket_id,
        state.config.downloads_folder.clone(),
        state.config.progress_interval,
    );
    let handler = UploadHandler::new(
        session,
        state.notifier.clone(),
        state.sink.clone(),
        state.clock.clone(),
    );

    let multipart = handler.register_parsing(request).await?;
    let summary = handler.process(multipart).await?;

    info!(
        "Upload for session {:?} finished: {} file(s), {} bytes",
        handler.session().session_id,
        summary.files.len(),
        summary.total_bytes()
    );

    Ok(Json(UploadResponse::success()))
}

#[utoipa::path(
    options,
    path = "/",
    responses(
        (status = 204, description = "CORS preflight accepted")
    ),
    tag = "files"
)]
pub async fn preflight() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

pub async fn default_route() -> impl IntoResponse {
    "hello world"
}
