// GET /uploads/* - previously stored attachments, served from the upload root
use axum::{handler::HandlerWithoutStateExt, Router};
use std::path::Path;
use tower_http::services::ServeDir;

use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::UPLOADS_PREFIX;

pub fn router(root: &Path) -> Router<AppState> {
    let files = ServeDir::new(root).not_found_service(file_not_found.into_service());
    Router::new().nest_service(UPLOADS_PREFIX, files)
}

async fn file_not_found() -> ApiError {
    ApiError::not_found("File not found")
}
