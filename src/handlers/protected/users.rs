use axum::extract::{Path, State};
use serde_json::{json, Value};
use tracing::info;

use crate::database::{DatabaseError, Principal};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

use super::data::utils::parse_id;

/// GET /users - newest first
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Principal>> {
    let users = state.principals.list().await?;
    Ok(ApiResponse::success(users))
}

/// DELETE /users/:id
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let id = parse_id(&id)?;
    state.principals.delete(id).await.map_err(|e| match e {
        DatabaseError::NotFound(_) => ApiError::not_found("User not found"),
        other => other.into(),
    })?;

    info!(user_id = id, "deleted principal");
    Ok(ApiResponse::success(json!({ "message": "User deleted successfully" })))
}
