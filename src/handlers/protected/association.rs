// Many-to-many links such as /campaigns/:id/personas
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::schema::{Association, EntitySchema, Row};
use crate::state::AppState;

use super::data::utils::{json_body, parse_id};

fn resolve<'a>(state: &'a AppState, owner: &str, member: &str) -> Result<(&'a Association, &'a EntitySchema), ApiError> {
    let assoc = state
        .catalog
        .association(owner, member)
        .ok_or_else(|| ApiError::not_found("Route not found"))?;
    let member = state
        .catalog
        .get(&assoc.member)
        .ok_or_else(|| ApiError::not_found("Route not found"))?;
    Ok((assoc, member))
}

/// GET /:owner/:id/:member - member records linked to the owner
pub async fn get(
    State(state): State<AppState>,
    Path((owner, id, member)): Path<(String, String, String)>,
) -> ApiResult<Vec<Row>> {
    let (assoc, member) = resolve(&state, &owner, &member)?;
    let id = parse_id(&id)?;
    let rows = state.records.linked(assoc, member, id).await?;
    Ok(ApiResponse::success(rows))
}

/// POST /:owner/:id/:member `{"<member>_ids": [..]}` - insert-or-ignore
pub async fn post(
    State(state): State<AppState>,
    Path((owner, id, member)): Path<(String, String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let (assoc, _) = resolve(&state, &owner, &member)?;
    let id = parse_id(&id)?;
    let body = json_body(body)?;
    let member_ids = parse_member_ids(&body, &assoc.body_key)?;

    let linked = state.records.link(assoc, id, &member_ids).await?;
    info!(association = %assoc.table, owner_id = id, requested = member_ids.len(), linked, "linked records");

    Ok(ApiResponse::success(json!({
        "message": format!("{} linked to {}", assoc.member_path, assoc.owner_path),
        "linked": linked,
    })))
}

fn parse_member_ids(body: &Value, key: &str) -> Result<Vec<i64>, ApiError> {
    let Some(items) = body.get(key).and_then(Value::as_array) else {
        return Err(ApiError::bad_request(format!("{} must be an array", key)));
    };
    items
        .iter()
        .map(|item| match item {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .map(|id| id.ok_or_else(|| ApiError::bad_request(format!("{} must contain integer ids", key))))
        .collect()
}
