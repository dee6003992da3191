use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::schema::{EntitySchema, Row, WriteMode};
use crate::storage::UPLOADS_PREFIX;
use crate::state::AppState;

use super::utils::{json_body, parse_id, resolve_schema};

/// GET /:resource/:id
pub async fn get(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
) -> ApiResult<Row> {
    let schema = resolve_schema(&state, &resource)?;
    let id = parse_id(&id)?;

    match state.records.get(schema, id).await? {
        Some(row) => Ok(ApiResponse::success(row)),
        None => Err(ApiError::not_found("Record not found")),
    }
}

/// PUT /:resource/:id - full replace of every writable field
pub async fn put(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let schema = resolve_schema(&state, &resource)?;
    let id = parse_id(&id)?;
    let body = json_body(body)?;

    let row = schema.validate(&body, WriteMode::Replace, Utc::now())?;

    // Validated bodies never carry an upload path, so naming the attachment
    // column at all releases the file currently stored there.
    let superseded = if state.config.uploads.delete_with_record && touches_attachment(schema, &row) {
        state
            .records
            .get(schema, id)
            .await?
            .and_then(|prev| stored_upload(schema, &prev).map(str::to_string))
    } else {
        None
    };

    state.records.replace(schema, id, row).await?;
    info!(resource = %schema.name, id, "replaced record");

    if let Some(path) = superseded {
        if let Err(e) = state.attachments.delete(&path).await {
            warn!(%path, error = %e, "failed to remove superseded attachment");
        }
    }
    Ok(ApiResponse::success(json!({ "message": "Record updated successfully" })))
}

/// DELETE /:resource/:id - hard delete, attachment removed when configured
pub async fn delete(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
) -> ApiResult<Value> {
    let schema = resolve_schema(&state, &resource)?;
    let id = parse_id(&id)?;

    let removed = state.records.delete(schema, id).await?;
    info!(resource = %schema.name, id, "deleted record");

    if state.config.uploads.delete_with_record {
        if let Some(path) = stored_upload(schema, &removed) {
            // Best effort: the record is already gone.
            if let Err(e) = state.attachments.delete(path).await {
                warn!(%path, error = %e, "failed to remove attachment of deleted record");
            }
        }
    }

    Ok(ApiResponse::success(json!({ "message": "Record deleted successfully" })))
}

fn touches_attachment(schema: &EntitySchema, row: &Row) -> bool {
    schema.attachment.as_ref().is_some_and(|spec| row.contains_key(&spec.field))
}

/// The `/uploads/...` path held in the attachment column, if any.
fn stored_upload<'a>(schema: &EntitySchema, row: &'a Row) -> Option<&'a str> {
    schema
        .attachment
        .as_ref()
        .and_then(|spec| row.get(&spec.field))
        .and_then(Value::as_str)
        .filter(|p| p.starts_with(UPLOADS_PREFIX))
}
