use axum::{
    extract::{rejection::QueryRejection, FromRequest, Multipart, Path, Query, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiError;
use crate::filter::{ListFilter, ListParams};
use crate::middleware::{ApiResponse, ApiResult};
use crate::schema::{EntitySchema, Row, WriteMode};
use crate::state::AppState;

use super::upload;
use super::utils::{json_body, resolve_schema};

pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// GET /:resource - full list in descriptor order, or one page of it
pub async fn get(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    query: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Vec<Row>> {
    let schema = resolve_schema(&state, &resource)?;
    let Query(params) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let filter = ListFilter::resolve(schema, &params, &state.config.pagination)?;
    let rows = state.records.list(schema, &filter).await?;

    let mut response = ApiResponse::success(rows);
    if filter.is_paginated() {
        let total = state.records.count(schema).await?;
        response = response.header(HeaderName::from_static(TOTAL_COUNT_HEADER), HeaderValue::from(total));
    }
    Ok(response)
}

/// POST /:resource - JSON body, or multipart/form-data carrying a `file` part
pub async fn post(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    request: Request,
) -> ApiResult<Value> {
    let schema = resolve_schema(&state, &resource)?;

    if is_multipart(request.headers()) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        return upload::create(&state, schema, multipart).await;
    }

    let body = json_body(Json::<Value>::from_request(request, &state).await)?;
    let row = schema.validate(&body, WriteMode::Create, Utc::now())?;
    let attachment = attachment_value(schema, &row);

    let id = state.records.insert(schema, row).await?;
    info!(resource = %schema.name, id, "created record");
    Ok(ApiResponse::created(created_body(schema, id, attachment)))
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

pub(super) fn attachment_value(schema: &EntitySchema, row: &Row) -> Option<Value> {
    schema.attachment.as_ref().and_then(|spec| row.get(&spec.field).cloned())
}

/// `{id}`, plus the attachment path for entities that carry one.
pub(super) fn created_body(schema: &EntitySchema, id: i64, attachment: Option<Value>) -> Value {
    let mut body = json!({ "id": id });
    if let Some(spec) = &schema.attachment {
        body[spec.field.as_str()] = attachment.unwrap_or(Value::Null);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Catalog;

    #[test]
    fn created_body_includes_attachment_field() {
        let catalog = Catalog::builtin();
        let quotes = catalog.get("quotes").unwrap();
        assert_eq!(
            created_body(quotes, 3, Some(json!("/uploads/quotes/a.pdf"))),
            json!({"id": 3, "file_url": "/uploads/quotes/a.pdf"})
        );
        assert_eq!(created_body(catalog.get("leads").unwrap(), 4, None), json!({"id": 4}));
    }

    #[test]
    fn detects_multipart_bodies() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("multipart/form-data; boundary=x"));
        assert!(is_multipart(&headers));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        assert!(!is_multipart(&headers));
    }
}
