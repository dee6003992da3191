// Multipart create: form fields go through the same validation as JSON
// bodies, the `file` part lands in the attachment store.

use axum::extract::Multipart;
use bytes::Bytes;
use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::schema::{EntitySchema, WriteMode};
use crate::state::AppState;

use super::collection::{attachment_value, created_body};

pub const FILE_PART: &str = "file";

struct UploadedFile {
    name: String,
    body: Bytes,
}

pub async fn create(state: &AppState, schema: &EntitySchema, mut multipart: Multipart) -> ApiResult<Value> {
    let mut fields = Map::new();
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == FILE_PART {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let body = field.bytes().await.map_err(|e| ApiError::bad_request(e.body_text()))?;
            // An untouched file input still submits an empty part.
            if file_name.is_empty() && body.is_empty() {
                continue;
            }
            if body.len() > state.config.uploads.max_upload_bytes {
                return Err(ApiError::bad_request(format!(
                    "File exceeds the {} byte upload limit",
                    state.config.uploads.max_upload_bytes
                )));
            }
            file = Some(UploadedFile { name: file_name, body });
        } else {
            let text = field.text().await.map_err(|e| ApiError::bad_request(e.body_text()))?;
            fields.insert(name, Value::String(text));
        }
    }

    let mut row = schema.validate(&Value::Object(fields), WriteMode::Create, Utc::now())?;

    let stored = match (file, &schema.attachment) {
        (Some(file), Some(spec)) => {
            let path = state.attachments.put(&spec.subdir, &file.name, file.body).await?;
            row.insert(spec.field.clone(), Value::String(path.clone()));
            Some(path)
        }
        (Some(_), None) => {
            return Err(ApiError::bad_request(format!("'{}' does not accept file uploads", schema.name)));
        }
        (None, _) => None,
    };
    let attachment = attachment_value(schema, &row);

    let id = match state.records.insert(schema, row).await {
        Ok(id) => id,
        Err(e) => {
            if let Some(path) = &stored {
                if let Err(cleanup) = state.attachments.delete(path).await {
                    warn!(%path, error = %cleanup, "failed to remove orphaned attachment");
                }
            }
            return Err(e.into());
        }
    };

    info!(resource = %schema.name, id, attachment = ?stored, "created record from multipart form");
    Ok(ApiResponse::created(created_body(schema, id, attachment)))
}
