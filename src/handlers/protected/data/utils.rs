use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde_json::Value;

use crate::error::ApiError;
use crate::schema::EntitySchema;
use crate::state::AppState;

/// Look up the descriptor behind a `/:resource` segment.
pub fn resolve_schema<'a>(state: &'a AppState, resource: &str) -> Result<&'a EntitySchema, ApiError> {
    state
        .catalog
        .get(resource)
        .ok_or_else(|| ApiError::not_found("Route not found"))
}

pub fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::bad_request(format!("Invalid id '{}'", raw)))
}

/// Unwrap a JSON body, turning axum's plain-text rejection into our error shape.
pub fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    body.map(|Json(v)| v)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_ids_only() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert!(parse_id("abc").is_err());
        assert!(parse_id("0").is_err());
        assert!(parse_id("-3").is_err());
    }
}
