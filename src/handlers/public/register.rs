// handlers/public/register.rs - POST /users
//
// Registration is deliberately unauthenticated: anyone can mint a principal
// and with it a valid API key.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::info;

use crate::database::{DatabaseError, NewPrincipal, Role};
use crate::error::ApiError;
use crate::handlers::protected::data::utils::json_body;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

const FIELDS: [&str; 4] = ["name", "email", "role", "api_key"];

pub async fn post(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let body = json_body(body)?;
    let principal = parse_principal(&body)?;
    let email = principal.email.clone();

    let id = state.principals.register(principal).await.map_err(|e| match e {
        DatabaseError::Duplicate(_) => ApiError::duplicate("Email or API key already exists"),
        other => other.into(),
    })?;

    info!(user_id = id, %email, "registered principal");
    Ok(ApiResponse::created(json!({ "id": id })))
}

fn parse_principal(body: &Value) -> Result<NewPrincipal, ApiError> {
    let field = |name: &str| {
        body.get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let (Some(name), Some(email), Some(role), Some(api_key)) =
        (field("name"), field("email"), field("role"), field("api_key"))
    else {
        let missing: BTreeMap<String, String> = FIELDS
            .iter()
            .filter(|f| field(**f).is_none())
            .map(|f| (f.to_string(), "is required".to_string()))
            .collect();
        return Err(ApiError::Validation {
            message: "Missing required fields".to_string(),
            field_errors: missing,
        });
    };

    let role: Role = role.parse().map_err(|msg: String| ApiError::Validation {
        message: "Invalid role".to_string(),
        field_errors: BTreeMap::from([("role".to_string(), msg)]),
    })?;

    Ok(NewPrincipal { name, email, role, api_key })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_every_field() {
        let err = parse_principal(&json!({"name": "A", "email": " "})).unwrap_err();
        match err {
            ApiError::Validation { field_errors, .. } => {
                let keys: Vec<&str> = field_errors.keys().map(String::as_str).collect();
                assert_eq!(keys, vec!["api_key", "email", "role"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn validates_role() {
        let body = json!({"name": "A", "email": "a@x.com", "role": "owner", "api_key": "k"});
        assert!(matches!(parse_principal(&body), Err(ApiError::Validation { .. })));

        let body = json!({"name": "A", "email": "a@x.com", "role": "Agent", "api_key": "k"});
        assert_eq!(parse_principal(&body).unwrap().role, Role::Agent);
    }
}
