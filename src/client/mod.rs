//! Typed HTTP gateway to the CRM API, used by the `crm` CLI and integration tests.

pub mod view;

use bytes::Bytes;
use reqwest::{multipart, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::database::{NewPrincipal, Principal};

pub use view::LocalView;

const TOTAL_COUNT_HEADER: &str = "x-total-count";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{message}")]
    Validation {
        message: String,
        field_errors: BTreeMap<String, String>,
    },

    #[error("{0}")]
    Duplicate(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    code: String,
    #[serde(default)]
    field_errors: BTreeMap<String, String>,
}

impl ClientError {
    /// Map an error response back onto the API's error taxonomy.
    fn from_response(status: StatusCode, body: &str) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = if parsed.error.is_empty() {
            status.canonical_reason().unwrap_or("error").to_string()
        } else {
            parsed.error
        };

        match status {
            StatusCode::UNAUTHORIZED => ClientError::Unauthenticated(message),
            StatusCode::FORBIDDEN => ClientError::Forbidden(message),
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::BAD_REQUEST => match parsed.code.as_str() {
                "VALIDATION_ERROR" => ClientError::Validation { message, field_errors: parsed.field_errors },
                "DUPLICATE" => ClientError::Duplicate(message),
                _ => ClientError::BadRequest(message),
            },
            other => ClientError::Server { status: other.as_u16(), message },
        }
    }
}

/// One page of a collection plus the server-side total.
#[derive(Debug, Clone)]
pub struct Page {
    pub items: Vec<Value>,
    pub total: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct CrmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl CrmClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.http.request(method, url);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ClientError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::from_response(status, &body))
    }

    async fn json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = self.send(builder).await?;
        response.json::<T>().await.map_err(|e| ClientError::Decode(e.to_string()))
    }

    pub async fn status(&self) -> Result<Value, ClientError> {
        self.json(self.request(Method::GET, "/status")).await
    }

    /// Register a principal; returns its id.
    pub async fn register(&self, principal: &NewPrincipal) -> Result<i64, ClientError> {
        let body: Value = self.json(self.request(Method::POST, "/users").json(principal)).await?;
        created_id(&body)
    }

    pub async fn list_users(&self) -> Result<Vec<Principal>, ClientError> {
        self.json(self.request(Method::GET, "/users")).await
    }

    pub async fn delete_user(&self, id: i64) -> Result<(), ClientError> {
        self.send(self.request(Method::DELETE, &format!("/users/{}", id))).await?;
        Ok(())
    }

    pub async fn list(&self, resource: &str) -> Result<Vec<Value>, ClientError> {
        self.json(self.request(Method::GET, &format!("/{}", resource))).await
    }

    pub async fn list_page(&self, resource: &str, limit: i64, offset: i64) -> Result<Page, ClientError> {
        let builder = self
            .request(Method::GET, &format!("/{}", resource))
            .query(&[("limit", limit), ("offset", offset)]);
        let response = self.send(builder).await?;
        let total = response
            .headers()
            .get(TOTAL_COUNT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let items = response.json().await.map_err(|e| ClientError::Decode(e.to_string()))?;
        Ok(Page { items, total })
    }

    pub async fn get(&self, resource: &str, id: i64) -> Result<Value, ClientError> {
        self.json(self.request(Method::GET, &format!("/{}/{}", resource, id))).await
    }

    /// Create a record; returns the `{id, ...}` body.
    pub async fn create(&self, resource: &str, record: &Value) -> Result<Value, ClientError> {
        self.json(self.request(Method::POST, &format!("/{}", resource)).json(record)).await
    }

    pub async fn update(&self, resource: &str, id: i64, record: &Value) -> Result<(), ClientError> {
        self.send(self.request(Method::PUT, &format!("/{}/{}", resource, id)).json(record))
            .await?;
        Ok(())
    }

    pub async fn delete(&self, resource: &str, id: i64) -> Result<(), ClientError> {
        self.send(self.request(Method::DELETE, &format!("/{}/{}", resource, id))).await?;
        Ok(())
    }

    /// Multipart create: text fields plus one `file` part.
    pub async fn create_with_attachment(
        &self,
        resource: &str,
        fields: &[(String, String)],
        file_name: &str,
        body: Vec<u8>,
    ) -> Result<Value, ClientError> {
        let mut form = multipart::Form::new();
        for (name, value) in fields {
            form = form.text(name.clone(), value.clone());
        }
        form = form.part("file", multipart::Part::bytes(body).file_name(file_name.to_string()));

        self.json(self.request(Method::POST, &format!("/{}", resource)).multipart(form))
            .await
    }

    /// Download a stored attachment by the path recorded on its record.
    pub async fn fetch_attachment(&self, path: &str) -> Result<Bytes, ClientError> {
        let path = if path.starts_with('/') { path.to_string() } else { format!("/{}", path) };
        let response = self.send(self.request(Method::GET, &path)).await?;
        Ok(response.bytes().await?)
    }

    /// Link personas to a campaign; returns how many links were new.
    pub async fn link_personas(&self, campaign_id: i64, persona_ids: &[i64]) -> Result<u64, ClientError> {
        let body: Value = self
            .json(
                self.request(Method::POST, &format!("/campaigns/{}/personas", campaign_id))
                    .json(&json!({ "persona_ids": persona_ids })),
            )
            .await?;
        body.get("linked")
            .and_then(Value::as_u64)
            .ok_or_else(|| ClientError::Decode(format!("missing 'linked' in {}", body)))
    }

    pub async fn linked_personas(&self, campaign_id: i64) -> Result<Vec<Value>, ClientError> {
        self.json(self.request(Method::GET, &format!("/campaigns/{}/personas", campaign_id)))
            .await
    }
}

fn created_id(body: &Value) -> Result<i64, ClientError> {
    body.get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| ClientError::Decode(format!("missing 'id' in {}", body)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_statuses_onto_error_taxonomy() {
        assert!(matches!(
            ClientError::from_response(StatusCode::UNAUTHORIZED, r#"{"error":"Missing Authorization header"}"#),
            ClientError::Unauthenticated(m) if m == "Missing Authorization header"
        ));
        assert!(matches!(
            ClientError::from_response(StatusCode::FORBIDDEN, r#"{"error":"Invalid API Key"}"#),
            ClientError::Forbidden(_)
        ));
        assert!(matches!(
            ClientError::from_response(StatusCode::BAD_REQUEST, r#"{"error":"dup","code":"DUPLICATE"}"#),
            ClientError::Duplicate(_)
        ));
        assert!(matches!(
            ClientError::from_response(StatusCode::INTERNAL_SERVER_ERROR, "not json"),
            ClientError::Server { status: 500, .. }
        ));
    }

    #[test]
    fn validation_errors_keep_field_detail() {
        let err = ClientError::from_response(
            StatusCode::BAD_REQUEST,
            r#"{"error":"Missing required fields: name","code":"VALIDATION_ERROR","field_errors":{"name":"is required"}}"#,
        );
        match err {
            ClientError::Validation { field_errors, .. } => assert_eq!(field_errors["name"], "is required"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        assert_eq!(CrmClient::new("http://localhost:5000/").base_url(), "http://localhost:5000");
    }
}
