use axum::http::{HeaderMap, Method};
use uuid::Uuid;

use crate::database::{Principal, Role};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    Missing,
    Malformed(&'static str),
}

impl CredentialError {
    pub fn message(&self) -> &'static str {
        match self {
            CredentialError::Missing => "Missing Authorization header",
            CredentialError::Malformed(msg) => msg,
        }
    }
}

/// Extract the API key from `Authorization: Bearer <key>`.
pub fn extract_bearer(headers: &HeaderMap) -> Result<String, CredentialError> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(CredentialError::Missing)?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| CredentialError::Malformed("Invalid Authorization header format"))?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        Some(_) => Err(CredentialError::Malformed("Empty API key")),
        None => Err(CredentialError::Malformed("Authorization header must use Bearer token format")),
    }
}

/// Routes that pass the gate without a credential.
pub fn is_public(method: &Method, path: &str) -> bool {
    let path = path.trim_end_matches('/');
    (method == Method::GET && path == "/status") || (method == Method::POST && path == "/users")
}

/// Opt-in role policy: viewers are read-only, only admins remove principals.
#[derive(Debug, Clone, Copy)]
pub struct RolePolicy {
    pub enforce: bool,
}

impl RolePolicy {
    pub fn new(enforce: bool) -> Self {
        Self { enforce }
    }

    pub fn permits(&self, principal: &Principal, method: &Method, path: &str) -> Result<(), &'static str> {
        if !self.enforce {
            return Ok(());
        }
        let read_only = method == Method::GET || method == Method::HEAD || method == Method::OPTIONS;
        if principal.role == Role::Viewer && !read_only {
            return Err("Viewer role is read-only");
        }
        if method == Method::DELETE && path.starts_with("/users/") && principal.role != Role::Admin {
            return Err("Only admins may delete users");
        }
        Ok(())
    }
}

/// Fresh opaque API key for `crm auth register`.
pub fn generate_api_key() -> String {
    format!("crm_{}", Uuid::new_v4().simple())
}
