use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::auth::{extract_bearer, is_public, RolePolicy};
use crate::error::ApiError;
use crate::state::AppState;

/// Resolve `Authorization: Bearer <api_key>` to a [`Principal`](crate::database::Principal)
/// and attach it to the request; `GET /status` and `POST /users` pass untouched.
pub async fn api_key_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    if is_public(&method, &path) {
        return Ok(next.run(request).await);
    }

    let api_key = extract_bearer(request.headers()).map_err(|e| {
        debug!(%method, %path, reason = e.message(), "rejecting request without credential");
        ApiError::unauthenticated(e.message())
    })?;

    let principal = match state.principals.find_by_key(&api_key).await? {
        Some(principal) => principal,
        None => {
            warn!(%method, %path, "rejecting unknown API key");
            return Err(ApiError::forbidden("Invalid API Key"));
        }
    };

    RolePolicy::new(state.config.security.enforce_roles)
        .permits(&principal, &method, &path)
        .map_err(|reason| {
            warn!(user_id = principal.id, role = %principal.role, %method, %path, "role policy denied request");
            ApiError::forbidden(reason)
        })?;

    debug!(user_id = principal.id, %method, %path, "authenticated");
    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}
