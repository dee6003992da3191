// handlers/mod.rs - two security tiers
//
// Public (no credential) → Protected (API key resolved by the auth gate)
pub mod public; // GET /status, POST /users
pub mod protected; // principals, generic resources, associations, uploads

use crate::error::ApiError;

/// Fallback for unmatched routes.
pub async fn route_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
