use axum::extract::State;
use serde_json::{json, Value};
use tracing::warn;

use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /status - liveness probe; a failing store is reported, not fatal
pub async fn get(State(state): State<AppState>) -> ApiResult<Value> {
    let database = match state.records.health_check().await {
        Ok(()) => "ok",
        Err(e) => {
            warn!(error = %e, "store health check failed");
            "unavailable"
        }
    };

    Ok(ApiResponse::success(json!({
        "status": "CRM server is running",
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
    })))
}
