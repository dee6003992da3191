use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{delete, get},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::handlers::{protected, public, route_not_found};
use crate::middleware::api_key_auth;
use crate::state::AppState;

pub fn build_app(state: AppState) -> Router {
    use protected::{association, data, relay, users};

    let body_limit = state
        .config
        .server
        .max_request_size_bytes
        .max(state.config.uploads.max_upload_bytes);
    let cors = cors_layer(&state.config);

    Router::new()
        // Public (the gate lets these two through)
        .route("/status", get(public::status_get))
        .route("/users", get(users::list).post(public::register_post))
        // Principals
        .route("/users/:id", delete(users::delete))
        // Generic resources
        .route("/:resource", get(data::collection_get).post(data::collection_post))
        .route(
            "/:resource/:id",
            get(data::record_get).put(data::record_put).delete(data::record_delete),
        )
        .route("/:resource/:id/:member", get(association::get).post(association::post))
        // Stored attachments
        .merge(relay::router(state.attachments.root()))
        .fallback(route_not_found)
        .layer(from_fn_with_state(state.clone(), api_key_auth))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        )
}

/// Any origin unless `SECURITY_CORS_ORIGINS` names specific ones.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Catalog;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    fn app() -> Router {
        let root = std::env::temp_dir().join(format!("agent-crm-app-{}", uuid::Uuid::new_v4()));
        build_app(AppState::in_memory(AppConfig::development(), Catalog::builtin(), root))
    }

    #[tokio::test]
    async fn gate_runs_before_routing() {
        let res = app()
            .oneshot(Request::get("/nowhere").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn status_reports_store_health() {
        let res = app()
            .oneshot(Request::get("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "CRM server is running");
        assert_eq!(json["database"], "ok");
    }
}
