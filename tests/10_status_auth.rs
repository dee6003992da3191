mod common;

use anyhow::Result;
use reqwest::{Method, StatusCode};
use serde_json::Value;

#[tokio::test]
async fn status_is_public() -> Result<()> {
    let server = common::spawn().await?;

    let res = server.request(Method::GET, "/status").send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<Value>().await?;
    assert_eq!(body["status"], "CRM server is running");
    assert!(body.get("success").is_none(), "responses carry no envelope: {}", body);
    Ok(())
}

#[tokio::test]
async fn missing_credential_is_unauthenticated() -> Result<()> {
    let server = common::spawn().await?;

    let res = server.request(Method::GET, "/contacts").send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<Value>().await?;
    assert!(body["error"].is_string(), "error message missing: {}", body);
    assert_eq!(body["code"], "UNAUTHENTICATED");
    Ok(())
}

#[tokio::test]
async fn malformed_authorization_is_unauthenticated() -> Result<()> {
    let server = common::spawn().await?;

    for value in ["Token abc", "Bearer ", "Bearer    "] {
        let res = server
            .request(Method::GET, "/contacts")
            .header("Authorization", value)
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "header {:?}", value);
    }
    Ok(())
}

#[tokio::test]
async fn unknown_key_is_forbidden() -> Result<()> {
    let server = common::spawn().await?;

    let res = server
        .request(Method::GET, "/contacts")
        .bearer_auth("crm_not_registered")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(res.json::<Value>().await?["error"], "Invalid API Key");
    Ok(())
}

#[tokio::test]
async fn valid_key_reaches_the_handler() -> Result<()> {
    let server = common::spawn().await?;

    let res = server.authed(Method::GET, "/contacts").send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?, serde_json::json!([]));
    Ok(())
}

#[tokio::test]
async fn unknown_routes_are_gated_then_not_found() -> Result<()> {
    let server = common::spawn().await?;

    let res = server.request(Method::GET, "/no-such-thing").send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server.authed(Method::GET, "/no-such-thing").send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.json::<Value>().await?["error"], "Route not found");

    let res = server.authed(Method::GET, "/a/b/c/d").send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn role_policy_is_opt_in() -> Result<()> {
    let mut config = agent_crm::config::AppConfig::development();
    config.security.enforce_roles = true;
    let server = common::spawn_with(config).await?;

    let res = server
        .request(Method::POST, "/users")
        .json(&serde_json::json!({
            "name": "Read Only", "email": "viewer@example.com", "role": "viewer", "api_key": "crm_viewer"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = server.request(Method::GET, "/contacts").bearer_auth("crm_viewer").send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server
        .request(Method::POST, "/contacts")
        .bearer_auth("crm_viewer")
        .json(&serde_json::json!({ "full_name": "Blocked" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}
