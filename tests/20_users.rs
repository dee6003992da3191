mod common;

use anyhow::Result;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

fn principal(name: &str, email: &str, key: &str) -> Value {
    json!({ "name": name, "email": email, "role": "agent", "api_key": key })
}

#[tokio::test]
async fn register_is_public_and_returns_id() -> Result<()> {
    let server = common::spawn().await?;

    let res = server
        .request(Method::POST, "/users")
        .json(&principal("Ada", "ada@example.com", "crm_ada"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let id = res.json::<Value>().await?["id"].as_i64().expect("numeric id");
    assert!(id > 1, "seeded admin holds the first id");

    // The new key works immediately.
    let res = server.request(Method::GET, "/users").bearer_auth("crm_ada").send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn duplicate_email_or_key_is_rejected_without_side_effects() -> Result<()> {
    let server = common::spawn().await?;
    server
        .request(Method::POST, "/users")
        .json(&principal("Ada", "ada@example.com", "crm_ada"))
        .send()
        .await?;

    let before = server.authed(Method::GET, "/users").send().await?.json::<Vec<Value>>().await?.len();

    for body in [
        principal("Other", "ada@example.com", "crm_other"),
        principal("Other", "other@example.com", "crm_ada"),
    ] {
        let res = server.request(Method::POST, "/users").json(&body).send().await?;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let err = res.json::<Value>().await?;
        assert_eq!(err["error"], "Email or API key already exists");
        assert_eq!(err["code"], "DUPLICATE");
    }

    let after = server.authed(Method::GET, "/users").send().await?.json::<Vec<Value>>().await?.len();
    assert_eq!(before, after);
    Ok(())
}

#[tokio::test]
async fn register_validates_fields_and_role() -> Result<()> {
    let server = common::spawn().await?;

    let res = server
        .request(Method::POST, "/users")
        .json(&json!({ "name": "No Email" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let err = res.json::<Value>().await?;
    assert_eq!(err["code"], "VALIDATION_ERROR");
    assert_eq!(err["field_errors"]["email"], "is required");

    let mut body = principal("Bad Role", "bad@example.com", "crm_bad");
    body["role"] = json!("overlord");
    let res = server.request(Method::POST, "/users").json(&body).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await?["error"], "Invalid role");

    let res = server
        .request(Method::POST, "/users")
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn list_is_newest_first_and_delete_is_final() -> Result<()> {
    let server = common::spawn().await?;
    for (name, email, key) in [("B", "b@example.com", "crm_b"), ("C", "c@example.com", "crm_c")] {
        server.request(Method::POST, "/users").json(&principal(name, email, key)).send().await?;
    }

    let users = server.authed(Method::GET, "/users").send().await?.json::<Vec<Value>>().await?;
    let ids: Vec<i64> = users.iter().filter_map(|u| u["id"].as_i64()).collect();
    assert_eq!(ids.len(), 3);
    assert!(ids.windows(2).all(|w| w[0] > w[1]), "ids not descending: {:?}", ids);
    assert_eq!(users[0]["name"], "C");

    let newest = ids[0];
    let res = server.authed(Method::DELETE, &format!("/users/{}", newest)).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?["message"], "User deleted successfully");

    let res = server.authed(Method::DELETE, &format!("/users/{}", newest)).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // A deleted principal's key no longer authenticates.
    let res = server.request(Method::GET, "/users").bearer_auth("crm_c").send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server.authed(Method::DELETE, "/users/abc").send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
