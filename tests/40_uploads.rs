mod common;

use anyhow::Result;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

fn quote_form(bytes: &'static [u8]) -> Form {
    Form::new()
        .text("contact_id", "1")
        .text("amount", "1500.50")
        .text("status", "sent")
        .part("file", Part::bytes(bytes).file_name("offer letter.pdf"))
}

#[tokio::test]
async fn quote_upload_stores_and_serves_the_file() -> Result<()> {
    let server = common::spawn().await?;

    let res = server.authed(Method::POST, "/quotes").multipart(quote_form(b"%PDF-1.4 quote")).send().await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created = res.json::<Value>().await?;
    let id = created["id"].as_i64().expect("numeric id");
    let path = created["file_url"].as_str().expect("file_url path").to_string();
    assert!(path.starts_with("/uploads/quotes/"), "{}", path);
    assert!(path.ends_with("offer_letter.pdf"), "{}", path);

    let record = server.authed(Method::GET, &format!("/quotes/{}", id)).send().await?.json::<Value>().await?;
    assert_eq!(record["file_url"], path.as_str());
    assert_eq!(record["amount"].as_f64(), Some(1500.5));
    assert_eq!(record["contact_id"], 1);

    let res = server.authed(Method::GET, &path).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(&res.bytes().await?[..], b"%PDF-1.4 quote");

    // Attachments sit behind the gate like everything else.
    let res = server.request(Method::GET, &path).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn uploads_never_collide() -> Result<()> {
    let server = common::spawn().await?;

    let mut paths = Vec::new();
    for _ in 0..2 {
        let res = server.authed(Method::POST, "/quotes").multipart(quote_form(b"same bytes")).send().await?;
        assert_eq!(res.status(), StatusCode::CREATED);
        paths.push(res.json::<Value>().await?["file_url"].as_str().unwrap_or_default().to_string());
    }
    assert_ne!(paths[0], paths[1]);
    Ok(())
}

#[tokio::test]
async fn payment_upload_uses_invoice_link() -> Result<()> {
    let server = common::spawn().await?;

    let form = Form::new()
        .text("amount", "99")
        .text("due_date", "2024-06-01")
        .part("file", Part::bytes(&b"invoice"[..]).file_name("inv.pdf"));
    let res = server.authed(Method::POST, "/payments").multipart(form).send().await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created = res.json::<Value>().await?;
    assert!(created["invoice_link"].as_str().unwrap_or_default().starts_with("/uploads/invoices/"));
    Ok(())
}

#[tokio::test]
async fn json_create_on_attachment_entity_has_null_path() -> Result<()> {
    let server = common::spawn().await?;

    let res = server.authed(Method::POST, "/quotes").json(&json!({ "amount": 10 })).send().await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created = res.json::<Value>().await?;
    assert!(created["file_url"].is_null());
    Ok(())
}

#[tokio::test]
async fn file_on_entity_without_attachment_is_rejected() -> Result<()> {
    let server = common::spawn().await?;

    let form = Form::new()
        .text("full_name", "Has File")
        .part("file", Part::bytes(&b"x"[..]).file_name("x.txt"));
    let res = server.authed(Method::POST, "/contacts").multipart(form).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let list = server.authed(Method::GET, "/contacts").send().await?.json::<Vec<Value>>().await?;
    assert!(list.is_empty());
    Ok(())
}

#[tokio::test]
async fn missing_files_are_not_found() -> Result<()> {
    let server = common::spawn().await?;

    let res = server.authed(Method::GET, "/uploads/quotes/nope.pdf").send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.json::<Value>().await?["error"], "File not found");
    Ok(())
}

#[tokio::test]
async fn deleting_the_record_removes_its_attachment() -> Result<()> {
    let server = common::spawn().await?;

    let res = server.authed(Method::POST, "/quotes").multipart(quote_form(b"to be removed")).send().await?;
    let created = res.json::<Value>().await?;
    let id = created["id"].as_i64().expect("numeric id");
    let path = created["file_url"].as_str().expect("file_url path").to_string();

    let res = server.authed(Method::DELETE, &format!("/quotes/{}", id)).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server.authed(Method::GET, &path).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn records_cannot_claim_another_records_upload() -> Result<()> {
    let server = common::spawn().await?;

    let form = Form::new().text("amount", "99").part("file", Part::bytes(&b"invoice"[..]).file_name("inv.pdf"));
    let payment = server.authed(Method::POST, "/payments").multipart(form).send().await?.json::<Value>().await?;
    let payment_id = payment["id"].as_i64().expect("numeric id");
    let invoice = payment["invoice_link"].as_str().expect("invoice path").to_string();

    let res = server.authed(Method::POST, "/quotes").json(&json!({ "file_url": invoice })).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let form = Form::new().text("amount", "1").text("invoice_link", invoice.clone());
    let res = server.authed(Method::POST, "/payments").multipart(form).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server.authed(Method::POST, "/quotes").json(&json!({ "amount": 5 })).send().await?;
    let quote_id = res.json::<Value>().await?["id"].as_i64().expect("numeric id");
    let res = server
        .authed(Method::PUT, &format!("/quotes/{}", quote_id))
        .json(&json!({ "amount": 5, "file_url": invoice }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    server.authed(Method::DELETE, &format!("/quotes/{}", quote_id)).send().await?;

    // Not even the owning record may resubmit the path.
    let res = server
        .authed(Method::PUT, &format!("/payments/{}", payment_id))
        .json(&json!({ "amount": 99, "invoice_link": invoice }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let res = server.authed(Method::GET, &invoice).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn replace_keeps_attachment_until_cleared() -> Result<()> {
    let server = common::spawn().await?;

    let res = server.authed(Method::POST, "/quotes").multipart(quote_form(b"keep me")).send().await?;
    let created = res.json::<Value>().await?;
    let id = created["id"].as_i64().expect("numeric id");
    let path = created["file_url"].as_str().expect("file_url path").to_string();

    let res = server.authed(Method::PUT, &format!("/quotes/{}", id)).json(&json!({ "amount": 6 })).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let record = server.authed(Method::GET, &format!("/quotes/{}", id)).send().await?.json::<Value>().await?;
    assert_eq!(record["file_url"], path.as_str());
    assert_eq!(record["amount"].as_f64(), Some(6.0));
    assert_eq!(server.authed(Method::GET, &path).send().await?.status(), StatusCode::OK);

    let res = server
        .authed(Method::PUT, &format!("/quotes/{}", id))
        .json(&json!({ "amount": 6, "file_url": "https://docs.example.com/q.pdf" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let record = server.authed(Method::GET, &format!("/quotes/{}", id)).send().await?.json::<Value>().await?;
    assert_eq!(record["file_url"], "https://docs.example.com/q.pdf");
    assert_eq!(server.authed(Method::GET, &path).send().await?.status(), StatusCode::NOT_FOUND);
    Ok(())
}
