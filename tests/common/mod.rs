#![allow(dead_code)]

use std::path::PathBuf;

use agent_crm::app::build_app;
use agent_crm::config::AppConfig;
use agent_crm::database::{CredentialStore, NewPrincipal, Role};
use agent_crm::schema::Catalog;
use agent_crm::state::AppState;
use anyhow::{Context, Result};
use reqwest::{Method, RequestBuilder};

pub const ADMIN_KEY: &str = "crm_test_admin_key";

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub api_key: String,
    pub upload_root: PathBuf,
    pub state: AppState,
    client: reqwest::Client,
}

impl TestServer {
    /// Bare request, no credential attached.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{}", self.base_url, path))
    }

    /// Request carrying the seeded admin's API key.
    pub fn authed(&self, method: Method, path: &str) -> RequestBuilder {
        self.request(method, path).bearer_auth(&self.api_key)
    }

    pub fn crm_client(&self) -> agent_crm::client::CrmClient {
        agent_crm::client::CrmClient::new(self.base_url.clone()).with_api_key(self.api_key.clone())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.upload_root);
    }
}

/// Boot the real router on a free port over the in-memory store, with one
/// admin principal already registered.
pub async fn spawn() -> Result<TestServer> {
    spawn_with(AppConfig::development()).await
}

pub async fn spawn_with(config: AppConfig) -> Result<TestServer> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let base_url = format!("http://127.0.0.1:{}", port);
    let upload_root = std::env::temp_dir().join(format!("agent-crm-test-{}", uuid::Uuid::new_v4()));

    let state = AppState::in_memory(config, Catalog::builtin(), upload_root.clone());
    state
        .principals
        .register(NewPrincipal {
            name: "Test Admin".into(),
            email: "admin@example.com".into(),
            role: Role::Admin,
            api_key: ADMIN_KEY.into(),
        })
        .await?;

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .context("failed to bind test port")?;
    let app = build_app(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(TestServer {
        port,
        base_url,
        api_key: ADMIN_KEY.into(),
        upload_root,
        state,
        client: reqwest::Client::new(),
    })
}
