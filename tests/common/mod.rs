#![allow(dead_code)]

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::Value;

use instance_manager::auth::{generate_jwt, Claims};
use instance_manager::config::AppConfig;
use instance_manager::database::DatabaseManager;
use instance_manager::server::{self, AppState};

pub const JWT_SECRET: &str = "integration-test-secret";
pub const API_KEY: &str = "integration-key-0001";
pub const ROOT_USER: &str = "root-admin";

/// A server on its own port with a private in-memory database.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.jwt_secret = JWT_SECRET.to_string();
    config.security.api_keys = vec![("portal".to_string(), API_KEY.to_string())];
    config.security.root_user_ids = vec![ROOT_USER.to_string()];
    config
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(test_config()).await
    }

    pub async fn spawn_with(mut config: AppConfig) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        config.api.port = port;
        let base_url = format!("http://127.0.0.1:{}", port);

        let db = DatabaseManager::in_memory().await?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
        let app = server::app(AppState::new(db, config));
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("test server stopped: {}", e);
            }
        });

        let server = Self { port, base_url, client: reqwest::Client::new() };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST /api/query/{name} as `token`'s user.
    pub async fn query(&self, token: &str, name: &str, body: Value) -> Result<(StatusCode, Value)> {
        let res = self
            .client
            .post(self.url(&format!("/api/query/{}", name)))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        let status = res.status();
        Ok((status, res.json().await?))
    }

    /// Like `query`, but asserts success and returns `data`.
    pub async fn ok(&self, token: &str, name: &str, body: Value) -> Result<Value> {
        let (status, json) = self.query(token, name, body).await?;
        anyhow::ensure!(status == StatusCode::OK, "{} returned {}: {}", name, status, json);
        Ok(json["data"].clone())
    }
}

pub fn token_for(user_id: &str) -> String {
    generate_jwt(&Claims::new(user_id, Some(user_id.to_string()), None, 1), JWT_SECRET).expect("token")
}

pub fn root_token() -> String {
    token_for(ROOT_USER)
}
