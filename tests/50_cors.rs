mod common;

use anyhow::Result;
use reqwest::StatusCode;

use instance_manager::config::Environment;

const ORIGIN: &str = "https://evil.example.com";

async fn allow_origin(server: &common::TestServer, origin: &str) -> Result<Option<String>> {
    let res = server.client.get(server.url("/health")).header("Origin", origin).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(res
        .headers()
        .get("access-control-allow-origin")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string))
}

#[tokio::test]
async fn development_allows_any_origin() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    assert_eq!(allow_origin(&server, ORIGIN).await?.as_deref(), Some("*"));
    Ok(())
}

#[tokio::test]
async fn production_without_origins_refuses_cross_origin() -> Result<()> {
    let mut config = common::test_config();
    config.environment = Environment::Production;
    config.security.cors_origins.clear();
    let server = common::TestServer::spawn_with(config).await?;

    assert_eq!(allow_origin(&server, ORIGIN).await?, None);
    Ok(())
}

#[tokio::test]
async fn production_allows_listed_origins_only() -> Result<()> {
    let mut config = common::test_config();
    config.environment = Environment::Production;
    config.security.cors_origins = vec!["https://app.example.com".to_string()];
    let server = common::TestServer::spawn_with(config).await?;

    assert_eq!(
        allow_origin(&server, "https://app.example.com").await?.as_deref(),
        Some("https://app.example.com")
    );
    assert_eq!(allow_origin(&server, ORIGIN).await?, None);
    Ok(())
}
