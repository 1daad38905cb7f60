use anyhow::Context;
use serde_json::Value;

use crate::cli::client::{unwrap_envelope, ApiClient};
use crate::cli::utils::output_value;
use crate::cli::OutputFormat;

/// Parses the optional JSON argument; absent means `{}`.
pub fn parse_body(body: Option<&str>) -> anyhow::Result<Value> {
    match body.map(str::trim) {
        None | Some("") => Ok(Value::Object(Default::default())),
        Some(raw) => serde_json::from_str(raw).context("request body is not valid JSON"),
    }
}

pub async fn send(client: &ApiClient, name: &str, body: Option<&str>, output_format: OutputFormat) -> anyhow::Result<()> {
    let body = parse_body(body)?;
    let data = client.send_request(name, &body).await?;
    output_value(output_format, &data)
}

pub async fn requests(client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    let response = client.get(client.endpoint("/api/requests")?).await?;
    let names = unwrap_envelope(response).await?;
    output_value(output_format, &names)
}

pub async fn health(client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    let response = client.get(client.endpoint("/health")?).await?;
    let status = response.status();
    let body: Value = response.json().await.context("health endpoint returned a non-JSON body")?;

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&body)?),
        OutputFormat::Text => {
            let database = body["data"]["database"].as_str().unwrap_or("unknown");
            println!("Server: {} ({})", if status.is_success() { "up" } else { "degraded" }, status.as_u16());
            println!("Database: {}", database);
        }
    }

    if !status.is_success() {
        anyhow::bail!("server reported unhealthy status {}", status.as_u16());
    }
    Ok(())
}
