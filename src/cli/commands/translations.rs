use anyhow::{bail, Context};
use serde_json::json;
use url::Url;

use crate::cli::client::{unwrap_envelope, ApiClient};
use crate::cli::utils::{output_success, output_value};
use crate::cli::OutputFormat;

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub format: String,
    pub order_by: Option<String>,
    pub direction: Option<String>,
    pub search: Option<String>,
}

pub fn export_url(client: &ApiClient, options: &ExportOptions) -> anyhow::Result<Url> {
    let mut url = client.endpoint("/api/export/translations")?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("format", &options.format);
        if let Some(order_by) = &options.order_by {
            pairs.append_pair("orderBy", order_by);
        }
        if let Some(direction) = &options.direction {
            pairs.append_pair("orderDirection", direction);
        }
        if let Some(search) = &options.search {
            pairs.append_pair("filtering", &json!({ "SearchTerm": search }).to_string());
        }
    }
    Ok(url)
}

pub async fn export(
    client: &ApiClient,
    options: &ExportOptions,
    output: Option<&str>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let response = client.get(export_url(client, options)?).await?;
    if !response.status().is_success() {
        // Failures come back as the JSON error envelope.
        unwrap_envelope(response).await?;
        bail!("export failed");
    }
    let content = response.text().await.context("failed to read export body")?;

    match output {
        Some(path) => {
            std::fs::write(path, &content).with_context(|| format!("cannot write {}", path))?;
            output_success(
                output_format,
                &format!("Exported translations to {}", path),
                Some(json!({ "path": path, "bytes": content.len() })),
            )
        }
        None => {
            print!("{}", content);
            Ok(())
        }
    }
}

pub async fn import(
    client: &ApiClient,
    data_set_id: &str,
    file: &str,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(file).with_context(|| format!("cannot read {}", file))?;
    let url = client.endpoint(&format!("/api/import/translations/{}", data_set_id))?;
    let response = client.post_text(url, "text/csv", content).await?;
    let summary = unwrap_envelope(response).await?;

    match output_format {
        OutputFormat::Json => output_value(output_format, &summary),
        OutputFormat::Text => output_success(
            output_format,
            &format!(
                "Imported {}: {} created, {} updated",
                file,
                summary["Created"].as_u64().unwrap_or(0),
                summary["Updated"].as_u64().unwrap_or(0)
            ),
            None,
        ),
    }
}
