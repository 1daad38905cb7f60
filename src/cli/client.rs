use anyhow::{bail, Context, Result};
use reqwest::{RequestBuilder, Response};
use serde_json::Value;
use url::Url;

/// Thin HTTP client for the Instance Manager API.
pub struct ApiClient {
    base_url: Url,
    http: reqwest::Client,
    token: Option<String>,
    api_key: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>, api_key: Option<String>) -> Result<Self> {
        let base_url = Url::parse(base_url).with_context(|| format!("invalid server URL '{}'", base_url))?;
        Ok(Self { base_url, http: reqwest::Client::new(), token, api_key })
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).with_context(|| format!("cannot build URL for {}", path))
    }

    /// `/api/query?request={name}&body={json}`, the web client's transport.
    pub fn query_url(&self, name: &str, body: &Value) -> Result<Url> {
        let mut url = self.endpoint("/api/query")?;
        url.query_pairs_mut()
            .append_pair("request", name)
            .append_pair("body", &body.to_string());
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        match &self.api_key {
            Some(key) => request.header("X-API-Key", key),
            None => request,
        }
    }

    pub async fn get(&self, url: Url) -> Result<Response> {
        tracing::debug!("GET {}", url);
        let response = self.authorize(self.http.get(url.clone())).send().await
            .with_context(|| format!("request to {} failed", url))?;
        Ok(response)
    }

    pub async fn post_text(&self, url: Url, content_type: &str, body: String) -> Result<Response> {
        tracing::debug!("POST {}", url);
        let response = self
            .authorize(self.http.post(url.clone()).header(reqwest::header::CONTENT_TYPE, content_type).body(body))
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;
        Ok(response)
    }

    /// Sends a named request and returns the `data` of the success envelope.
    pub async fn send_request(&self, name: &str, body: &Value) -> Result<Value> {
        let response = self.get(self.query_url(name, body)?).await?;
        unwrap_envelope(response).await
    }
}

/// `data` of a success envelope, or the server's error message.
pub async fn unwrap_envelope(response: Response) -> Result<Value> {
    let status = response.status();
    let body: Value = response.json().await.with_context(|| format!("server returned {} with a non-JSON body", status))?;

    if !status.is_success() {
        let message = body.get("message").and_then(Value::as_str).unwrap_or("request failed");
        let code = body.get("code").and_then(Value::as_str).unwrap_or("UNKNOWN");
        bail!("{} ({}, {})", message, status.as_u16(), code);
    }
    Ok(body.get("data").cloned().unwrap_or(Value::Null))
}
