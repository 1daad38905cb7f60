use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
    Extension,
};
use serde::Deserialize;
use serde_json::Value;

use crate::auth::UserIdentity;
use crate::dispatch::{dispatch, ApiRequest, REQUEST_NAMES};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    #[serde(default)]
    pub request: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

/// Blank bodies decode as `null` so requests fall back to their defaults.
fn parse_body(raw: &[u8]) -> Result<Value, ApiError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(raw).map_err(|e| ApiError::invalid_json(format!("Invalid JSON in request body: {}", e)))
}

async fn run(state: AppState, identity: UserIdentity, name: &str, body: Value) -> ApiResult<Value> {
    let request = ApiRequest::parse(name, body)?;
    let ctx = state.context(identity);
    let result = dispatch(request, &ctx).await?;
    Ok(ApiResponse::success(result))
}

/// GET /api/query?request={Name}&body={urlencoded JSON}
pub async fn query_get(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> ApiResult<Value> {
    let Query(params) = params?;
    let name = params
        .request
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing 'request' query parameter."))?;
    let body = parse_body(params.body.as_deref().unwrap_or_default().as_bytes())?;
    run(state, identity, &name, body).await
}

/// POST /api/query/:name with a JSON body
pub async fn query_post(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(name): Path<String>,
    body: Bytes,
) -> ApiResult<Value> {
    let body = parse_body(&body)?;
    run(state, identity, &name, body).await
}

/// GET /api/requests
pub async fn requests_get() -> ApiResult<&'static [&'static str]> {
    Ok(ApiResponse::success(REQUEST_NAMES))
}
