use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::{validate_jwt, UserIdentity};
use crate::config::SecurityConfig;
use crate::error::ApiError;
use crate::server::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Resolves the caller from a bearer token or API key and stores the
/// `UserIdentity` in the request extensions.
pub async fn identity_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let security = &state.config.security;
    let identity = match resolve_identity(request.headers(), security) {
        Ok(identity) => identity,
        Err(e) => return e.into_response(),
    };

    if security.require_authentication && !identity.is_authenticated() && request.uri().path().starts_with("/api") {
        return ApiError::unauthorized("Authentication is required").into_response();
    }

    tracing::debug!("Request identity: {}", identity.to_log_string());
    request.extensions_mut().insert(identity);
    next.run(request).await
}

/// Anonymous without credentials; an invalid token or unknown key is an error.
pub fn resolve_identity(headers: &HeaderMap, security: &SecurityConfig) -> Result<UserIdentity, ApiError> {
    if let Some(token) = extract_bearer(headers)? {
        let claims = validate_jwt(token, &security.jwt_secret).map_err(|e| {
            tracing::warn!("Rejected bearer token: {}", e);
            ApiError::unauthorized("Invalid or expired token")
        })?;
        return Ok(UserIdentity::from_claims(&claims));
    }

    if let Some(key) = headers.get(API_KEY_HEADER) {
        let key = key.to_str().map_err(|_| ApiError::unauthorized("Invalid API key header"))?;
        return security
            .api_keys
            .iter()
            .find(|(_, configured)| configured == key)
            .map(|(name, _)| UserIdentity::from_api_key(name, key))
            .ok_or_else(|| ApiError::unauthorized("Invalid API key"));
    }

    Ok(UserIdentity::anonymous())
}

fn extract_bearer(headers: &HeaderMap) -> Result<Option<&str>, ApiError> {
    let Some(header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header format"))?;

    match value.strip_prefix("Bearer ").or_else(|| value.strip_prefix("bearer ")) {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim())),
        _ => Err(ApiError::unauthorized("Authorization header must be in format: Bearer <token>")),
    }
}
