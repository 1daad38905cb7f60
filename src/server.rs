use std::sync::Arc;

use axum::{
    http::{HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    map_response_body::MapResponseBodyLayer,
    trace::TraceLayer,
};

use crate::auth::authorization::AuthorizationOptions;
use crate::auth::{IdentityAuthorizationService, UserIdentity};
use crate::config::{AppConfig, Environment};
use crate::database::DatabaseManager;
use crate::handlers;
use crate::middleware::{identity::API_KEY_HEADER, identity_middleware};
use crate::services::RequestContext;

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseManager,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(db: DatabaseManager, config: AppConfig) -> Self {
        Self { db, config: Arc::new(config) }
    }

    /// Request-scoped context for `identity`.
    pub fn context(&self, identity: UserIdentity) -> RequestContext {
        let options = AuthorizationOptions::new(self.config.security.root_user_ids.iter().cloned());
        let authorization = IdentityAuthorizationService::new(self.db.pool().clone(), identity.clone(), options);
        RequestContext::new(self.db.pool().clone(), identity, self.config.clone(), Arc::new(authorization))
    }
}

pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let body_limit = state.config.api.max_request_size_bytes;

    Router::new()
        // Public
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        // Named requests
        .route("/api/query", get(handlers::query_get))
        .route("/api/query/:name", post(handlers::query_post))
        .route("/api/requests", get(handlers::requests_get))
        // Translation files
        .route("/api/export/translations", get(handlers::export_translations_get))
        .route("/api/import/translations/:data_set_id", post(handlers::import_translations_post))
        .layer(from_fn_with_state(state.clone(), identity_middleware))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(MapResponseBodyLayer::new(axum::body::Body::new))
                .layer(RequestBodyLimitLayer::new(body_limit)),
        )
        .with_state(state)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if matches!(config.environment, Environment::Development) {
        return CorsLayer::permissive();
    }
    if config.security.cors_origins.is_empty() {
        tracing::warn!("No CORS origins configured; cross-origin requests are refused");
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            HeaderName::from_static(API_KEY_HEADER),
        ])
        .expose_headers([axum::http::header::CONTENT_DISPOSITION])
}

/// Binds `0.0.0.0:{port}` and serves until the process stops.
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let bind_addr = format!("0.0.0.0:{}", state.config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Instance Manager listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await?;
    Ok(())
}
