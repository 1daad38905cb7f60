use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::{AuthorizationService, DataSetAccess, UserIdentity};
use crate::config::AppConfig;
use crate::services::ServiceError;

/// Everything a request handler needs: the pool, the caller and their access.
#[derive(Clone)]
pub struct RequestContext {
    pub pool: SqlitePool,
    pub identity: UserIdentity,
    pub config: Arc<AppConfig>,
    pub authorization: Arc<dyn AuthorizationService>,
}

impl RequestContext {
    pub fn new(
        pool: SqlitePool,
        identity: UserIdentity,
        config: Arc<AppConfig>,
        authorization: Arc<dyn AuthorizationService>,
    ) -> Self {
        Self { pool, identity, config, authorization }
    }

    /// Recorded in `created_by` / `updated_by`.
    pub fn actor(&self) -> &str {
        &self.identity.user_id
    }

    pub async fn data_set_access(&self) -> Result<DataSetAccess, ServiceError> {
        Ok(self.authorization.accessible_data_set_ids().await?)
    }
}
