use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

use super::identity::{AuthenticationMethod, UserIdentity};
use crate::database::models::IdentityList;
use crate::filter::Predicate;

#[derive(Debug, Error)]
pub enum AuthorizationError {
    #[error("Access to data set {0} is denied")]
    DataSetDenied(Uuid),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error("Corrupt data set id '{0}'")]
    InvalidId(String),
}

/// Datasets visible to the current caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSetAccess {
    /// Root access; no restriction applies.
    All,
    Only(Vec<Uuid>),
}

impl DataSetAccess {
    /// Row restriction on `column`, or `None` when everything is visible.
    pub fn predicate(&self, column: &str) -> Option<Predicate> {
        match self {
            DataSetAccess::All => None,
            DataSetAccess::Only(ids) => Some(Predicate::is_in(
                column,
                ids.iter().map(|id| Value::String(id.to_string())).collect(),
            )),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuthorizationOptions {
    pub root_user_ids: HashSet<String>,
}

impl AuthorizationOptions {
    pub fn new(root_user_ids: impl IntoIterator<Item = String>) -> Self {
        Self { root_user_ids: root_user_ids.into_iter().collect() }
    }
}

/// Row-level access decisions for one caller.
#[async_trait]
pub trait AuthorizationService: Send + Sync {
    async fn has_root_access(&self) -> Result<bool, AuthorizationError>;

    async fn can_access_data_set(&self, data_set_id: Uuid) -> Result<bool, AuthorizationError>;

    async fn accessible_data_set_ids(&self) -> Result<DataSetAccess, AuthorizationError>;

    async fn ensure_data_set_access(&self, data_set_id: Uuid) -> Result<(), AuthorizationError> {
        if self.can_access_data_set(data_set_id).await? {
            Ok(())
        } else {
            Err(AuthorizationError::DataSetDenied(data_set_id))
        }
    }
}

/// Decides from the caller's identity and each dataset's allow-list.
pub struct IdentityAuthorizationService {
    pool: SqlitePool,
    identity: UserIdentity,
    options: AuthorizationOptions,
}

impl IdentityAuthorizationService {
    pub fn new(pool: SqlitePool, identity: UserIdentity, options: AuthorizationOptions) -> Self {
        Self { pool, identity, options }
    }

    fn is_root(&self) -> bool {
        self.identity.authentication_method == AuthenticationMethod::System
            || self.options.root_user_ids.contains(&self.identity.user_id)
    }
}

#[async_trait]
impl AuthorizationService for IdentityAuthorizationService {
    async fn has_root_access(&self) -> Result<bool, AuthorizationError> {
        Ok(self.is_root())
    }

    async fn can_access_data_set(&self, data_set_id: Uuid) -> Result<bool, AuthorizationError> {
        if self.is_root() {
            return Ok(true);
        }

        let stored: Option<String> = sqlx::query_scalar("SELECT allowed_identity_ids FROM data_sets WHERE id = ?")
            .bind(data_set_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        Ok(match stored {
            None => false,
            Some(stored) => IdentityList::parse(&stored).admits(&self.identity.user_id),
        })
    }

    async fn accessible_data_set_ids(&self) -> Result<DataSetAccess, AuthorizationError> {
        if self.is_root() {
            return Ok(DataSetAccess::All);
        }

        // The allow-list is comma-joined text, so membership is checked here rather than in SQL.
        let rows = sqlx::query("SELECT id, allowed_identity_ids FROM data_sets")
            .fetch_all(&self.pool)
            .await?;

        let mut ids = Vec::new();
        for row in rows {
            let allowed = IdentityList::parse(&row.try_get::<String, _>("allowed_identity_ids")?);
            if allowed.admits(&self.identity.user_id) {
                let raw: String = row.try_get("id")?;
                ids.push(Uuid::parse_str(&raw).map_err(|_| AuthorizationError::InvalidId(raw))?);
            }
        }

        tracing::debug!("{} can access {} data set(s)", self.identity.to_log_string(), ids.len());
        Ok(DataSetAccess::Only(ids))
    }
}
