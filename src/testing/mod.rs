//! Fixtures for database-backed unit tests.

use std::sync::Arc;

use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::auth::authorization::{AuthorizationOptions, IdentityAuthorizationService};
use crate::auth::{Claims, UserIdentity};
use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::services::RequestContext;

/// A pool that never connects; enough for building SQL.
pub fn lazy_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .connect_lazy("sqlite::memory:")
        .expect("lazy sqlite pool")
}

pub fn user(id: &str) -> UserIdentity {
    UserIdentity::from_claims(&Claims::new(id, None, None, 1))
}

/// A migrated in-memory database plus the config the services read.
pub struct TestDb {
    pub db: DatabaseManager,
    pub config: AppConfig,
}

impl TestDb {
    pub async fn new() -> Self {
        let db = DatabaseManager::in_memory().await.expect("in-memory database");
        Self { db, config: AppConfig::development() }
    }

    pub fn pool(&self) -> &SqlitePool {
        self.db.pool()
    }

    /// Request context for `identity`; `roots` are treated as root users.
    pub fn context(&self, identity: UserIdentity, roots: &[&str]) -> RequestContext {
        let mut config = self.config.clone();
        config.security.root_user_ids = roots.iter().map(|s| s.to_string()).collect();
        let authorization = IdentityAuthorizationService::new(
            self.pool().clone(),
            identity.clone(),
            AuthorizationOptions::new(config.security.root_user_ids.iter().cloned()),
        );
        RequestContext::new(self.pool().clone(), identity, Arc::new(config), Arc::new(authorization))
    }

    pub fn system_context(&self) -> RequestContext {
        self.context(UserIdentity::system(), &[])
    }

    pub async fn project(&self, name: &str, parent: Option<Uuid>) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO project_instances (id, name, parent_project_id, created_at, created_by) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(name)
        .bind(parent.map(|p| p.to_string()))
        .bind(Utc::now())
        .bind("test")
        .execute(self.pool())
        .await
        .expect("insert project");
        id
    }

    pub async fn data_set(&self, name: &str, allowed: &[&str]) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO data_sets (id, name, allowed_identity_ids, created_at, created_by) VALUES (?, ?, ?, ?, ?)")
            .bind(id.to_string())
            .bind(name)
            .bind(allowed.join(","))
            .bind(Utc::now())
            .bind("test")
            .execute(self.pool())
            .await
            .expect("insert data set");
        id
    }

    pub async fn translation(
        &self,
        group: &str,
        resource: &str,
        name: &str,
        culture: &str,
        content: &str,
        data_set_id: Option<Uuid>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO translations (id, internal_group_name, resource_name, translation_name, culture_name, content, \
             data_set_id, created_at, created_by) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(group)
        .bind(resource)
        .bind(name)
        .bind(culture)
        .bind(content)
        .bind(data_set_id.map(|d| d.to_string()))
        .bind(Utc::now())
        .bind("test")
        .execute(self.pool())
        .await
        .expect("insert translation");
        id
    }
}
