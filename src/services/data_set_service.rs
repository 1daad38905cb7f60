use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, Sqlite, Transaction};
use uuid::Uuid;

use crate::auth::DataSetAccess;
use crate::database::models::{DataSet, IdentityList};
use crate::database::query_builder::bind_param_query;
use crate::database::query_service::{QueryOptions, QueryService};
use crate::filter::{PaginatedList, PaginatedQuery, Predicate};
use crate::services::{RequestContext, ServiceError, Validator};

pub const NAME_MAX: usize = 200;
pub const DESCRIPTION_MAX: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataSetDto {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub allowed_identity_ids: Vec<String>,
    pub included_data_set_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_by: String,
}

impl DataSetDto {
    fn from_entity(ds: DataSet, included_data_set_ids: Vec<Uuid>) -> Self {
        Self {
            id: ds.id,
            name: ds.name,
            description: ds.description,
            notes: ds.notes,
            allowed_identity_ids: ds.allowed_identity_ids.into_vec(),
            included_data_set_ids,
            created_at: ds.created_at,
            updated_at: ds.updated_at,
            created_by: ds.created_by,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SaveDataSetCommand {
    pub id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub allowed_identity_ids: Vec<String>,
    pub included_data_set_ids: Vec<Uuid>,
}

pub struct DataSetService<'a> {
    ctx: &'a RequestContext,
}

impl<'a> DataSetService<'a> {
    pub fn new(ctx: &'a RequestContext) -> Self {
        Self { ctx }
    }

    fn query(&self) -> QueryService<'_, DataSet> {
        QueryService::new(&self.ctx.pool, &self.ctx.config)
    }

    pub async fn list(&self, request: &PaginatedQuery) -> Result<PaginatedList<DataSetDto>, ServiceError> {
        let access = self.ctx.data_set_access().await?;
        let query = self.query();
        let filter = query.prepare(&QueryOptions::new(request.filtering.clone(), request.ordering.clone()), &access)?;
        let page = query.execute_paginated(filter, &request.pagination).await?;

        let ids: Vec<Uuid> = page.items.iter().map(|ds| ds.id).collect();
        let mut includes = self.includes_of(&ids).await?;
        Ok(page.map(|ds| {
            let included = includes.remove(&ds.id).unwrap_or_default();
            DataSetDto::from_entity(ds, included)
        }))
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<DataSetDto>, ServiceError> {
        let access = self.ctx.data_set_access().await?;
        let Some(ds) = self.query().get_by_id(id, &access).await? else {
            return Ok(None);
        };
        let included = self.includes_of(&[id]).await?.remove(&id).unwrap_or_default();
        Ok(Some(DataSetDto::from_entity(ds, included)))
    }

    pub async fn save(&self, command: &SaveDataSetCommand) -> Result<Uuid, ServiceError> {
        let existing_id = command.id.filter(|id| !id.is_nil());
        let included = dedup(&command.included_data_set_ids);
        self.validate(command, existing_id, &included).await?;

        if let Some(id) = existing_id {
            let access = self.ctx.data_set_access().await?;
            if self.query().get_by_id(id, &access).await?.is_none() {
                return Err(ServiceError::NotFound(format!("DataSet with Id {} not found.", id)));
            }
        }

        let allowed = IdentityList::new(command.allowed_identity_ids.iter().cloned()).to_stored();
        let now = Utc::now();
        // Checks above use the pool; an in-memory pool has a single connection.
        let mut tx = self.ctx.pool.begin().await?;

        let id = match existing_id {
            Some(id) => {
                sqlx::query(
                    "UPDATE data_sets SET name = ?, description = ?, notes = ?, allowed_identity_ids = ?, \
                     updated_at = ?, updated_by = ? WHERE id = ?",
                )
                .bind(&command.name)
                .bind(&command.description)
                .bind(&command.notes)
                .bind(&allowed)
                .bind(now)
                .bind(self.ctx.actor())
                .bind(id.to_string())
                .execute(&mut *tx)
                .await?;

                sync_includes(&mut tx, id, &included).await?;
                tracing::info!("Updated data set {}", id);
                id
            }
            None => {
                let id = Uuid::new_v4();
                sqlx::query(
                    "INSERT INTO data_sets (id, name, description, notes, allowed_identity_ids, created_at, created_by) \
                     VALUES (?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(id.to_string())
                .bind(&command.name)
                .bind(&command.description)
                .bind(&command.notes)
                .bind(&allowed)
                .bind(now)
                .bind(self.ctx.actor())
                .execute(&mut *tx)
                .await?;

                sync_includes(&mut tx, id, &included).await?;
                tracing::info!("Created data set {} ({})", id, command.name);
                id
            }
        };

        tx.commit().await?;
        Ok(id)
    }

    /// Attached translations are detached, not deleted.
    pub async fn delete(&self, id: Uuid) -> Result<bool, ServiceError> {
        let access = self.ctx.data_set_access().await?;
        if self.query().get_by_id(id, &access).await?.is_none() {
            return Ok(false);
        }

        sqlx::query("DELETE FROM data_sets WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.ctx.pool)
            .await?;
        tracing::info!("Deleted data set {}", id);
        Ok(true)
    }

    async fn validate(
        &self,
        command: &SaveDataSetCommand,
        id: Option<Uuid>,
        included: &[Uuid],
    ) -> Result<(), ServiceError> {
        let mut v = Validator::new();
        v.required("Name", &command.name)
            .max_len("Name", Some(command.name.as_str()), NAME_MAX)
            .max_len("Description", command.description.as_deref(), DESCRIPTION_MAX);

        if id.is_some_and(|id| included.contains(&id)) {
            v.error("IncludedDataSetIds", "A data set cannot include itself.");
        } else if !included.is_empty() {
            let visible = self.visible_ids(included).await?;
            if let Some(missing) = included.iter().find(|i| !visible.contains(i)) {
                v.error("IncludedDataSetIds", format!("Included data set {} does not exist.", missing));
            }
        }
        v.finish()
    }

    /// Ids from `ids` that exist and are visible to the caller.
    async fn visible_ids(&self, ids: &[Uuid]) -> Result<Vec<Uuid>, ServiceError> {
        let access = self.ctx.data_set_access().await?;
        let ids: Vec<&Uuid> = match &access {
            DataSetAccess::All => ids.iter().collect(),
            DataSetAccess::Only(allowed) => ids.iter().filter(|id| allowed.contains(*id)).collect(),
        };
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let predicate = Predicate::is_in("id", ids.iter().map(|id| id.to_string().into()).collect());
        let sql = format!("SELECT id FROM data_sets WHERE {}", predicate.sql);
        let mut q = sqlx::query(&sql);
        for p in predicate.params.iter() {
            q = bind_param_query(q, p);
        }
        let rows = q.fetch_all(&self.ctx.pool).await?;
        rows.iter()
            .map(|row| crate::database::models::uuid_column(row, "id").map_err(ServiceError::from))
            .collect()
    }

    /// Included dataset ids per parent, in insertion order.
    async fn includes_of(&self, parents: &[Uuid]) -> Result<HashMap<Uuid, Vec<Uuid>>, ServiceError> {
        let mut out: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        if parents.is_empty() {
            return Ok(out);
        }

        let predicate = Predicate::is_in(
            "parent_data_set_id",
            parents.iter().map(|id| id.to_string().into()).collect(),
        );
        let sql = format!(
            "SELECT parent_data_set_id, included_data_set_id FROM data_set_includes WHERE {} \
             ORDER BY created_at ASC, rowid ASC",
            predicate.sql
        );
        let mut q = sqlx::query(&sql);
        for p in predicate.params.iter() {
            q = bind_param_query(q, p);
        }
        for row in q.fetch_all(&self.ctx.pool).await? {
            let parent = crate::database::models::uuid_column(&row, "parent_data_set_id")?;
            let included = crate::database::models::uuid_column(&row, "included_data_set_id")?;
            out.entry(parent).or_default().push(included);
        }
        Ok(out)
    }
}

fn dedup(ids: &[Uuid]) -> Vec<Uuid> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(*id);
        }
    }
    out
}

/// Removes includes no longer listed and adds the new ones.
async fn sync_includes(tx: &mut Transaction<'_, Sqlite>, parent: Uuid, wanted: &[Uuid]) -> Result<(), ServiceError> {
    let rows = sqlx::query("SELECT included_data_set_id FROM data_set_includes WHERE parent_data_set_id = ?")
        .bind(parent.to_string())
        .fetch_all(&mut **tx)
        .await?;
    let current: Vec<String> = rows
        .iter()
        .map(|r| r.try_get::<String, _>("included_data_set_id"))
        .collect::<Result<_, _>>()?;

    for stale in current.iter().filter(|c| !wanted.iter().any(|w| &w.to_string() == *c)) {
        sqlx::query("DELETE FROM data_set_includes WHERE parent_data_set_id = ? AND included_data_set_id = ?")
            .bind(parent.to_string())
            .bind(stale)
            .execute(&mut **tx)
            .await?;
    }

    let now = Utc::now();
    for added in wanted.iter().filter(|w| !current.contains(&w.to_string())) {
        sqlx::query(
            "INSERT INTO data_set_includes (parent_data_set_id, included_data_set_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(parent.to_string())
        .bind(added.to_string())
        .bind(now)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilteringParameters, PaginationParameters};
    use crate::testing::{self, TestDb};

    fn command(name: &str) -> SaveDataSetCommand {
        SaveDataSetCommand { name: name.to_string(), ..Default::default() }
    }

    #[tokio::test]
    async fn saves_allow_list_and_includes() {
        let db = TestDb::new().await;
        let ctx = db.system_context();
        let service = DataSetService::new(&ctx);

        let base = service.save(&command("Base")).await.unwrap();
        let extra = service.save(&command("Extra")).await.unwrap();

        let mut composite = command("Composite");
        composite.allowed_identity_ids = vec![" alice ".into(), "bob".into(), "alice".into()];
        composite.included_data_set_ids = vec![base, extra, base];
        let id = service.save(&composite).await.unwrap();

        let dto = service.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(dto.allowed_identity_ids, vec!["alice".to_string(), "bob".to_string()]);
        assert_eq!(dto.included_data_set_ids, vec![base, extra]);
        assert_eq!(dto.created_by, "system");

        composite.id = Some(id);
        composite.included_data_set_ids = vec![extra];
        service.save(&composite).await.unwrap();
        let dto = service.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(dto.included_data_set_ids, vec![extra]);
        assert!(dto.updated_at.is_some());
    }

    #[tokio::test]
    async fn rejects_self_and_unknown_includes() {
        let db = TestDb::new().await;
        let ctx = db.system_context();
        let service = DataSetService::new(&ctx);
        let id = service.save(&command("Self")).await.unwrap();

        let mut own = command("Self");
        own.id = Some(id);
        own.included_data_set_ids = vec![id];
        assert!(matches!(service.save(&own).await, Err(ServiceError::Validation { .. })));

        let mut unknown = command("Other");
        unknown.included_data_set_ids = vec![Uuid::new_v4()];
        assert!(matches!(service.save(&unknown).await, Err(ServiceError::Validation { .. })));
    }

    #[tokio::test]
    async fn hidden_includes_look_like_missing_ones() {
        let db = TestDb::new().await;
        let ops = db.data_set("Ops", &["carol"]).await;
        let shared = db.data_set("Shared", &[]).await;
        let alice = db.context(testing::user("alice"), &[]);
        let service = DataSetService::new(&alice);

        let include_error = |result: Result<Uuid, ServiceError>, id: Uuid| match result {
            Err(ServiceError::Validation { field_errors, .. }) => {
                field_errors["IncludedDataSetIds"].replace(&id.to_string(), "<id>")
            }
            other => panic!("expected validation error, got {:?}", other),
        };

        let mut hidden = command("Mine");
        hidden.included_data_set_ids = vec![shared, ops];
        let hidden_msg = include_error(service.save(&hidden).await, ops);

        let missing_id = Uuid::new_v4();
        let mut missing = command("Mine");
        missing.included_data_set_ids = vec![missing_id];
        let missing_msg = include_error(service.save(&missing).await, missing_id);
        assert_eq!(hidden_msg, missing_msg);
        assert_eq!(hidden_msg, "Included data set <id> does not exist.");

        let mut visible = command("Mine");
        visible.included_data_set_ids = vec![shared];
        assert!(service.save(&visible).await.is_ok());

        let carol = db.context(testing::user("carol"), &[]);
        let mut own = command("Carol's");
        own.included_data_set_ids = vec![ops];
        assert!(DataSetService::new(&carol).save(&own).await.is_ok());
    }

    #[tokio::test]
    async fn list_is_limited_to_accessible_sets() {
        let db = TestDb::new().await;
        db.data_set("Public", &[]).await;
        db.data_set("Alice", &["alice"]).await;
        db.data_set("Bob", &["bob"]).await;

        let ctx = db.context(testing::user("alice"), &[]);
        let request = PaginatedQuery {
            pagination: PaginationParameters::new(1, 10),
            filtering: FilteringParameters::default(),
            ..Default::default()
        };
        let page = DataSetService::new(&ctx).list(&request).await.unwrap();
        let mut names: Vec<_> = page.items.iter().map(|d| d.name.clone()).collect();
        names.sort();
        assert_eq!(names, vec!["Alice", "Public"]);

        let root = db.context(testing::user("admin"), &["admin"]);
        assert_eq!(DataSetService::new(&root).list(&request).await.unwrap().total_items, 3);
    }

    #[tokio::test]
    async fn inaccessible_sets_cannot_be_changed() {
        let db = TestDb::new().await;
        let secret = db.data_set("Secret", &["alice"]).await;
        let ctx = db.context(testing::user("bob"), &[]);
        let service = DataSetService::new(&ctx);

        assert!(service.get_by_id(secret).await.unwrap().is_none());
        assert!(!service.delete(secret).await.unwrap());
        let mut update = command("Hijacked");
        update.id = Some(secret);
        assert!(matches!(service.save(&update).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_detaches_translations() {
        let db = TestDb::new().await;
        let ds = db.data_set("Shared", &[]).await;
        let other = db.data_set("Other", &[]).await;
        let tr = db.translation("G", "R", "N", "en-US", "x", Some(ds)).await;
        sqlx::query("INSERT INTO data_set_includes (parent_data_set_id, included_data_set_id, created_at) VALUES (?, ?, ?)")
            .bind(other.to_string())
            .bind(ds.to_string())
            .bind(Utc::now())
            .execute(db.pool())
            .await
            .unwrap();

        let ctx = db.system_context();
        assert!(DataSetService::new(&ctx).delete(ds).await.unwrap());

        let data_set_id: Option<String> = sqlx::query_scalar("SELECT data_set_id FROM translations WHERE id = ?")
            .bind(tr.to_string())
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert!(data_set_id.is_none());
        let includes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM data_set_includes")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(includes, 0);
    }
}
