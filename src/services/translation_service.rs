use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::Translation;
use crate::database::query_service::{QueryOptions, QueryService};
use crate::filter::{PaginatedList, PaginatedQuery};
use crate::services::{RequestContext, ServiceError, Validator};

pub const NAME_MAX: usize = 200;
pub const CULTURE_NAME_MAX: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TranslationDto {
    pub id: Uuid,
    pub internal_group_name: String,
    pub resource_name: String,
    pub translation_name: String,
    pub culture_name: String,
    pub content: String,
    pub data_set_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_by: String,
}

impl From<Translation> for TranslationDto {
    fn from(t: Translation) -> Self {
        Self {
            id: t.id,
            internal_group_name: t.internal_group_name,
            resource_name: t.resource_name,
            translation_name: t.translation_name,
            culture_name: t.culture_name,
            content: t.content,
            data_set_id: t.data_set_id,
            created_at: t.created_at,
            updated_at: t.updated_at,
            created_by: t.created_by,
        }
    }
}

/// Lightweight projection for lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SimpleTranslationDto {
    pub id: Uuid,
    pub translation_name: String,
    pub culture_name: String,
    pub content: String,
}

impl From<Translation> for SimpleTranslationDto {
    fn from(t: Translation) -> Self {
        Self { id: t.id, translation_name: t.translation_name, culture_name: t.culture_name, content: t.content }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SaveTranslationCommand {
    pub id: Option<Uuid>,
    pub internal_group_name: String,
    pub resource_name: String,
    pub translation_name: String,
    pub culture_name: String,
    pub content: String,
    pub data_set_id: Option<Uuid>,
}

impl SaveTranslationCommand {
    pub(crate) fn validate(&self) -> Result<(), ServiceError> {
        let mut v = Validator::new();
        for (field, value) in [
            ("InternalGroupName", &self.internal_group_name),
            ("ResourceName", &self.resource_name),
            ("TranslationName", &self.translation_name),
        ] {
            v.required(field, value).max_len(field, Some(value.as_str()), NAME_MAX);
        }
        v.required("CultureName", &self.culture_name)
            .max_len("CultureName", Some(self.culture_name.as_str()), CULTURE_NAME_MAX);
        v.finish()
    }
}

pub struct TranslationService<'a> {
    ctx: &'a RequestContext,
}

impl<'a> TranslationService<'a> {
    pub fn new(ctx: &'a RequestContext) -> Self {
        Self { ctx }
    }

    fn query(&self) -> QueryService<'_, Translation> {
        QueryService::new(&self.ctx.pool, &self.ctx.config)
    }

    /// Runs the list pipeline; visibility is always limited to the caller's datasets.
    async fn page(&self, request: &PaginatedQuery) -> Result<PaginatedList<Translation>, ServiceError> {
        let access = self.ctx.data_set_access().await?;
        let query = self.query();
        let filter = query.prepare(&QueryOptions::new(request.filtering.clone(), request.ordering.clone()), &access)?;
        Ok(query.execute_paginated(filter, &request.pagination).await?)
    }

    pub async fn list(&self, request: &PaginatedQuery) -> Result<PaginatedList<TranslationDto>, ServiceError> {
        Ok(self.page(request).await?.map(TranslationDto::from))
    }

    pub async fn list_simple(
        &self,
        request: &PaginatedQuery,
    ) -> Result<PaginatedList<SimpleTranslationDto>, ServiceError> {
        Ok(self.page(request).await?.map(SimpleTranslationDto::from))
    }

    /// Every matching translation, unpaged.
    pub async fn list_all(&self, options: &QueryOptions) -> Result<Vec<TranslationDto>, ServiceError> {
        let access = self.ctx.data_set_access().await?;
        let query = self.query();
        let filter = query.prepare(options, &access)?;
        Ok(query.fetch_all(filter).await?.into_iter().map(TranslationDto::from).collect())
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<TranslationDto>, ServiceError> {
        let access = self.ctx.data_set_access().await?;
        Ok(self.query().get_by_id(id, &access).await?.map(TranslationDto::from))
    }

    pub async fn save(&self, command: &SaveTranslationCommand) -> Result<Uuid, ServiceError> {
        command.validate()?;
        if let Some(data_set_id) = command.data_set_id {
            self.ensure_data_set(data_set_id).await?;
        } else if !self.ctx.authorization.has_root_access().await? {
            return Err(ServiceError::Forbidden("Only root callers may save translations without a data set.".into()));
        }

        let now = Utc::now();
        match command.id.filter(|id| !id.is_nil()) {
            Some(id) => {
                if self.get_by_id(id).await?.is_none() {
                    return Err(ServiceError::NotFound(format!(
                        "Translation with Id {} not found or you don't have access to it.",
                        id
                    )));
                }

                sqlx::query(
                    "UPDATE translations SET internal_group_name = ?, resource_name = ?, translation_name = ?, \
                     culture_name = ?, content = ?, data_set_id = ?, updated_at = ?, updated_by = ? WHERE id = ?",
                )
                .bind(&command.internal_group_name)
                .bind(&command.resource_name)
                .bind(&command.translation_name)
                .bind(&command.culture_name)
                .bind(&command.content)
                .bind(command.data_set_id.map(|d| d.to_string()))
                .bind(now)
                .bind(self.ctx.actor())
                .bind(id.to_string())
                .execute(&self.ctx.pool)
                .await?;
                tracing::info!("Updated translation {}", id);
                Ok(id)
            }
            None => {
                let id = Uuid::new_v4();
                sqlx::query(
                    "INSERT INTO translations (id, internal_group_name, resource_name, translation_name, culture_name, \
                     content, data_set_id, created_at, created_by) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(id.to_string())
                .bind(&command.internal_group_name)
                .bind(&command.resource_name)
                .bind(&command.translation_name)
                .bind(&command.culture_name)
                .bind(&command.content)
                .bind(command.data_set_id.map(|d| d.to_string()))
                .bind(now)
                .bind(self.ctx.actor())
                .execute(&self.ctx.pool)
                .await?;
                tracing::info!("Created translation {}", id);
                Ok(id)
            }
        }
    }

    /// `false` when missing or not visible to the caller.
    pub async fn delete(&self, id: Uuid) -> Result<bool, ServiceError> {
        if self.get_by_id(id).await?.is_none() {
            return Ok(false);
        }
        sqlx::query("DELETE FROM translations WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.ctx.pool)
            .await?;
        tracing::info!("Deleted translation {}", id);
        Ok(true)
    }

    /// The dataset must exist and the caller must be allowed to write into it.
    pub(crate) async fn ensure_data_set(&self, data_set_id: Uuid) -> Result<(), ServiceError> {
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM data_sets WHERE id = ?")
            .bind(data_set_id.to_string())
            .fetch_one(&self.ctx.pool)
            .await?;
        if exists == 0 {
            return Err(ServiceError::invalid("DataSetId", format!("Data set {} does not exist.", data_set_id)));
        }
        self.ctx.authorization.ensure_data_set_access(data_set_id).await?;
        Ok(())
    }
}
