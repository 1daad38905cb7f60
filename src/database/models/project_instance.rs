use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use super::{optional_uuid_column, uuid_column};
use crate::database::query_service::Entity;
use crate::filter::{FilterHandlerRegistry, SearchFilterHandler};

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectInstance {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub main_host: Option<String>,
    pub notes: Option<String>,
    pub parent_project_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub updated_by: Option<String>,
}

impl<'r> FromRow<'r, SqliteRow> for ProjectInstance {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: uuid_column(row, "id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            main_host: row.try_get("main_host")?,
            notes: row.try_get("notes")?,
            parent_project_id: optional_uuid_column(row, "parent_project_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            created_by: row.try_get("created_by")?,
            updated_by: row.try_get("updated_by")?,
        })
    }
}

static FILTER_HANDLERS: Lazy<FilterHandlerRegistry> = Lazy::new(|| {
    FilterHandlerRegistry::new().register(SearchFilterHandler::new(&["name", "description", "main_host", "notes"]))
});

impl Entity for ProjectInstance {
    const TABLE: &'static str = "project_instances";
    const SORTABLE: &'static [(&'static str, &'static str)] = &[
        ("Id", "id"),
        ("Name", "name"),
        ("Description", "description"),
        ("MainHost", "main_host"),
        ("Notes", "notes"),
        ("ParentProjectId", "parent_project_id"),
        ("CreatedAt", "created_at"),
        ("UpdatedAt", "updated_at"),
        ("CreatedBy", "created_by"),
    ];

    fn filter_handlers() -> &'static FilterHandlerRegistry {
        &FILTER_HANDLERS
    }
}
