use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use super::{optional_uuid_column, uuid_column};
use crate::database::query_service::Entity;
use crate::filter::query_filter::{TRANSLATION_CULTURE_NAME, TRANSLATION_DATA_SET_ID};
use crate::filter::{EqualsFilterHandler, FilterHandlerRegistry, SearchFilterHandler};

#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
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
    pub updated_by: Option<String>,
}

impl<'r> FromRow<'r, SqliteRow> for Translation {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: uuid_column(row, "id")?,
            internal_group_name: row.try_get("internal_group_name")?,
            resource_name: row.try_get("resource_name")?,
            translation_name: row.try_get("translation_name")?,
            culture_name: row.try_get("culture_name")?,
            content: row.try_get("content")?,
            data_set_id: optional_uuid_column(row, "data_set_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            created_by: row.try_get("created_by")?,
            updated_by: row.try_get("updated_by")?,
        })
    }
}

static FILTER_HANDLERS: Lazy<FilterHandlerRegistry> = Lazy::new(|| {
    FilterHandlerRegistry::new()
        .register(SearchFilterHandler::new(&[
            "internal_group_name",
            "resource_name",
            "translation_name",
            "content",
        ]))
        .register(EqualsFilterHandler::new(TRANSLATION_DATA_SET_ID, "data_set_id"))
        .register(EqualsFilterHandler::new(TRANSLATION_CULTURE_NAME, "culture_name"))
});

impl Entity for Translation {
    const TABLE: &'static str = "translations";
    const SORTABLE: &'static [(&'static str, &'static str)] = &[
        ("Id", "id"),
        ("InternalGroupName", "internal_group_name"),
        ("ResourceName", "resource_name"),
        ("TranslationName", "translation_name"),
        ("CultureName", "culture_name"),
        ("Content", "content"),
        ("DataSetId", "data_set_id"),
        ("CreatedAt", "created_at"),
        ("UpdatedAt", "updated_at"),
        ("CreatedBy", "created_by"),
    ];
    const SCOPE_COLUMN: Option<&'static str> = Some("data_set_id");

    fn filter_handlers() -> &'static FilterHandlerRegistry {
        &FILTER_HANDLERS
    }
}
