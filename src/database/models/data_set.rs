use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use super::uuid_column;
use crate::database::query_service::Entity;
use crate::filter::{FilterHandlerRegistry, SearchFilterHandler};

#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub allowed_identity_ids: IdentityList,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub updated_by: Option<String>,
}

impl<'r> FromRow<'r, SqliteRow> for DataSet {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let allowed: String = row.try_get("allowed_identity_ids")?;
        Ok(Self {
            id: uuid_column(row, "id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            notes: row.try_get("notes")?,
            allowed_identity_ids: IdentityList::parse(&allowed),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            created_by: row.try_get("created_by")?,
            updated_by: row.try_get("updated_by")?,
        })
    }
}

/// Identity ids allowed to read a dataset, stored as comma-joined text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityList(Vec<String>);

impl IdentityList {
    pub fn new(ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut out: Vec<String> = Vec::new();
        for id in ids {
            let id = id.into().trim().to_string();
            if !id.is_empty() && !out.contains(&id) {
                out.push(id);
            }
        }
        Self(out)
    }

    /// Trims entries and drops empties.
    pub fn parse(stored: &str) -> Self {
        Self::new(stored.split(','))
    }

    pub fn to_stored(&self) -> String {
        self.0.join(",")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.iter().any(|i| i == id)
    }

    /// An empty list makes the dataset public.
    pub fn admits(&self, user_id: &str) -> bool {
        self.is_empty() || self.contains(user_id)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

static FILTER_HANDLERS: Lazy<FilterHandlerRegistry> =
    Lazy::new(|| FilterHandlerRegistry::new().register(SearchFilterHandler::new(&["name", "description", "notes"])));

impl Entity for DataSet {
    const TABLE: &'static str = "data_sets";
    const SORTABLE: &'static [(&'static str, &'static str)] = &[
        ("Id", "id"),
        ("Name", "name"),
        ("Description", "description"),
        ("Notes", "notes"),
        ("CreatedAt", "created_at"),
        ("UpdatedAt", "updated_at"),
        ("CreatedBy", "created_by"),
    ];
    const SCOPE_COLUMN: Option<&'static str> = Some("id");

    fn filter_handlers() -> &'static FilterHandlerRegistry {
        &FILTER_HANDLERS
    }
}
