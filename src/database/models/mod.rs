pub mod data_set;
pub mod project_instance;
pub mod translation;

pub use data_set::{DataSet, IdentityList};
pub use project_instance::ProjectInstance;
pub use translation::Translation;

use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

/// Ids are stored as hyphenated TEXT.
pub(crate) fn uuid_column(row: &SqliteRow, column: &str) -> Result<Uuid, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    parse_uuid(column, &raw)
}

pub(crate) fn optional_uuid_column(row: &SqliteRow, column: &str) -> Result<Option<Uuid>, sqlx::Error> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|s| parse_uuid(column, &s)).transpose()
}

fn parse_uuid(column: &str, raw: &str) -> Result<Uuid, sqlx::Error> {
    Uuid::parse_str(raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}
