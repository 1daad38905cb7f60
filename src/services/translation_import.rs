use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::translation_service::{SaveTranslationCommand, TranslationService};
use crate::services::{RequestContext, ServiceError};

const COLUMNS: [&str; 5] = ["InternalGroupName", "ResourceName", "TranslationName", "CultureName", "Content"];

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImportTranslationsCommand {
    pub data_set_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImportSummary {
    pub created: u32,
    pub updated: u32,
}

/// One data row; columns beyond the required ones are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CsvRow {
    internal_group_name: String,
    resource_name: String,
    translation_name: String,
    culture_name: String,
    content: String,
}

/// Maps required headers onto their canonical spelling so rows deserialize by name.
fn canonical_headers(headers: &csv::StringRecord) -> Result<csv::StringRecord, ServiceError> {
    let canonical: csv::StringRecord = headers
        .iter()
        .map(|h| {
            let h = h.trim();
            match COLUMNS.iter().find(|c| c.eq_ignore_ascii_case(h)) {
                Some(column) => column.to_string(),
                None => h.to_string(),
            }
        })
        .collect();

    for column in COLUMNS {
        if !canonical.iter().any(|h| h == column) {
            return Err(ServiceError::BadRequest(format!("Missing required column '{}'.", column)));
        }
    }
    Ok(canonical)
}

fn parse_rows(content: &str, data_set_id: Uuid) -> Result<Vec<SaveTranslationCommand>, ServiceError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(content.as_bytes());

    let headers = reader.headers().map_err(|e| ServiceError::BadRequest(format!("Invalid CSV: {}", e)))?;
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(ServiceError::BadRequest("The file is empty.".into()));
    }
    let headers = canonical_headers(headers)?;

    let mut commands = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ServiceError::BadRequest(format!("Invalid CSV: {}", e)))?;
        let line = record.position().map_or(0, |p| p.line());
        let row: CsvRow = record
            .deserialize(Some(&headers))
            .map_err(|e| ServiceError::BadRequest(format!("Row {}: {}", line, e)))?;

        let command = SaveTranslationCommand {
            id: None,
            internal_group_name: row.internal_group_name.trim().to_string(),
            resource_name: row.resource_name.trim().to_string(),
            translation_name: row.translation_name.trim().to_string(),
            culture_name: row.culture_name.trim().to_string(),
            content: row.content,
            data_set_id: Some(data_set_id),
        };
        command.validate().map_err(|e| ServiceError::BadRequest(format!("Row {}: {}", line, e)))?;
        commands.push(command);
    }
    Ok(commands)
}

/// Upserts every row into the dataset, keyed by group, resource, name and culture.
pub async fn import_translations(
    ctx: &RequestContext,
    command: &ImportTranslationsCommand,
) -> Result<ImportSummary, ServiceError> {
    TranslationService::new(ctx).ensure_data_set(command.data_set_id).await?;
    let rows = parse_rows(&command.content, command.data_set_id)?;

    let data_set_id = command.data_set_id.to_string();
    let now = Utc::now();
    let mut summary = ImportSummary::default();
    let mut tx = ctx.pool.begin().await?;

    for row in &rows {
        let existing: Option<String> = sqlx::query_scalar(
            "SELECT id FROM translations WHERE data_set_id = ? AND internal_group_name = ? AND resource_name = ? \
             AND translation_name = ? AND culture_name = ?",
        )
        .bind(&data_set_id)
        .bind(&row.internal_group_name)
        .bind(&row.resource_name)
        .bind(&row.translation_name)
        .bind(&row.culture_name)
        .fetch_optional(&mut *tx)
        .await?;

        match existing {
            Some(id) => {
                sqlx::query("UPDATE translations SET content = ?, updated_at = ?, updated_by = ? WHERE id = ?")
                    .bind(&row.content)
                    .bind(now)
                    .bind(ctx.actor())
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                summary.updated += 1;
            }
            None => {
                sqlx::query(
                    "INSERT INTO translations (id, internal_group_name, resource_name, translation_name, \
                     culture_name, content, data_set_id, created_at, created_by) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(Uuid::new_v4().to_string())
                .bind(&row.internal_group_name)
                .bind(&row.resource_name)
                .bind(&row.translation_name)
                .bind(&row.culture_name)
                .bind(&row.content)
                .bind(&data_set_id)
                .bind(now)
                .bind(ctx.actor())
                .execute(&mut *tx)
                .await?;
                summary.created += 1;
            }
        }
    }

    tx.commit().await?;
    tracing::info!(
        "Imported translations into data set {}: {} created, {} updated",
        command.data_set_id,
        summary.created,
        summary.updated
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, TestDb};

    const FILE: &str = "content,culturename,TranslationName,ResourceName,InternalGroupName\r\n\
                        Save,en-US,Save,Buttons,Common\r\n\
                        \"Speichern, jetzt\",de-DE,Save,Buttons,Common\r\n";

    #[test]
    fn headers_are_matched_case_insensitively_in_any_order() {
        let rows = parse_rows(FILE, Uuid::nil()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].content, "Speichern, jetzt");
        assert_eq!(rows[1].culture_name, "de-DE");
        assert_eq!(rows[0].internal_group_name, "Common");
    }

    #[test]
    fn reports_missing_columns_and_bad_rows() {
        match parse_rows("Content,CultureName\r\nx,en\r\n", Uuid::nil()) {
            Err(ServiceError::BadRequest(msg)) => assert_eq!(msg, "Missing required column 'InternalGroupName'."),
            other => panic!("unexpected {:?}", other),
        }
        let bad = "InternalGroupName,ResourceName,TranslationName,CultureName,Content\r\nG,R,,en,x\r\n";
        match parse_rows(bad, Uuid::nil()) {
            Err(ServiceError::BadRequest(msg)) => assert!(msg.starts_with("Row 2:")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(parse_rows("", Uuid::nil()), Err(ServiceError::BadRequest(_))));

        let ragged = "InternalGroupName,ResourceName,TranslationName,CultureName,Content\r\nG,R,N\r\n";
        assert!(matches!(parse_rows(ragged, Uuid::nil()), Err(ServiceError::BadRequest(_))));
    }

    #[test]
    fn handles_bom_blank_lines_and_multiline_quotes() {
        let file = "\u{feff}InternalGroupName,ResourceName,TranslationName,CultureName,Content,Id\r\n\
                    \r\n\
                    Common,Help,Intro,en-US,\"Line one\nline \"\"two\"\"\",ignored\n\
                    Common,Help,Outro,en-US,Bye,";
        let rows = parse_rows(file, Uuid::nil()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].internal_group_name, "Common");
        assert_eq!(rows[0].content, "Line one\nline \"two\"");
        assert_eq!(rows[1].translation_name, "Outro");
        assert_eq!(rows[1].content, "Bye");
    }

    #[test]
    fn exported_files_import_back() {
        use crate::services::translation_export::{CsvExporter, TranslationExporter};
        use crate::services::TranslationDto;

        let dto = TranslationDto {
            id: Uuid::new_v4(),
            internal_group_name: "Common".into(),
            resource_name: "Buttons".into(),
            translation_name: "Greeting".into(),
            culture_name: "en-US".into(),
            content: "Hello, \"friend\"".into(),
            data_set_id: None,
            created_at: Utc::now(),
            updated_at: None,
            created_by: "system".into(),
        };
        let content = CsvExporter.export(std::slice::from_ref(&dto)).unwrap();
        let rows = parse_rows(&content, Uuid::nil()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].content, dto.content);
        assert_eq!(rows[0].translation_name, "Greeting");
    }

    #[tokio::test]
    async fn upserts_by_natural_key() {
        let db = TestDb::new().await;
        let ds = db.data_set("Shared", &[]).await;
        db.translation("Common", "Buttons", "Save", "en-US", "Old", Some(ds)).await;
        let ctx = db.context(testing::user("alice"), &[]);

        let summary = import_translations(&ctx, &ImportTranslationsCommand { data_set_id: ds, content: FILE.into() })
            .await
            .unwrap();
        assert_eq!(summary, ImportSummary { created: 1, updated: 1 });

        let content: String = sqlx::query_scalar(
            "SELECT content FROM translations WHERE data_set_id = ? AND culture_name = 'en-US'",
        )
        .bind(ds.to_string())
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(content, "Save");
    }

    #[tokio::test]
    async fn requires_data_set_access() {
        let db = TestDb::new().await;
        let ds = db.data_set("Private", &["alice"]).await;
        let ctx = db.context(testing::user("bob"), &[]);
        let result = import_translations(&ctx, &ImportTranslationsCommand { data_set_id: ds, content: FILE.into() }).await;
        assert!(matches!(result, Err(ServiceError::Authorization(_))));
    }
}
