use std::io;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::query_service::QueryOptions;
use crate::filter::{FilteringParameters, OrderingParameters};
use crate::services::translation_service::{TranslationDto, TranslationService};
use crate::services::{RequestContext, ServiceError};

/// Renders translations into a downloadable document.
pub trait TranslationExporter: Send + Sync {
    fn format(&self) -> &'static str;
    fn content_type(&self) -> &'static str;
    fn export(&self, translations: &[TranslationDto]) -> Result<String, csv::Error>;
}

pub struct CsvExporter;

const CSV_HEADER: [&str; 10] = [
    "Id",
    "InternalGroupName",
    "ResourceName",
    "TranslationName",
    "CultureName",
    "Content",
    "DataSetId",
    "CreatedAt",
    "UpdatedAt",
    "CreatedBy",
];

impl TranslationExporter for CsvExporter {
    fn format(&self) -> &'static str {
        "csv"
    }

    fn content_type(&self) -> &'static str {
        "text/csv"
    }

    fn export(&self, translations: &[TranslationDto]) -> Result<String, csv::Error> {
        // The header is written by hand so an empty export still carries it.
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::CRLF)
            .from_writer(Vec::new());
        writer.write_record(CSV_HEADER)?;
        for t in translations {
            writer.serialize(CsvRow::from(t))?;
        }

        let bytes = writer.into_inner().map_err(|e| csv::Error::from(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| csv::Error::from(io::Error::new(io::ErrorKind::InvalidData, e)))
    }
}

/// One exported line, in `CSV_HEADER` order.
#[derive(Serialize)]
struct CsvRow<'a> {
    id: Uuid,
    internal_group_name: &'a str,
    resource_name: &'a str,
    translation_name: &'a str,
    culture_name: &'a str,
    content: &'a str,
    data_set_id: Option<Uuid>,
    created_at: String,
    updated_at: Option<String>,
    created_by: &'a str,
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl<'a> From<&'a TranslationDto> for CsvRow<'a> {
    fn from(t: &'a TranslationDto) -> Self {
        Self {
            id: t.id,
            internal_group_name: &t.internal_group_name,
            resource_name: &t.resource_name,
            translation_name: &t.translation_name,
            culture_name: &t.culture_name,
            content: &t.content,
            data_set_id: t.data_set_id,
            created_at: timestamp(&t.created_at),
            updated_at: t.updated_at.as_ref().map(timestamp),
            created_by: &t.created_by,
        }
    }
}

/// Exporter registered for `format`, matched case-insensitively.
pub fn exporter_for(format: &str) -> Option<Box<dyn TranslationExporter>> {
    let exporters: [Box<dyn TranslationExporter>; 1] = [Box::new(CsvExporter)];
    exporters.into_iter().find(|e| e.format().eq_ignore_ascii_case(format))
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ExportTranslationsQuery {
    pub order_by: Option<String>,
    pub order_direction: Option<String>,
    pub filtering: FilteringParameters,
    pub format: String,
}

impl Default for ExportTranslationsQuery {
    fn default() -> Self {
        Self { order_by: None, order_direction: None, filtering: FilteringParameters::default(), format: "csv".into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExportedFile {
    pub file_name: String,
    pub content_type: String,
    pub content: String,
}

/// Exports every translation visible to the caller that matches the query.
pub async fn export_translations(
    ctx: &RequestContext,
    query: &ExportTranslationsQuery,
) -> Result<ExportedFile, ServiceError> {
    let exporter = exporter_for(&query.format)
        .ok_or_else(|| ServiceError::BadRequest(format!("Export format '{}' is not supported.", query.format)))?;

    let options = QueryOptions::new(
        query.filtering.clone(),
        OrderingParameters::new(query.order_by.clone(), query.order_direction.clone()),
    );
    let translations = TranslationService::new(ctx).list_all(&options).await?;
    tracing::info!("Exporting {} translation(s) as {}", translations.len(), exporter.format());

    Ok(ExportedFile {
        file_name: format!("translations_{}.{}", Utc::now().format("%Y%m%d%H%M%S"), exporter.format()),
        content_type: exporter.content_type().to_string(),
        content: exporter.export(&translations)?,
    })
}
