use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::header,
    response::{IntoResponse, Response},
    Extension,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::UserIdentity;
use crate::error::ApiError;
use crate::filter::FilteringParameters;
use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;
use crate::services::{
    export_translations, import_translations, ExportTranslationsQuery, ImportSummary, ImportTranslationsCommand,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportParams {
    pub format: Option<String>,
    pub order_by: Option<String>,
    pub order_direction: Option<String>,
    /// JSON-encoded `FilteringParameters`.
    pub filtering: Option<String>,
}

impl ExportParams {
    fn into_query(self) -> Result<ExportTranslationsQuery, ApiError> {
        let filtering = match self.filtering.as_deref().map(str::trim) {
            None | Some("") => FilteringParameters::default(),
            Some(raw) => serde_json::from_str(raw).map_err(|e| {
                tracing::debug!("Rejected export filters: {}", e);
                ApiError::invalid_json("Invalid JSON in filters parameter.")
            })?,
        };
        let mut query = ExportTranslationsQuery {
            order_by: self.order_by,
            order_direction: self.order_direction,
            filtering,
            ..Default::default()
        };
        if let Some(format) = self.format {
            query.format = format;
        }
        Ok(query)
    }
}

/// GET /api/export/translations - file download of the visible translations
pub async fn export_translations_get(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    params: Result<Query<ExportParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params?;
    let query = params.into_query()?;
    let ctx = state.context(identity);
    let file = export_translations(&ctx, &query).await?;

    let disposition = format!("attachment; filename=\"{}\"", file.file_name);
    Ok((
        [(header::CONTENT_TYPE, file.content_type), (header::CONTENT_DISPOSITION, disposition)],
        file.content,
    )
        .into_response())
}

/// POST /api/import/translations/:data_set_id - CSV body upserted into the dataset
pub async fn import_translations_post(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    data_set_id: Result<Path<Uuid>, PathRejection>,
    content: String,
) -> ApiResult<ImportSummary> {
    let Path(data_set_id) = data_set_id?;
    let ctx = state.context(identity);
    let command = ImportTranslationsCommand { data_set_id, content };
    let summary = import_translations(&ctx, &command).await?;

    if summary.created > 0 {
        Ok(ApiResponse::created(summary))
    } else {
        Ok(ApiResponse::success(summary))
    }
}
