//! Routes named requests from the web client to the module services.

pub mod request;

pub use request::{ApiRequest, REQUEST_NAMES};

use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::services::{
    export_translations, import_translations, DataSetService, ProjectInstanceService, RequestContext, ServiceError,
    TranslationService,
};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Unknown request type '{0}'")]
    UnknownRequest(String),

    #[error("Invalid body for {name}: {source}")]
    InvalidBody {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Failed to serialize response: {0}")]
    Serialization(serde_json::Error),
}

fn to_json<T: Serialize>(value: T) -> Result<Value, DispatchError> {
    serde_json::to_value(value).map_err(DispatchError::Serialization)
}

/// Runs `request` for the caller in `ctx`, logging its start and outcome.
pub async fn dispatch(request: ApiRequest, ctx: &RequestContext) -> Result<Value, DispatchError> {
    let name = request.name();
    let identity = &ctx.identity;
    tracing::info!(
        "Executing request: {} | User: {} | Auth: {} | UserId: {}",
        name,
        identity.display_name.as_deref().unwrap_or(&identity.user_id),
        identity.authentication_method,
        identity.user_id
    );

    let started = Instant::now();
    let result = handle(request, ctx).await;
    let elapsed = started.elapsed().as_millis();

    match &result {
        Ok(_) => tracing::info!("Completed request: {} in {}ms", name, elapsed),
        Err(e) => tracing::warn!("Request failed: {} after {}ms: {}", name, elapsed, e),
    }
    result
}

async fn handle(request: ApiRequest, ctx: &RequestContext) -> Result<Value, DispatchError> {
    match request {
        ApiRequest::GetProjectInstances(q) => to_json(ProjectInstanceService::new(ctx).list(&q).await?),
        ApiRequest::GetProjectInstanceById(q) => to_json(ProjectInstanceService::new(ctx).get_by_id(q.id).await?),
        ApiRequest::SaveProjectInstance(c) => to_json(ProjectInstanceService::new(ctx).save(&c).await?),
        ApiRequest::DeleteProjectInstance(c) => to_json(ProjectInstanceService::new(ctx).delete(c.id).await?),
        ApiRequest::GetDataSets(q) => to_json(DataSetService::new(ctx).list(&q).await?),
        ApiRequest::GetDataSetById(q) => to_json(DataSetService::new(ctx).get_by_id(q.id).await?),
        ApiRequest::SaveDataSet(c) => to_json(DataSetService::new(ctx).save(&c).await?),
        ApiRequest::DeleteDataSet(c) => to_json(DataSetService::new(ctx).delete(c.id).await?),
        ApiRequest::GetTranslations(q) => to_json(TranslationService::new(ctx).list(&q).await?),
        ApiRequest::GetSimpleTranslations(q) => to_json(TranslationService::new(ctx).list_simple(&q).await?),
        ApiRequest::GetTranslationById(q) => to_json(TranslationService::new(ctx).get_by_id(q.id).await?),
        ApiRequest::SaveTranslation(c) => to_json(TranslationService::new(ctx).save(&c).await?),
        ApiRequest::DeleteTranslation(c) => to_json(TranslationService::new(ctx).delete(c.id).await?),
        ApiRequest::ExportTranslations(q) => to_json(export_translations(ctx, &q).await?),
        ApiRequest::ImportTranslations(c) => to_json(import_translations(ctx, &c).await?),
    }
}
