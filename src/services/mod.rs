pub mod context;
pub mod data_set_service;
pub mod error;
pub mod project_instance_service;
pub mod translation_export;
pub mod translation_import;
pub mod translation_service;

pub use context::RequestContext;
pub use data_set_service::{DataSetDto, DataSetService, SaveDataSetCommand};
pub use error::{ServiceError, Validator};
pub use project_instance_service::{ProjectInstanceDto, ProjectInstanceService, SaveProjectInstanceCommand};
pub use translation_export::{export_translations, ExportTranslationsQuery, ExportedFile};
pub use translation_import::{import_translations, ImportSummary, ImportTranslationsCommand};
pub use translation_service::{SaveTranslationCommand, SimpleTranslationDto, TranslationDto, TranslationService};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of every by-id query and delete command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct IdRequest {
    pub id: Uuid,
}
