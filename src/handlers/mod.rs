// handlers/mod.rs - HTTP endpoints
//
// system:   GET / and GET /health (public)
// query:    /api/query, /api/requests (named request dispatch)
// transfer: /api/export/translations, /api/import/translations/:dataSetId

pub mod query;
pub mod system;
pub mod transfer;

pub use query::{query_get, query_post, requests_get};
pub use system::{health, root};
pub use transfer::{export_translations_get, import_translations_post};
