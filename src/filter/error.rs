use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Invalid ordering: {0}")]
    InvalidOrdering(String),

    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}
