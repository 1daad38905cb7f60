use std::collections::HashMap;

use thiserror::Error;

use crate::auth::AuthorizationError;
use crate::database::manager::DatabaseError;
use crate::filter::QueryError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{message}")]
    Validation {
        message: String,
        field_errors: HashMap<String, String>,
    },

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::Database(DatabaseError::Sqlx(err))
    }
}

impl ServiceError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        let mut validator = Validator::new();
        validator.error(field, message);
        validator.into_error()
    }
}

/// Collects per-field validation messages for a command.
#[derive(Debug, Default)]
pub struct Validator {
    field_errors: HashMap<String, String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.error(field, format!("{} is required.", field));
        }
        self
    }

    /// Length in characters, not bytes.
    pub fn max_len(&mut self, field: &str, value: Option<&str>, max: usize) -> &mut Self {
        if value.is_some_and(|v| v.chars().count() > max) {
            self.error(field, format!("{} must be at most {} characters.", field, max));
        }
        self
    }

    /// Keeps the first message recorded for a field.
    pub fn error(&mut self, field: &str, message: impl Into<String>) -> &mut Self {
        self.field_errors.entry(field.to_string()).or_insert_with(|| message.into());
        self
    }

    pub fn finish(self) -> Result<(), ServiceError> {
        if self.field_errors.is_empty() {
            Ok(())
        } else {
            Err(self.into_error())
        }
    }

    fn into_error(self) -> ServiceError {
        let message = if self.field_errors.len() == 1 {
            self.field_errors.values().next().cloned().unwrap_or_default()
        } else {
            "One or more validation errors occurred.".to_string()
        };
        ServiceError::Validation { message, field_errors: self.field_errors }
    }
}
