use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use thiserror::Error;

/// One rejected input of a dynamic form submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("invalid form submission: {} field error(s)", .0.len())]
    Fields(Vec<FieldError>),
    #[error("authentication required")]
    Unauthorized,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Db(String),
    #[error("model error: {0}")]
    Model(#[from] models::errors::ModelError),
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} not found", entity)) }

    pub fn forbidden(action: &str) -> Self { Self::Forbidden(format!("not allowed to {}", action)) }

    pub fn validation(msg: impl Into<String>) -> Self { Self::Validation(msg.into()) }
}

impl From<DbErr> for ServiceError {
    fn from(e: DbErr) -> Self {
        match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(msg)) => ServiceError::Conflict(msg),
            Some(SqlErr::ForeignKeyConstraintViolation(msg)) => ServiceError::Validation(msg),
            _ => match e {
                DbErr::RecordNotFound(msg) => ServiceError::NotFound(msg),
                other => ServiceError::Db(other.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_not_found_maps_to_not_found() {
        let e: ServiceError = DbErr::RecordNotFound("idea".into()).into();
        assert!(matches!(e, ServiceError::NotFound(_)));
    }

    #[test]
    fn other_db_errors_map_to_db() {
        let e: ServiceError = DbErr::Custom("boom".into()).into();
        assert!(matches!(e, ServiceError::Db(_)));
    }

    #[test]
    fn field_errors_display_count() {
        let e = ServiceError::Fields(vec![FieldError::new("a", "required"), FieldError::new("b", "required")]);
        assert_eq!(e.to_string(), "invalid form submission: 2 field error(s)");
    }
}
