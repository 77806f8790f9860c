use thiserror::Error;

pub mod audit;
pub mod database;

pub use audit::AuditError;
pub use database::DatabaseError;

/// Internal error type for store and service operations
///
/// Infrastructure errors (database, parse, crypto) are shared by all stores;
/// validation errors come from the boundary conversions of filters and
/// request bodies. Not exposed via API - endpoints convert to AdminError.
#[derive(Error, Debug)]
pub enum InternalError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Parse error: failed to parse {value_type}: {message}")]
    Parse {
        value_type: String,
        message: String,
    },

    #[error("Crypto error: {operation} failed: {message}")]
    Crypto {
        operation: String,
        message: String,
    },

    #[error("Validation failed for {field}: {message}")]
    Validation {
        field: String,
        message: String,
    },

    #[error(transparent)]
    Audit(#[from] AuditError),
}

impl InternalError {
    pub fn database(operation: &str, source: sea_orm::DbErr) -> InternalError {
        InternalError::Database(DatabaseError::Operation {
            operation: operation.to_string(),
            source,
        })
    }

    pub fn parse(value_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            value_type: value_type.into(),
            message: message.into(),
        }
    }

    pub fn crypto(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Crypto {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}
