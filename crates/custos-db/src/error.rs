//! Storage-specific error types and conversions.

use custos_core::error::CustosError;

/// Storage-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Duplicate {entity}: '{name}' is already taken")]
    Duplicate { entity: String, name: String },

    #[error("Referential integrity violated: {0}")]
    Integrity(String),

    #[error("Transaction cancelled")]
    Cancelled,
}

impl DbError {
    pub(crate) fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub(crate) fn duplicate(entity: &str, name: &str) -> Self {
        Self::Duplicate {
            entity: entity.into(),
            name: name.into(),
        }
    }
}

impl From<DbError> for CustosError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => CustosError::NotFound { entity, id },
            DbError::Duplicate { entity, name } => CustosError::AlreadyExists { entity, name },
            DbError::Cancelled => CustosError::Cancelled,
            other => CustosError::Database(other.to_string()),
        }
    }
}
