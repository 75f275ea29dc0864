use thiserror::Error;

/// Storage errors for the transaction log.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database connection or query execution failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration execution failed
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row could not be turned back into a record
    #[error("Invalid stored record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl StorageError {
    pub(crate) fn invalid_record(id: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidRecord {
            id: id.into(),
            reason: reason.to_string(),
        }
    }
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
