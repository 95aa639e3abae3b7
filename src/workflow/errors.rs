// Error types for the approval workflow

use thiserror::Error;

use super::types::WorkItemKind;

/// Persistence failures. Opaque to callers and never retried by the engine.
#[derive(Debug, Error)]
pub enum StoreError {
    #[cfg(feature = "database")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[cfg(feature = "database")]
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("directory lookup failed: {0}")]
    Directory(String),
}

/// Expected, caller-recoverable outcomes of a workflow request
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{kind} {code} not found")]
    NotFound { kind: WorkItemKind, code: String },

    #[error("{code} is {status} and can no longer be modified")]
    NotModifiable { code: String, status: String },

    #[error("user {uid} may not act on {code} while it is {status}")]
    Forbidden {
        uid: String,
        code: String,
        status: String,
    },

    #[error("user {uid} cannot act on {code} once it moves to {status}")]
    InvalidOperator {
        uid: String,
        code: String,
        status: String,
    },

    #[error("invalid {field}: {value}")]
    InvalidEnum { field: &'static str, value: String },

    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("{code} is no longer {expected}; reload and retry")]
    Conflict { code: String, expected: String },

    #[error("requirement {code} does not exist")]
    UnknownReference { code: String },

    #[error("user {uid} does not belong to a group")]
    MissingGroup { uid: String },

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl WorkflowError {
    /// Only a lost compare-and-swap race is worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkflowError::Conflict { .. })
    }

    /// Short machine-readable kind, used in logs and CLI output
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowError::NotFound { .. } => "not_found",
            WorkflowError::NotModifiable { .. } => "not_modifiable",
            WorkflowError::Forbidden { .. } => "forbidden",
            WorkflowError::InvalidOperator { .. } => "invalid_operator",
            WorkflowError::InvalidEnum { .. } => "invalid_enum",
            WorkflowError::InvalidInput { .. } => "invalid_input",
            WorkflowError::Conflict { .. } => "conflict",
            WorkflowError::UnknownReference { .. } => "unknown_reference",
            WorkflowError::MissingGroup { .. } => "missing_group",
            WorkflowError::Storage(_) => "storage",
        }
    }
}
