//! Error types for the lab layer.

use crate::model::Role;
use crate::stage::Stage;
use medialab_archive::ArchiveError;
use medialab_store::StoreError;
use thiserror::Error;

/// Result type for lab operations.
pub type LabResult<T> = Result<T, LabError>;

/// Errors that can occur in lab operations.
#[derive(Debug, Error)]
pub enum LabError {
    /// Record store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Archive error.
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Unknown email or wrong password.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The session's role may not perform the action.
    #[error("a {role} may not {action}")]
    Forbidden {
        /// Role of the session.
        role: Role,
        /// What was attempted.
        action: &'static str,
    },

    /// A required record does not exist.
    #[error("{what} not found: {key}")]
    NotFound {
        /// Kind of record.
        what: &'static str,
        /// Its key.
        key: String,
    },

    /// A worksheet was submitted with blank required answers.
    #[error("{stage} worksheet is missing required answers: {}", missing.join(", "))]
    IncompleteWorksheet {
        /// Stage of the worksheet.
        stage: Stage,
        /// Blank field ids.
        missing: Vec<String>,
    },

    /// A stage resource points at an asset that is gone.
    #[error("asset {id} is missing")]
    MissingAsset {
        /// Asset id.
        id: String,
    },

    /// The upload policy rejects the file type.
    #[error("uploads of type {content_type} are disabled")]
    UploadNotAllowed {
        /// Rejected MIME type.
        content_type: String,
    },

    /// The certificate needs every stage complete.
    #[error("{email} has not completed every stage")]
    ProjectIncomplete {
        /// Student email.
        email: String,
    },

    /// Caller input failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    /// JSON export failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LabError {
    /// Creates a not-found error.
    pub fn not_found(what: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            what,
            key: key.into(),
        }
    }

    /// Creates an invalid input error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}
