//! Repository error taxonomy.

use thiserror::Error;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed record does not exist.
    #[error("record not found: {what}")]
    NotFound {
        /// Description of the missing record, e.g. `tenant identity tenant:{uuid}`.
        what: String,
    },

    /// A status write violated the KYC transition matrix.
    #[error("invalid kyc status transition: {from} -> {to}")]
    InvalidStatusTransition { from: String, to: String },

    /// A structured column could not be serialized for persistence.
    #[error("failed to serialize {what}: {reason}")]
    Serialization { what: String, reason: String },

    /// The backing store refused the operation.
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },

    /// Database error.
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
