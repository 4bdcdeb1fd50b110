//! # Parse Errors
//!
//! Errors produced when parsing wire-format strings back into the typed
//! enums of the KYC vocabulary. All errors use `thiserror` for derive-based
//! `Display` and `Error` implementations.

use thiserror::Error;

/// Failure to parse a wire-format string into a core enum.
#[derive(Error, Debug)]
pub enum ParseError {
    /// String is not a known document kind.
    #[error("unknown document kind: {0:?}")]
    UnknownDocumentKind(String),

    /// String is not a known document side.
    #[error("unknown document side: {0:?}")]
    UnknownDocumentSide(String),

    /// String is not a known capture slot.
    #[error("unknown capture slot: {0:?}")]
    UnknownCaptureSlot(String),

    /// String is not a known KYC status.
    #[error("unknown kyc status: {0:?}")]
    UnknownKycStatus(String),

    /// String is not a known failure code.
    #[error("unknown failure code: {0:?}")]
    UnknownFailureCode(String),

    /// String is not a known rejection reason.
    #[error("unknown rejection reason: {0:?}")]
    UnknownRejectionReason(String),

    /// String is not a known signer role.
    #[error("unknown signer role: {0:?}")]
    UnknownSignerRole(String),

    /// String is not a known lease document type.
    #[error("unknown lease document type: {0:?}")]
    UnknownLeaseDocumentType(String),
}
