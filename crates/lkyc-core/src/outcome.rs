//! # Verification Outcomes and the Failure Taxonomy
//!
//! The result of one verification attempt, shared between the capture flow
//! (which displays it), the submission pipeline (which produces it), and the
//! result synchronizer (which persists its verified branch).
//!
//! ## Failure Taxonomy
//!
//! Three attempt-level codes cover every way an attempt can fail:
//!
//! - `missing_document` — precondition failure, no network call attempted.
//! - `upload_error` — artifact write failed; the attempt aborted before the
//!   oracle was contacted.
//! - `verification_failed` — the oracle rejected the submission or the
//!   oracle call itself failed.
//!
//! Provider sub-codes ([`RejectionReason`]) ride along on
//! `verification_failed` outcomes and map to user-facing messaging.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ParseError;

// ─── Extracted Identity ──────────────────────────────────────────────

/// Identity fields extracted from the document by the verification provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedIdentity {
    /// Family name as printed on the document.
    pub name: String,
    /// Given name as printed on the document.
    pub first_name: String,
    /// Date of birth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    /// Place of birth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_place: Option<String>,
    /// Sex marker as printed on the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    /// Nationality.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    /// Document number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,
    /// Document expiry date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
}

// ─── Failure Codes ───────────────────────────────────────────────────

/// Attempt-level failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCode {
    /// Required captures were absent when processing was entered.
    /// This failure never reaches the network.
    MissingDocument,
    /// An artifact upload failed; the oracle was never contacted.
    UploadError,
    /// The oracle rejected the submission or the call failed.
    VerificationFailed,
}

impl FailureCode {
    /// Returns the snake_case string identifier for this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingDocument => "missing_document",
            Self::UploadError => "upload_error",
            Self::VerificationFailed => "verification_failed",
        }
    }
}

impl std::fmt::Display for FailureCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureCode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "missing_document" => Ok(Self::MissingDocument),
            "upload_error" => Ok(Self::UploadError),
            "verification_failed" => Ok(Self::VerificationFailed),
            other => Err(ParseError::UnknownFailureCode(other.to_string())),
        }
    }
}

// ─── Rejection Reasons ───────────────────────────────────────────────

/// Provider sub-codes for rejected submissions, surfaced verbatim for user
/// messaging. Each reason maps to a distinct explanation and remediation tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// The document image is too blurry to read.
    DocumentBlurry,
    /// The document has passed its expiry date.
    DocumentExpired,
    /// No face could be detected in the selfie.
    FaceNotDetected,
    /// The selfie does not match the document photo.
    FaceMismatch,
    /// Document fields could not be extracted.
    DocumentUnreadable,
    /// The provider could not be reached.
    Network,
}

impl RejectionReason {
    /// Returns all rejection reasons in canonical order.
    pub fn all() -> &'static [RejectionReason] {
        &[
            Self::DocumentBlurry,
            Self::DocumentExpired,
            Self::FaceNotDetected,
            Self::FaceMismatch,
            Self::DocumentUnreadable,
            Self::Network,
        ]
    }

    /// Returns the snake_case string identifier for this reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DocumentBlurry => "document_blurry",
            Self::DocumentExpired => "document_expired",
            Self::FaceNotDetected => "face_not_detected",
            Self::FaceMismatch => "face_mismatch",
            Self::DocumentUnreadable => "document_unreadable",
            Self::Network => "network",
        }
    }

    /// User-facing explanation of the rejection.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::DocumentBlurry => "The document photo is too blurry to read.",
            Self::DocumentExpired => "This document has expired.",
            Self::FaceNotDetected => "We could not detect a face in your selfie.",
            Self::FaceMismatch => {
                "The selfie does not appear to match the photo on the document."
            }
            Self::DocumentUnreadable => {
                "We could not read the information on this document."
            }
            Self::Network => "The verification service could not be reached.",
        }
    }

    /// Remediation tip displayed alongside [`Self::user_message`].
    pub fn remediation(&self) -> &'static str {
        match self {
            Self::DocumentBlurry => {
                "Hold the document still, in good light, and avoid reflections."
            }
            Self::DocumentExpired => "Use a document that is still valid.",
            Self::FaceNotDetected => {
                "Face the camera directly in a well-lit place, without a hat or mask."
            }
            Self::FaceMismatch => {
                "Make sure the person taking the selfie is the document holder."
            }
            Self::DocumentUnreadable => {
                "Capture the whole document flat, with all corners visible."
            }
            Self::Network => "Check your connection and try again.",
        }
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RejectionReason {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "document_blurry" => Ok(Self::DocumentBlurry),
            "document_expired" => Ok(Self::DocumentExpired),
            "face_not_detected" => Ok(Self::FaceNotDetected),
            "face_mismatch" => Ok(Self::FaceMismatch),
            "document_unreadable" => Ok(Self::DocumentUnreadable),
            "network" => Ok(Self::Network),
            other => Err(ParseError::UnknownRejectionReason(other.to_string())),
        }
    }
}

// ─── Verification Outcome ────────────────────────────────────────────

/// The result of one verification attempt.
///
/// Produced by the submission pipeline and carried into the terminal
/// `success`/`error` steps of the capture flow. The failed branch always
/// has a defined [`FailureCode`]; there is no untyped failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VerificationOutcome {
    /// The oracle verified the identity.
    Verified {
        /// Oracle confidence score (0.0 = no match, 1.0 = exact match).
        confidence: f64,
        /// Identity fields extracted from the document.
        identity: ExtractedIdentity,
    },
    /// The attempt failed.
    Failed {
        /// Attempt-level failure classification.
        code: FailureCode,
        /// Human-readable failure description.
        message: String,
        /// Provider sub-code, when the oracle evaluated and rejected.
        reason: Option<RejectionReason>,
    },
}

impl VerificationOutcome {
    /// A `missing_document` failure. Local precondition failure; no network
    /// call was attempted.
    pub fn missing_document(message: impl Into<String>) -> Self {
        Self::Failed {
            code: FailureCode::MissingDocument,
            message: message.into(),
            reason: None,
        }
    }

    /// An `upload_error` failure. The attempt aborted before the oracle.
    pub fn upload_error(message: impl Into<String>) -> Self {
        Self::Failed {
            code: FailureCode::UploadError,
            message: message.into(),
            reason: None,
        }
    }

    /// A `verification_failed` failure, with the provider sub-code when one
    /// was reported.
    pub fn verification_failed(
        message: impl Into<String>,
        reason: Option<RejectionReason>,
    ) -> Self {
        Self::Failed {
            code: FailureCode::VerificationFailed,
            message: message.into(),
            reason,
        }
    }

    /// Whether the attempt succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Verified { .. })
    }

    /// The failure code, if the attempt failed.
    pub fn error_code(&self) -> Option<FailureCode> {
        match self {
            Self::Verified { .. } => None,
            Self::Failed { code, .. } => Some(*code),
        }
    }

    /// The oracle confidence score, if the attempt succeeded.
    pub fn confidence(&self) -> Option<f64> {
        match self {
            Self::Verified { confidence, .. } => Some(*confidence),
            Self::Failed { .. } => None,
        }
    }

    /// The extracted identity, if the attempt succeeded.
    pub fn identity(&self) -> Option<&ExtractedIdentity> {
        match self {
            Self::Verified { identity, .. } => Some(identity),
            Self::Failed { .. } => None,
        }
    }

    /// The provider rejection sub-code, if one was reported.
    pub fn rejection_reason(&self) -> Option<RejectionReason> {
        match self {
            Self::Verified { .. } => None,
            Self::Failed { reason, .. } => *reason,
        }
    }
}
