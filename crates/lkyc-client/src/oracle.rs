//! # Verification Oracle Adapter Interface
//!
//! Defines the adapter interface for the identity verification provider
//! (the "oracle"). The oracle receives the stored artifact handles of one
//! submission, compares the selfie against the document portrait, extracts
//! the printed identity fields, and returns a verdict.
//!
//! ## Architecture
//!
//! The `VerificationOracle` trait abstracts over the verification backend.
//! Production deployments implement it against the live provider API (see
//! [`crate::verify`]); test environments use [`MockOracle`]. The
//! submission pipeline composes verification without coupling to a
//! specific transport or provider.
//!
//! ## Rejection vs. failure
//!
//! A provider that evaluated the submission and said no returns
//! [`OracleError::Rejected`] with a [`RejectionReason`] sub-code for user
//! messaging. Transport and configuration failures use the other
//! variants. Both funnel to a `verification_failed` outcome upstream; the
//! distinction controls what the tenant is told.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use lkyc_core::{DocumentKind, ExtractedIdentity, RejectionReason};

use crate::artifact::SubmittedArtifacts;
use crate::error::ClientError;

// ─── Verdict ─────────────────────────────────────────────────────────

/// A successful oracle evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleVerdict {
    /// Provider confidence score (0.0 = no match, 1.0 = exact match).
    pub confidence: f64,
    /// Identity fields extracted from the document.
    pub identity: ExtractedIdentity,
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors from verification oracle operations.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// The provider evaluated the submission and rejected it.
    #[error("verification rejected ({reason}): {message}")]
    Rejected {
        /// Provider sub-code classifying the rejection.
        reason: RejectionReason,
        /// Human-readable description from the provider.
        message: String,
    },

    /// The provider is unreachable or returned a 5xx status.
    #[error("oracle service unavailable: {reason}")]
    ServiceUnavailable {
        /// Human-readable description of the outage or error.
        reason: String,
    },

    /// The oracle has not been configured for this deployment.
    #[error("oracle not configured: {reason}")]
    NotConfigured {
        /// Why configuration is missing or incomplete.
        reason: String,
    },

    /// The request to the provider timed out.
    #[error("oracle request timed out after {elapsed_ms}ms")]
    Timeout {
        /// Elapsed time in milliseconds before the timeout triggered.
        elapsed_ms: u64,
    },

    /// The provider returned a payload the client cannot interpret.
    #[error("malformed oracle response: {reason}")]
    MalformedResponse {
        /// What was wrong with the payload.
        reason: String,
    },

    /// HTTP client failure.
    #[error(transparent)]
    Transport(#[from] ClientError),
}

impl OracleError {
    /// The rejection sub-code carried by this error, when the provider
    /// evaluated and rejected. Transport-shaped failures map to
    /// [`RejectionReason::Network`].
    pub fn rejection_reason(&self) -> RejectionReason {
        match self {
            Self::Rejected { reason, .. } => *reason,
            _ => RejectionReason::Network,
        }
    }
}

// ─── Oracle Contract ─────────────────────────────────────────────────

/// Adapter trait for identity verification providers.
///
/// Implementations must be `Send + Sync` so they can be shared across
/// async tasks behind an `Arc`. The trait is object-safe to support
/// runtime adapter selection (mock vs. live).
#[async_trait]
pub trait VerificationOracle: Send + Sync {
    /// Evaluate one submission: the selected document kind and the
    /// stored artifact handles of its captures.
    async fn verify(
        &self,
        document_type: DocumentKind,
        artifacts: &SubmittedArtifacts,
    ) -> Result<OracleVerdict, OracleError>;

    /// Return the human-readable name of this provider implementation
    /// (e.g. "MockOracle", "LokaVerifyV1").
    fn provider_name(&self) -> &str;
}

// ─── Mock Oracle ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum MockBehavior {
    Verify {
        confidence: f64,
        identity: ExtractedIdentity,
    },
    Reject {
        reason: RejectionReason,
        message: String,
    },
    Unavailable {
        reason: String,
    },
}

/// Mock verification oracle for testing and development.
///
/// Returns a configured verdict or failure, optionally after a fixed
/// latency, and records the artifact paths of every submission it
/// received for assertions.
#[derive(Debug)]
pub struct MockOracle {
    behavior: MockBehavior,
    latency: Option<Duration>,
    received: Mutex<Vec<Vec<String>>>,
}

impl MockOracle {
    /// An oracle that verifies every submission with the given identity
    /// and a fixed confidence of 0.95.
    pub fn verifying(identity: ExtractedIdentity) -> Self {
        Self::verifying_with_confidence(0.95, identity)
    }

    /// An oracle that verifies every submission with the given
    /// confidence and identity.
    pub fn verifying_with_confidence(confidence: f64, identity: ExtractedIdentity) -> Self {
        Self {
            behavior: MockBehavior::Verify {
                confidence,
                identity,
            },
            latency: None,
            received: Mutex::new(Vec::new()),
        }
    }

    /// An oracle that rejects every submission with the given sub-code.
    pub fn rejecting(reason: RejectionReason, message: &str) -> Self {
        Self {
            behavior: MockBehavior::Reject {
                reason,
                message: message.to_string(),
            },
            latency: None,
            received: Mutex::new(Vec::new()),
        }
    }

    /// An oracle whose service is down.
    pub fn unavailable(reason: &str) -> Self {
        Self {
            behavior: MockBehavior::Unavailable {
                reason: reason.to_string(),
            },
            latency: None,
            received: Mutex::new(Vec::new()),
        }
    }

    /// Delay every evaluation by a fixed latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// The artifact paths of every submission received, in call order.
    pub fn received_paths(&self) -> Vec<Vec<String>> {
        self.received.lock().clone()
    }

    /// Number of submissions received.
    pub fn call_count(&self) -> usize {
        self.received.lock().len()
    }
}

#[async_trait]
impl VerificationOracle for MockOracle {
    async fn verify(
        &self,
        _document_type: DocumentKind,
        artifacts: &SubmittedArtifacts,
    ) -> Result<OracleVerdict, OracleError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.received
            .lock()
            .push(artifacts.paths().iter().map(|p| p.to_string()).collect());

        match &self.behavior {
            MockBehavior::Verify {
                confidence,
                identity,
            } => Ok(OracleVerdict {
                confidence: *confidence,
                identity: identity.clone(),
            }),
            MockBehavior::Reject { reason, message } => Err(OracleError::Rejected {
                reason: *reason,
                message: message.clone(),
            }),
            MockBehavior::Unavailable { reason } => Err(OracleError::ServiceUnavailable {
                reason: reason.clone(),
            }),
        }
    }

    fn provider_name(&self) -> &str {
        "MockOracle"
    }
}
