//! Typed client for the verification oracle service.
//!
//! Base URL: `verify.api.loka.rent`. All endpoints live under the
//! `verification/api/v1` context path and speak snake_case JSON.
//!
//! ## Endpoints
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST   | `/verifications` | Evaluate one submission |
//!
//! A rejection the provider evaluated (blurry document, face mismatch,
//! …) comes back as HTTP 200 with `status: "rejected"` and a sub-code;
//! only transport-level problems surface as non-2xx statuses. Server
//! errors get the short retry schedule (the POST is a pure evaluation,
//! safe to re-send) before they surface as `ServiceUnavailable`; a
//! cancel token attached with [`HttpOracle::with_cancel`] stops that
//! schedule early.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use lkyc_core::{CancelToken, DocumentKind, ExtractedIdentity, RejectionReason};

use crate::artifact::SubmittedArtifacts;
use crate::error::ClientError;
use crate::oracle::{OracleError, OracleVerdict, VerificationOracle};

/// API version path for the verification service.
const VERIFY_API_PREFIX: &str = "verification/api/v1";

// -- Types matching the verification API schema -------------------------------

/// Submission payload sent to the provider.
#[derive(Debug, Serialize)]
pub struct VerifyRequest<'a> {
    /// The document kind the tenant selected.
    pub document_type: DocumentKind,
    /// Stored artifact handles of the submission.
    pub artifacts: &'a SubmittedArtifacts,
}

/// Evaluation status reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyStatus {
    Verified,
    Rejected,
    /// Forward-compatible catch-all.
    #[serde(other)]
    Unknown,
}

/// Evaluation result from the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    /// Whether the provider verified or rejected the submission.
    pub status: VerifyStatus,
    /// Confidence score; present when verified.
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Extracted identity fields; present when verified.
    #[serde(default)]
    pub identity: Option<ExtractedIdentity>,
    /// Rejection sub-code; present when rejected.
    #[serde(default)]
    pub reason: Option<RejectionReason>,
    /// Human-readable detail; present when rejected.
    #[serde(default)]
    pub message: Option<String>,
}

// -- Client -------------------------------------------------------------------

/// Client for the verification oracle service.
#[derive(Debug, Clone)]
pub struct HttpOracle {
    http: reqwest::Client,
    base_url: url::Url,
    cancel: Option<CancelToken>,
}

impl HttpOracle {
    pub(crate) fn new(http: reqwest::Client, base_url: url::Url) -> Self {
        Self {
            http,
            base_url,
            cancel: None,
        }
    }

    /// Tie this client's retry schedule to an attempt's cancel token.
    ///
    /// A fired token stops the backoff between retry waves; it does not
    /// abort a request already in flight.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn map_response(response: VerifyResponse) -> Result<OracleVerdict, OracleError> {
        match response.status {
            VerifyStatus::Verified => {
                let confidence =
                    response
                        .confidence
                        .ok_or_else(|| OracleError::MalformedResponse {
                            reason: "verified response without confidence".to_string(),
                        })?;
                let identity = response
                    .identity
                    .ok_or_else(|| OracleError::MalformedResponse {
                        reason: "verified response without identity".to_string(),
                    })?;
                Ok(OracleVerdict {
                    confidence,
                    identity,
                })
            }
            VerifyStatus::Rejected => {
                let reason = response
                    .reason
                    .ok_or_else(|| OracleError::MalformedResponse {
                        reason: "rejected response without a sub-code".to_string(),
                    })?;
                Err(OracleError::Rejected {
                    reason,
                    message: response
                        .message
                        .unwrap_or_else(|| "verification rejected".to_string()),
                })
            }
            VerifyStatus::Unknown => Err(OracleError::MalformedResponse {
                reason: "unrecognized evaluation status".to_string(),
            }),
        }
    }
}

#[async_trait]
impl VerificationOracle for HttpOracle {
    /// Evaluate one submission.
    ///
    /// Calls `POST {base}/verification/api/v1/verifications`.
    async fn verify(
        &self,
        document_type: DocumentKind,
        artifacts: &SubmittedArtifacts,
    ) -> Result<OracleVerdict, OracleError> {
        let endpoint = "POST /verifications".to_string();
        let url = format!("{}{}/verifications", self.base_url, VERIFY_API_PREFIX);
        let request = VerifyRequest {
            document_type,
            artifacts,
        };
        let started = std::time::Instant::now();

        let resp = crate::retry::send_with_retry(&endpoint, self.cancel.as_ref(), || {
            self.http.post(&url).json(&request).send()
        })
        .await
        .map_err(|e| {
            if e.is_timeout() {
                OracleError::Timeout {
                    elapsed_ms: started.elapsed().as_millis() as u64,
                }
            } else {
                OracleError::Transport(ClientError::Transit {
                    endpoint: endpoint.clone(),
                    source: e,
                })
            }
        })?;

        let status = resp.status();
        if status.is_server_error() {
            return Err(OracleError::ServiceUnavailable {
                reason: format!("{endpoint} returned {}", status.as_u16()),
            });
        }
        if !status.is_success() {
            return Err(ClientError::from_response(endpoint, resp).await.into());
        }

        let response: VerifyResponse = resp.json().await.map_err(|e| ClientError::Decode {
            endpoint,
            source: e,
        })?;
        Self::map_response(response)
    }

    fn provider_name(&self) -> &str {
        "HttpOracle"
    }
}
