//! # KYC Status Lattice
//!
//! The durable verification status carried by every tenant profile, and the
//! legal transitions between statuses. The submission pipeline is the only
//! writer; repositories validate every status write against
//! [`KycStatus::can_transition_to`] so an attempt can never corrupt a
//! profile into an unreachable state.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ParseError;

/// Verification status of a tenant profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    /// No verification attempt has been resolved for this tenant.
    Unverified,
    /// An attempt is in flight: artifacts uploaded, oracle not yet resolved.
    Processing,
    /// Identity verified by the oracle.
    Verified,
    /// Last attempt was rejected by the oracle.
    Rejected,
}

impl KycStatus {
    /// Returns all statuses in canonical order.
    pub fn all() -> &'static [KycStatus] {
        &[
            Self::Unverified,
            Self::Processing,
            Self::Verified,
            Self::Rejected,
        ]
    }

    /// Whether a transition from `self` to `to` is legal.
    ///
    /// The legal edges:
    ///
    /// ```text
    /// unverified ──▶ processing ──▶ verified
    ///                    ▲  │
    ///                    │  └─────▶ rejected
    ///                    │              │
    ///     verified ──────┴──────────────┘   (re-verification)
    /// ```
    ///
    /// `processing` always resolves to `verified` or `rejected`; both
    /// resolved statuses may re-enter `processing` when a tenant re-runs
    /// verification (renewed document, prior rejection).
    pub fn can_transition_to(&self, to: KycStatus) -> bool {
        matches!(
            (self, to),
            (KycStatus::Unverified, KycStatus::Processing)
                | (KycStatus::Processing, KycStatus::Verified)
                | (KycStatus::Processing, KycStatus::Rejected)
                | (KycStatus::Verified, KycStatus::Processing)
                | (KycStatus::Rejected, KycStatus::Processing)
        )
    }

    /// Returns the snake_case string identifier for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unverified => "unverified",
            Self::Processing => "processing",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for KycStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KycStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unverified" => Ok(Self::Unverified),
            "processing" => Ok(Self::Processing),
            "verified" => Ok(Self::Verified),
            "rejected" => Ok(Self::Rejected),
            other => Err(ParseError::UnknownKycStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        assert!(KycStatus::Unverified.can_transition_to(KycStatus::Processing));
        assert!(KycStatus::Processing.can_transition_to(KycStatus::Verified));
        assert!(KycStatus::Processing.can_transition_to(KycStatus::Rejected));
        assert!(KycStatus::Verified.can_transition_to(KycStatus::Processing));
        assert!(KycStatus::Rejected.can_transition_to(KycStatus::Processing));
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        // Resolution without an in-flight attempt.
        assert!(!KycStatus::Unverified.can_transition_to(KycStatus::Verified));
        assert!(!KycStatus::Unverified.can_transition_to(KycStatus::Rejected));
        // Resolved statuses never swap directly.
        assert!(!KycStatus::Verified.can_transition_to(KycStatus::Rejected));
        assert!(!KycStatus::Rejected.can_transition_to(KycStatus::Verified));
        // No backwards edge to unverified.
        for status in KycStatus::all() {
            assert!(!status.can_transition_to(KycStatus::Unverified));
        }
    }

    #[test]
    fn test_self_transitions_rejected() {
        for status in KycStatus::all() {
            assert!(
                !status.can_transition_to(*status),
                "self-transition allowed for {status}"
            );
        }
    }

    #[test]
    fn test_as_str_round_trips() {
        for status in KycStatus::all() {
            let parsed: KycStatus = status.as_str().parse().expect("round-trip");
            assert_eq!(parsed, *status);
        }
    }

    #[test]
    fn test_serde_matches_as_str() {
        for status in KycStatus::all() {
            let json = serde_json::to_string(status).expect("serialize");
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }
}
