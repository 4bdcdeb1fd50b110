//! # Identity Document Catalog — Single Source of Truth
//!
//! Defines the `DocumentKind` enum with every identity document the
//! verification flow accepts, and whether each kind carries a verso side.
//! This is the ONE definition used across the stack. Every `match` on
//! `DocumentKind` must be exhaustive — adding a kind forces every consumer
//! to handle it at compile time.
//!
//! The recto/verso branch of the capture flow is driven entirely by
//! [`DocumentKind::requires_verso`]; no other code hardcodes which
//! documents are two-sided.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ParseError;

/// Identity documents accepted for tenant verification.
///
/// | Kind | Verso required | Notes |
/// |------|----------------|-------|
/// | Passport | no | photo page only |
/// | NationalId | yes | both faces carry data |
/// | ResidencePermit | yes | both faces carry data |
/// | DrivingLicense | yes | both faces carry data |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Travel passport. Single-sided: only the photo page is captured.
    Passport,
    /// National identity card. Two-sided.
    NationalId,
    /// Residence permit card. Two-sided.
    ResidencePermit,
    /// Driving licence. Two-sided.
    DrivingLicense,
}

/// Total number of accepted document kinds. Used for exhaustiveness assertions.
pub const DOCUMENT_KIND_COUNT: usize = 4;

impl DocumentKind {
    /// Returns all accepted document kinds in canonical order.
    pub fn all() -> &'static [DocumentKind] {
        &[
            Self::Passport,
            Self::NationalId,
            Self::ResidencePermit,
            Self::DrivingLicense,
        ]
    }

    /// Whether this document kind has a verso side that must be captured.
    ///
    /// Drives the `document_scan_recto → document_scan_verso` branch of the
    /// capture flow. Passports are single-sided; card-format documents are
    /// captured on both faces.
    pub fn requires_verso(&self) -> bool {
        match self {
            Self::Passport => false,
            Self::NationalId => true,
            Self::ResidencePermit => true,
            Self::DrivingLicense => true,
        }
    }

    /// Returns the snake_case string identifier for this kind.
    ///
    /// This must match the serde serialization format and the document-type
    /// segment of artifact storage paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passport => "passport",
            Self::NationalId => "national_id",
            Self::ResidencePermit => "residence_permit",
            Self::DrivingLicense => "driving_license",
        }
    }

    /// Human-readable label for selection overlays.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Passport => "Passport",
            Self::NationalId => "National identity card",
            Self::ResidencePermit => "Residence permit",
            Self::DrivingLicense => "Driving licence",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = ParseError;

    /// Parse a document kind from its snake_case identifier.
    ///
    /// Accepts the same identifiers produced by [`DocumentKind::as_str()`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "passport" => Ok(Self::Passport),
            "national_id" => Ok(Self::NationalId),
            "residence_permit" => Ok(Self::ResidencePermit),
            "driving_license" => Ok(Self::DrivingLicense),
            other => Err(ParseError::UnknownDocumentKind(other.to_string())),
        }
    }
}

// ─── Document Sides ──────────────────────────────────────────────────

/// A physical side of an identity document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSide {
    /// Front face of the document.
    Recto,
    /// Back face of the document.
    Verso,
}

impl DocumentSide {
    /// Returns the snake_case string identifier for this side.
    ///
    /// Used as the `side` segment of artifact storage paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recto => "recto",
            Self::Verso => "verso",
        }
    }
}

impl std::fmt::Display for DocumentSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentSide {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recto" => Ok(Self::Recto),
            "verso" => Ok(Self::Verso),
            other => Err(ParseError::UnknownDocumentSide(other.to_string())),
        }
    }
}

// ─── Capture Slots ───────────────────────────────────────────────────

/// A capture slot in the verification session.
///
/// The session holds at most one capture per slot. `Recto` and `Verso`
/// correspond to document sides; `Selfie` is the liveness capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureSlot {
    /// Front face of the identity document.
    Recto,
    /// Back face of the identity document.
    Verso,
    /// Liveness selfie.
    Selfie,
}

impl CaptureSlot {
    /// Returns all capture slots in capture order.
    pub fn all() -> &'static [CaptureSlot] {
        &[Self::Recto, Self::Verso, Self::Selfie]
    }

    /// Returns the snake_case string identifier for this slot.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recto => "recto",
            Self::Verso => "verso",
            Self::Selfie => "selfie",
        }
    }

    /// The document side this slot captures, if it is a document slot.
    pub fn document_side(&self) -> Option<DocumentSide> {
        match self {
            Self::Recto => Some(DocumentSide::Recto),
            Self::Verso => Some(DocumentSide::Verso),
            Self::Selfie => None,
        }
    }
}

impl std::fmt::Display for CaptureSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaptureSlot {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recto" => Ok(Self::Recto),
            "verso" => Ok(Self::Verso),
            "selfie" => Ok(Self::Selfie),
            other => Err(ParseError::UnknownCaptureSlot(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_kinds_count() {
        assert_eq!(DocumentKind::all().len(), DOCUMENT_KIND_COUNT);
    }

    #[test]
    fn test_all_kinds_unique() {
        let kinds = DocumentKind::all();
        let mut seen = std::collections::HashSet::new();
        for k in kinds {
            assert!(seen.insert(k), "Duplicate kind: {k}");
        }
    }

    #[test]
    fn test_passport_is_single_sided() {
        assert!(!DocumentKind::Passport.requires_verso());
    }

    #[test]
    fn test_card_documents_require_verso() {
        assert!(DocumentKind::NationalId.requires_verso());
        assert!(DocumentKind::ResidencePermit.requires_verso());
        assert!(DocumentKind::DrivingLicense.requires_verso());
    }

    #[test]
    fn test_as_str_round_trips_through_from_str() {
        for kind in DocumentKind::all() {
            let parsed: DocumentKind = kind.as_str().parse().expect("round-trip");
            assert_eq!(parsed, *kind);
        }
    }

    #[test]
    fn test_from_str_rejects_unknown_kind() {
        let result = DocumentKind::from_str("library_card");
        assert!(matches!(
            result,
            Err(ParseError::UnknownDocumentKind(_))
        ));
    }

    #[test]
    fn test_serde_matches_as_str() {
        for kind in DocumentKind::all() {
            let json = serde_json::to_string(kind).expect("serialize");
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_labels_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for k in DocumentKind::all() {
            assert!(seen.insert(k.label()), "Duplicate label: {}", k.label());
        }
    }

    #[test]
    fn test_document_side_display() {
        assert_eq!(DocumentSide::Recto.to_string(), "recto");
        assert_eq!(DocumentSide::Verso.to_string(), "verso");
    }

    #[test]
    fn test_capture_slot_document_side_mapping() {
        assert_eq!(
            CaptureSlot::Recto.document_side(),
            Some(DocumentSide::Recto)
        );
        assert_eq!(
            CaptureSlot::Verso.document_side(),
            Some(DocumentSide::Verso)
        );
        assert_eq!(CaptureSlot::Selfie.document_side(), None);
    }

    #[test]
    fn test_capture_slot_round_trip() {
        for slot in CaptureSlot::all() {
            let parsed: CaptureSlot = slot.as_str().parse().expect("round-trip");
            assert_eq!(parsed, *slot);
        }
    }
}
