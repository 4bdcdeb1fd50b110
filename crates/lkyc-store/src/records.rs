//! # Durable Records
//!
//! Typed rows for the three persistence concerns of identity verification:
//! the per-tenant identity profile, lease-scoped document records, and the
//! append-only audit log. Every record crosses the persistence boundary as
//! one of these tagged DTOs; no loosely-typed maps.
//!
//! `TenantIdentityRecord` is mutated only by the result synchronizer through
//! the repository status methods. `LeaseDocumentRecord` history is preserved
//! by archive-then-insert: a new version never overwrites the old row, it
//! archives it and inserts a fresh one. `AuditEvent` is immutable once
//! written.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use lkyc_core::{
    AuditEventId, DocumentKind, DocumentSide, ExtractedIdentity, KycStatus, LeaseId, ParseError,
    TenantId,
};

// ─── Lease Vocabulary ────────────────────────────────────────────────

/// Role a tenant holds on a lease. Both roles are subject to identity
/// verification and both receive the fan-out write on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignerRole {
    PrimaryTenant,
    CoTenant,
}

impl SignerRole {
    /// Returns the snake_case string identifier for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrimaryTenant => "primary_tenant",
            Self::CoTenant => "co_tenant",
        }
    }
}

impl std::fmt::Display for SignerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignerRole {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary_tenant" => Ok(Self::PrimaryTenant),
            "co_tenant" => Ok(Self::CoTenant),
            other => Err(ParseError::UnknownSignerRole(other.to_string())),
        }
    }
}

/// A lease where a tenant holds a signer role. The fan-out read returns
/// one of these per lease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseRef {
    pub lease_id: LeaseId,
    pub role: SignerRole,
}

/// Document type of a lease-scoped identity record.
///
/// Mirrors [`DocumentSide`]: the recto capture lands as `identity_front`,
/// the verso capture as `identity_back`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaseDocumentType {
    IdentityFront,
    IdentityBack,
}

impl LeaseDocumentType {
    /// Returns the snake_case string identifier for this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IdentityFront => "identity_front",
            Self::IdentityBack => "identity_back",
        }
    }

    /// Human-readable title for the stored document row.
    pub fn title(&self) -> &'static str {
        match self {
            Self::IdentityFront => "Identity document (front)",
            Self::IdentityBack => "Identity document (back)",
        }
    }
}

impl From<DocumentSide> for LeaseDocumentType {
    fn from(side: DocumentSide) -> Self {
        match side {
            DocumentSide::Recto => Self::IdentityFront,
            DocumentSide::Verso => Self::IdentityBack,
        }
    }
}

impl std::fmt::Display for LeaseDocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeaseDocumentType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "identity_front" => Ok(Self::IdentityFront),
            "identity_back" => Ok(Self::IdentityBack),
            other => Err(ParseError::UnknownLeaseDocumentType(other.to_string())),
        }
    }
}

// ─── Tenant Identity Profile ─────────────────────────────────────────

/// The durable identity record of one tenant profile.
///
/// One row per tenant. Created when the profile is created (outside this
/// subsystem); mutated only through [`crate::IdentityRepo`], whose status
/// methods validate every write against [`KycStatus::can_transition_to`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantIdentityRecord {
    pub tenant_id: TenantId,
    pub kyc_status: KycStatus,
    /// Storage path of the verified document front, once verified.
    pub identity_front_path: Option<String>,
    /// Storage path of the verified document back, for two-sided kinds.
    pub identity_back_path: Option<String>,
    /// Storage path of the verified selfie, when one was captured.
    pub selfie_path: Option<String>,
    /// Identity fields extracted by the oracle on the last verification.
    pub extracted_identity: Option<ExtractedIdentity>,
    /// Document number, denormalized from the extracted identity.
    pub document_number: Option<String>,
    /// Document expiry date, denormalized from the extracted identity.
    pub document_expiry_date: Option<NaiveDate>,
    /// When the last successful verification resolved.
    pub verified_at: Option<DateTime<Utc>>,
    /// When the selfie was last verified; stays empty for document-only
    /// attempts.
    pub selfie_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TenantIdentityRecord {
    /// Fresh profile record with no verification history.
    pub fn unverified(tenant_id: TenantId) -> Self {
        let now = Utc::now();
        Self {
            tenant_id,
            kyc_status: KycStatus::Unverified,
            identity_front_path: None,
            identity_back_path: None,
            selfie_path: None,
            extracted_identity: None,
            document_number: None,
            document_expiry_date: None,
            verified_at: None,
            selfie_verified_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a successful verification to this record.
    ///
    /// Sets the status to `verified`, stores the artifact paths and the
    /// extracted identity, and denormalizes `document_number` and
    /// `document_expiry_date` out of the extracted fields. The caller is
    /// responsible for validating the status transition first.
    pub fn apply_verified(&mut self, update: VerifiedIdentityUpdate) {
        self.kyc_status = KycStatus::Verified;
        self.document_number = update.identity.document_number.clone();
        self.document_expiry_date = update.identity.expiry_date;
        self.extracted_identity = Some(update.identity);
        self.identity_front_path = Some(update.identity_front_path);
        self.identity_back_path = update.identity_back_path;
        self.selfie_path = update.selfie_path;
        self.verified_at = Some(update.verified_at);
        self.selfie_verified_at = update.selfie_verified_at;
        self.updated_at = update.verified_at;
    }
}

/// The fields a successful verification writes to the tenant profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedIdentityUpdate {
    /// Identity fields extracted by the oracle.
    pub identity: ExtractedIdentity,
    /// Storage path of the document front.
    pub identity_front_path: String,
    /// Storage path of the document back, for two-sided kinds.
    pub identity_back_path: Option<String>,
    /// Storage path of the selfie, when one was captured.
    pub selfie_path: Option<String>,
    /// Resolution instant of the attempt.
    pub verified_at: DateTime<Utc>,
    /// Same instant when a selfie was part of the attempt, `None` otherwise.
    pub selfie_verified_at: Option<DateTime<Utc>>,
}

// ─── Lease Documents ─────────────────────────────────────────────────

/// One lease-scoped identity document row.
///
/// Many rows per lease over time; the invariant is that at most one row
/// per `(lease_id, doc_type)` has `is_archived = false` at any instant.
/// Enforced by archive-then-insert in the repositories, never by
/// update-in-place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaseDocumentRecord {
    pub id: Uuid,
    pub doc_type: LeaseDocumentType,
    pub title: String,
    pub lease_id: LeaseId,
    pub tenant_id: TenantId,
    /// Artifact storage path of the underlying capture.
    pub storage_path: String,
    /// Document expiry date when the oracle extracted one.
    pub expiry_date: Option<NaiveDate>,
    pub verification_status: KycStatus,
    pub is_archived: bool,
    /// Structured context: tenant contact, verification method.
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new lease document row.
///
/// The repository assigns the row id and timestamp and always inserts
/// with `is_archived = false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLeaseDocument {
    pub doc_type: LeaseDocumentType,
    pub title: String,
    pub lease_id: LeaseId,
    pub tenant_id: TenantId,
    pub storage_path: String,
    pub expiry_date: Option<NaiveDate>,
    pub verification_status: KycStatus,
    pub metadata: serde_json::Value,
}

impl NewLeaseDocument {
    /// Materialize the insert payload as the row it becomes: fresh id,
    /// current timestamp, active (not archived).
    pub fn into_record(self) -> LeaseDocumentRecord {
        LeaseDocumentRecord {
            id: Uuid::new_v4(),
            doc_type: self.doc_type,
            title: self.title,
            lease_id: self.lease_id,
            tenant_id: self.tenant_id,
            storage_path: self.storage_path,
            expiry_date: self.expiry_date,
            verification_status: self.verification_status,
            is_archived: false,
            metadata: self.metadata,
            created_at: Utc::now(),
        }
    }
}

// ─── Audit Log ───────────────────────────────────────────────────────

/// One append-only audit log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: AuditEventId,
    pub actor_id: TenantId,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Append payload for a new audit event. The repository assigns the
/// event id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuditEvent {
    pub actor_id: TenantId,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub metadata: serde_json::Value,
}

impl NewAuditEvent {
    /// The one event a verification attempt emits: `identity_verified` on
    /// the tenant's own profile, carrying the document kind and the
    /// verification method in the metadata.
    pub fn identity_verified(tenant: TenantId, document_type: DocumentKind, method: &str) -> Self {
        let entity_id = *tenant.as_uuid();
        Self {
            actor_id: tenant,
            action: "identity_verified".to_string(),
            entity_type: "profile".to_string(),
            entity_id,
            metadata: serde_json::json!({
                "document_type": document_type.as_str(),
                "method": method,
            }),
        }
    }
}
