//! Repository traits for the three persistence concerns.
//!
//! The engine consumes these traits, never a concrete backend: tests run
//! against [`crate::memory`], deployments against [`crate::postgres`].
//! All traits are object-safe; the engine holds them as `Arc<dyn _>`.

use async_trait::async_trait;
use uuid::Uuid;

use lkyc_core::{AuditEventId, KycStatus, LeaseId, TenantId};

use crate::error::StoreError;
use crate::records::{
    AuditEvent, LeaseDocumentRecord, LeaseDocumentType, LeaseRef, NewAuditEvent, NewLeaseDocument,
    TenantIdentityRecord, VerifiedIdentityUpdate,
};

/// Validate a status write against the transition matrix. Every backend
/// runs this before touching `kyc_status`.
pub(crate) fn ensure_status_transition(from: KycStatus, to: KycStatus) -> Result<(), StoreError> {
    if from.can_transition_to(to) {
        return Ok(());
    }
    Err(StoreError::InvalidStatusTransition {
        from: from.to_string(),
        to: to.to_string(),
    })
}

pub(crate) fn tenant_not_found(tenant: &TenantId) -> StoreError {
    StoreError::NotFound {
        what: format!("tenant identity {tenant}"),
    }
}

/// Tenant identity profile repository.
///
/// Every status write validates the transition against
/// [`lkyc_core::KycStatus::can_transition_to`] and fails with
/// [`StoreError::InvalidStatusTransition`] on an illegal jump, so a
/// submission attempt can never corrupt a profile into an unreachable
/// status.
#[async_trait]
pub trait IdentityRepo: Send + Sync {
    /// Fetch a tenant's identity record.
    async fn get(&self, tenant: &TenantId) -> Result<Option<TenantIdentityRecord>, StoreError>;

    /// Mark an attempt in flight: `kyc_status = processing`.
    ///
    /// The processing marker of the submission pipeline; it runs only
    /// after every artifact upload succeeded.
    async fn mark_processing(&self, tenant: &TenantId)
        -> Result<TenantIdentityRecord, StoreError>;

    /// Resolve an attempt as verified and write the extracted identity,
    /// artifact paths, and verification timestamps.
    async fn mark_verified(
        &self,
        tenant: &TenantId,
        update: VerifiedIdentityUpdate,
    ) -> Result<TenantIdentityRecord, StoreError>;

    /// Resolve an attempt as rejected.
    async fn mark_rejected(&self, tenant: &TenantId) -> Result<TenantIdentityRecord, StoreError>;
}

/// Lease membership and lease-document repository.
#[async_trait]
pub trait LeaseRepo: Send + Sync {
    /// Every lease where the tenant holds a signer role (primary tenant
    /// or co-tenant). The fan-out read of the result synchronizer.
    async fn leases_for_signer(&self, tenant: &TenantId) -> Result<Vec<LeaseRef>, StoreError>;

    /// The at-most-one active (non-archived) document of a
    /// `(lease, doc_type)` pair.
    async fn active_document(
        &self,
        lease: &LeaseId,
        doc_type: LeaseDocumentType,
    ) -> Result<Option<LeaseDocumentRecord>, StoreError>;

    /// Archive one document row. Returns whether a row was archived.
    async fn archive_document(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Insert a new active document row.
    async fn insert_document(
        &self,
        new: NewLeaseDocument,
    ) -> Result<LeaseDocumentRecord, StoreError>;
}

/// Append-only audit log repository.
#[async_trait]
pub trait AuditRepo: Send + Sync {
    /// Append one event; returns its assigned id.
    async fn append(&self, event: NewAuditEvent) -> Result<AuditEventId, StoreError>;

    /// Events recorded against one entity, oldest first.
    async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: Uuid,
    ) -> Result<Vec<AuditEvent>, StoreError>;
}
