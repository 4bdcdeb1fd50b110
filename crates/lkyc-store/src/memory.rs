//! In-memory repositories for tests and local development.
//!
//! Built on a generic thread-safe [`Store`]. The memory backends honor the
//! same contracts as the Postgres ones: status writes are validated against
//! the KYC transition matrix, document history is archive-then-insert, the
//! audit log is append-only. [`MemoryLeaseRepo`] additionally supports
//! per-lease failure injection so the best-effort fan-out semantics of the
//! result synchronizer can be exercised.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use lkyc_core::{AuditEventId, KycStatus, LeaseId, TenantId};

use crate::error::StoreError;
use crate::records::{
    AuditEvent, LeaseDocumentRecord, LeaseDocumentType, LeaseRef, NewAuditEvent, NewLeaseDocument,
    SignerRole, TenantIdentityRecord, VerifiedIdentityUpdate,
};
use crate::repo::{ensure_status_transition, tenant_not_found, AuditRepo, IdentityRepo, LeaseRepo};

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
///
/// All operations are synchronous (the RwLock is `parking_lot`, not
/// `tokio::sync`) because the lock is never held across `.await` points.
/// `parking_lot::RwLock` is non-poisonable — a panicking writer does not
/// permanently corrupt the store.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: Uuid, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Retrieve a record by ID.
    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// List all records.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// Update a record in place. Returns the updated record, or `None` if not found.
    pub fn update(&self, id: &Uuid, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut guard = self.data.write();
        if let Some(entry) = guard.get_mut(id) {
            f(entry);
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Atomically read-validate-update a record.
    ///
    /// The closure receives a `&mut T` and may inspect the current state,
    /// validate preconditions, mutate the record, and return `Ok(R)` or
    /// `Err(E)`. The entire operation runs under a single write lock,
    /// eliminating TOCTOU races between read and update.
    ///
    /// Returns `None` if the record doesn't exist, or `Some(result)` with
    /// the closure's `Result`.
    pub fn try_update<R, E>(
        &self,
        id: &Uuid,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(id).map(f)
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

// -- Identity Repository ------------------------------------------------------

/// In-memory tenant identity repository.
#[derive(Debug, Clone, Default)]
pub struct MemoryIdentityRepo {
    tenants: Store<TenantIdentityRecord>,
}

impl MemoryIdentityRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a profile record. Test/dev setup; production profiles are
    /// created by the profile subsystem, not by this crate.
    pub fn insert(&self, record: TenantIdentityRecord) {
        self.tenants.insert(*record.tenant_id.as_uuid(), record);
    }
}

#[async_trait]
impl IdentityRepo for MemoryIdentityRepo {
    async fn get(&self, tenant: &TenantId) -> Result<Option<TenantIdentityRecord>, StoreError> {
        Ok(self.tenants.get(tenant.as_uuid()))
    }

    async fn mark_processing(
        &self,
        tenant: &TenantId,
    ) -> Result<TenantIdentityRecord, StoreError> {
        self.tenants
            .try_update(tenant.as_uuid(), |record| {
                ensure_status_transition(record.kyc_status, KycStatus::Processing)?;
                record.kyc_status = KycStatus::Processing;
                record.updated_at = Utc::now();
                Ok(record.clone())
            })
            .ok_or_else(|| tenant_not_found(tenant))?
    }

    async fn mark_verified(
        &self,
        tenant: &TenantId,
        update: VerifiedIdentityUpdate,
    ) -> Result<TenantIdentityRecord, StoreError> {
        self.tenants
            .try_update(tenant.as_uuid(), |record| {
                ensure_status_transition(record.kyc_status, KycStatus::Verified)?;
                record.apply_verified(update);
                Ok(record.clone())
            })
            .ok_or_else(|| tenant_not_found(tenant))?
    }

    async fn mark_rejected(&self, tenant: &TenantId) -> Result<TenantIdentityRecord, StoreError> {
        self.tenants
            .try_update(tenant.as_uuid(), |record| {
                ensure_status_transition(record.kyc_status, KycStatus::Rejected)?;
                record.kyc_status = KycStatus::Rejected;
                record.updated_at = Utc::now();
                Ok(record.clone())
            })
            .ok_or_else(|| tenant_not_found(tenant))?
    }
}

// -- Lease Repository ---------------------------------------------------------

#[derive(Debug, Clone)]
struct SignerRow {
    lease_id: LeaseId,
    tenant_id: TenantId,
    role: SignerRole,
}

/// In-memory lease membership and lease-document repository.
///
/// Signer rows are seeded via [`MemoryLeaseRepo::add_signer`]; documents
/// go through the trait methods so the archive-then-insert discipline is
/// exercised the same way as against Postgres.
#[derive(Debug, Clone, Default)]
pub struct MemoryLeaseRepo {
    signers: Arc<RwLock<Vec<SignerRow>>>,
    documents: Store<LeaseDocumentRecord>,
    failing_leases: Arc<Mutex<HashMap<Uuid, String>>>,
}

impl MemoryLeaseRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a signer on a lease.
    pub fn add_signer(&self, lease: LeaseId, tenant: TenantId, role: SignerRole) {
        self.signers.write().push(SignerRow {
            lease_id: lease,
            tenant_id: tenant,
            role,
        });
    }

    /// Make every document write touching `lease` fail with the given
    /// reason, until the repo is dropped. Failure injection for
    /// best-effort fan-out tests.
    pub fn fail_lease(&self, lease: &LeaseId, reason: &str) {
        self.failing_leases
            .lock()
            .insert(*lease.as_uuid(), reason.to_string());
    }

    fn check_lease_writable(&self, lease: &LeaseId) -> Result<(), StoreError> {
        if let Some(reason) = self.failing_leases.lock().get(lease.as_uuid()) {
            return Err(StoreError::Unavailable {
                reason: reason.clone(),
            });
        }
        Ok(())
    }

    /// All rows of a `(lease, doc_type)` pair, newest first. History
    /// assertions in tests.
    pub fn documents_for(
        &self,
        lease: &LeaseId,
        doc_type: LeaseDocumentType,
    ) -> Vec<LeaseDocumentRecord> {
        let mut docs: Vec<_> = self
            .documents
            .list()
            .into_iter()
            .filter(|d| d.lease_id == *lease && d.doc_type == doc_type)
            .collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        docs
    }
}

#[async_trait]
impl LeaseRepo for MemoryLeaseRepo {
    async fn leases_for_signer(&self, tenant: &TenantId) -> Result<Vec<LeaseRef>, StoreError> {
        Ok(self
            .signers
            .read()
            .iter()
            .filter(|row| row.tenant_id == *tenant)
            .map(|row| LeaseRef {
                lease_id: row.lease_id.clone(),
                role: row.role,
            })
            .collect())
    }

    async fn active_document(
        &self,
        lease: &LeaseId,
        doc_type: LeaseDocumentType,
    ) -> Result<Option<LeaseDocumentRecord>, StoreError> {
        Ok(self
            .documents
            .list()
            .into_iter()
            .filter(|d| d.lease_id == *lease && d.doc_type == doc_type && !d.is_archived)
            .max_by_key(|d| d.created_at))
    }

    async fn archive_document(&self, id: Uuid) -> Result<bool, StoreError> {
        if let Some(doc) = self.documents.get(&id) {
            self.check_lease_writable(&doc.lease_id)?;
        }
        Ok(self
            .documents
            .update(&id, |d| d.is_archived = true)
            .is_some())
    }

    async fn insert_document(
        &self,
        new: NewLeaseDocument,
    ) -> Result<LeaseDocumentRecord, StoreError> {
        self.check_lease_writable(&new.lease_id)?;
        let record = new.into_record();
        self.documents.insert(record.id, record.clone());
        Ok(record)
    }
}

// -- Audit Repository ---------------------------------------------------------

/// In-memory append-only audit log.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditRepo {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl MemoryAuditRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of recorded events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[async_trait]
impl AuditRepo for MemoryAuditRepo {
    async fn append(&self, event: NewAuditEvent) -> Result<AuditEventId, StoreError> {
        let id = AuditEventId::new();
        self.events.lock().push(AuditEvent {
            id: id.clone(),
            actor_id: event.actor_id,
            action: event.action,
            entity_type: event.entity_type,
            entity_id: event.entity_id,
            metadata: event.metadata,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: Uuid,
    ) -> Result<Vec<AuditEvent>, StoreError> {
        Ok(self
            .events
            .lock()
            .iter()
            .filter(|e| e.entity_type == entity_type && e.entity_id == entity_id)
            .cloned()
            .collect())
    }
}
