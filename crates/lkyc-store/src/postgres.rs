//! Postgres repositories.
//!
//! All queries are runtime `sqlx::query`/`query_as` against explicit
//! column lists. Status machine constraints are enforced at the
//! application layer (via `KycStatus::can_transition_to`), not in SQL.
//!
//! Structured columns (`extracted_identity`, `metadata`) are serialized
//! on the write path with hard errors — a record that cannot be encoded
//! is never half-written — and deserialized on the read path with logged
//! defaults, so one corrupt row degrades gracefully instead of wedging
//! every fan-out that touches it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use lkyc_core::{AuditEventId, KycStatus, LeaseId, TenantId};

use crate::error::StoreError;
use crate::records::{
    AuditEvent, LeaseDocumentRecord, LeaseDocumentType, LeaseRef, NewAuditEvent, NewLeaseDocument,
    SignerRole, TenantIdentityRecord, VerifiedIdentityUpdate,
};
use crate::repo::{ensure_status_transition, tenant_not_found, AuditRepo, IdentityRepo, LeaseRepo};

use async_trait::async_trait;

/// Serialize a structured column for persistence.
///
/// Write-path failures are hard errors — silently defaulting here would
/// persist a row that disagrees with what the caller verified.
fn serialize_column(what: &str, value: &impl Serialize) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(value).map_err(|e| {
        tracing::error!(error = %e, column = what, "failed to serialize structured column");
        StoreError::Serialization {
            what: what.to_string(),
            reason: e.to_string(),
        }
    })
}

// -- Identity Repository ------------------------------------------------------

/// Postgres tenant identity repository over the `tenant_identities` table.
#[derive(Debug, Clone)]
pub struct PgIdentityRepo {
    pool: PgPool,
}

impl PgIdentityRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn set_status(
        &self,
        tenant: &TenantId,
        to: KycStatus,
    ) -> Result<TenantIdentityRecord, StoreError> {
        let mut record = self
            .get(tenant)
            .await?
            .ok_or_else(|| tenant_not_found(tenant))?;
        ensure_status_transition(record.kyc_status, to)?;

        let updated_at = Utc::now();
        sqlx::query(
            "UPDATE tenant_identities SET kyc_status = $1, updated_at = $2 WHERE tenant_id = $3",
        )
        .bind(to.as_str())
        .bind(updated_at)
        .bind(*tenant.as_uuid())
        .execute(&self.pool)
        .await?;

        record.kyc_status = to;
        record.updated_at = updated_at;
        Ok(record)
    }
}

#[async_trait]
impl IdentityRepo for PgIdentityRepo {
    async fn get(&self, tenant: &TenantId) -> Result<Option<TenantIdentityRecord>, StoreError> {
        let row = sqlx::query_as::<_, IdentityRow>(
            "SELECT tenant_id, kyc_status, identity_front_path, identity_back_path, selfie_path,
             extracted_identity, document_number, document_expiry_date, verified_at,
             selfie_verified_at, created_at, updated_at
             FROM tenant_identities WHERE tenant_id = $1",
        )
        .bind(*tenant.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(IdentityRow::into_record))
    }

    async fn mark_processing(
        &self,
        tenant: &TenantId,
    ) -> Result<TenantIdentityRecord, StoreError> {
        self.set_status(tenant, KycStatus::Processing).await
    }

    async fn mark_verified(
        &self,
        tenant: &TenantId,
        update: VerifiedIdentityUpdate,
    ) -> Result<TenantIdentityRecord, StoreError> {
        let mut record = self
            .get(tenant)
            .await?
            .ok_or_else(|| tenant_not_found(tenant))?;
        ensure_status_transition(record.kyc_status, KycStatus::Verified)?;

        let identity_json = serialize_column("extracted_identity", &update.identity)?;
        record.apply_verified(update);

        sqlx::query(
            "UPDATE tenant_identities SET kyc_status = $1, identity_front_path = $2,
             identity_back_path = $3, selfie_path = $4, extracted_identity = $5,
             document_number = $6, document_expiry_date = $7, verified_at = $8,
             selfie_verified_at = $9, updated_at = $10
             WHERE tenant_id = $11",
        )
        .bind(record.kyc_status.as_str())
        .bind(&record.identity_front_path)
        .bind(&record.identity_back_path)
        .bind(&record.selfie_path)
        .bind(&identity_json)
        .bind(&record.document_number)
        .bind(record.document_expiry_date)
        .bind(record.verified_at)
        .bind(record.selfie_verified_at)
        .bind(record.updated_at)
        .bind(*tenant.as_uuid())
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    async fn mark_rejected(&self, tenant: &TenantId) -> Result<TenantIdentityRecord, StoreError> {
        self.set_status(tenant, KycStatus::Rejected).await
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct IdentityRow {
    tenant_id: Uuid,
    kyc_status: String,
    identity_front_path: Option<String>,
    identity_back_path: Option<String>,
    selfie_path: Option<String>,
    extracted_identity: Option<serde_json::Value>,
    document_number: Option<String>,
    document_expiry_date: Option<NaiveDate>,
    verified_at: Option<DateTime<Utc>>,
    selfie_verified_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl IdentityRow {
    fn into_record(self) -> TenantIdentityRecord {
        let kyc_status = self.kyc_status.parse::<KycStatus>().unwrap_or_else(|e| {
            tracing::error!(
                tenant_id = %self.tenant_id,
                status = %self.kyc_status,
                error = %e,
                "unknown kyc status in database — defaulting to unverified; \
                 investigate: this may indicate prior data corruption"
            );
            KycStatus::Unverified
        });

        let extracted_identity = self.extracted_identity.and_then(|value| {
            serde_json::from_value(value)
                .map_err(|e| {
                    tracing::error!(
                        tenant_id = %self.tenant_id,
                        error = %e,
                        "failed to deserialize extracted_identity — defaulting to empty"
                    );
                })
                .ok()
        });

        TenantIdentityRecord {
            tenant_id: TenantId(self.tenant_id),
            kyc_status,
            identity_front_path: self.identity_front_path,
            identity_back_path: self.identity_back_path,
            selfie_path: self.selfie_path,
            extracted_identity,
            document_number: self.document_number,
            document_expiry_date: self.document_expiry_date,
            verified_at: self.verified_at,
            selfie_verified_at: self.selfie_verified_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

// -- Lease Repository ---------------------------------------------------------

/// Postgres lease repository over the `lease_signers` and `lease_documents`
/// tables.
#[derive(Debug, Clone)]
pub struct PgLeaseRepo {
    pool: PgPool,
}

impl PgLeaseRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeaseRepo for PgLeaseRepo {
    async fn leases_for_signer(&self, tenant: &TenantId) -> Result<Vec<LeaseRef>, StoreError> {
        let rows = sqlx::query_as::<_, SignerRow>(
            "SELECT lease_id, role FROM lease_signers
             WHERE tenant_id = $1 AND role IN ('primary_tenant', 'co_tenant')",
        )
        .bind(*tenant.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                // Inclusion in the fan-out is what matters; an unknown role
                // string still syncs, as co-tenant.
                let role = row.role.parse::<SignerRole>().unwrap_or_else(|e| {
                    tracing::error!(
                        lease_id = %row.lease_id,
                        role = %row.role,
                        error = %e,
                        "unknown signer role in database — defaulting to co_tenant"
                    );
                    SignerRole::CoTenant
                });
                LeaseRef {
                    lease_id: LeaseId(row.lease_id),
                    role,
                }
            })
            .collect())
    }

    async fn active_document(
        &self,
        lease: &LeaseId,
        doc_type: LeaseDocumentType,
    ) -> Result<Option<LeaseDocumentRecord>, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, doc_type, title, lease_id, tenant_id, storage_path, expiry_date,
             verification_status, is_archived, metadata, created_at
             FROM lease_documents
             WHERE lease_id = $1 AND doc_type = $2 AND is_archived = FALSE
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(*lease.as_uuid())
        .bind(doc_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(DocumentRow::into_record))
    }

    async fn archive_document(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE lease_documents SET is_archived = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_document(
        &self,
        new: NewLeaseDocument,
    ) -> Result<LeaseDocumentRecord, StoreError> {
        let record = new.into_record();

        sqlx::query(
            "INSERT INTO lease_documents (id, doc_type, title, lease_id, tenant_id, storage_path,
             expiry_date, verification_status, is_archived, metadata, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(record.id)
        .bind(record.doc_type.as_str())
        .bind(&record.title)
        .bind(*record.lease_id.as_uuid())
        .bind(*record.tenant_id.as_uuid())
        .bind(&record.storage_path)
        .bind(record.expiry_date)
        .bind(record.verification_status.as_str())
        .bind(record.is_archived)
        .bind(&record.metadata)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(record)
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct SignerRow {
    lease_id: Uuid,
    role: String,
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    doc_type: String,
    title: String,
    lease_id: Uuid,
    tenant_id: Uuid,
    storage_path: String,
    expiry_date: Option<NaiveDate>,
    verification_status: String,
    is_archived: bool,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl DocumentRow {
    fn into_record(self) -> LeaseDocumentRecord {
        let doc_type = self.doc_type.parse::<LeaseDocumentType>().unwrap_or_else(|e| {
            tracing::error!(
                id = %self.id,
                doc_type = %self.doc_type,
                error = %e,
                "unknown lease document type in database — defaulting to identity_front; \
                 investigate: this may indicate prior data corruption"
            );
            LeaseDocumentType::IdentityFront
        });

        let verification_status =
            self.verification_status
                .parse::<KycStatus>()
                .unwrap_or_else(|e| {
                    tracing::error!(
                        id = %self.id,
                        status = %self.verification_status,
                        error = %e,
                        "unknown verification status in database — defaulting to unverified"
                    );
                    KycStatus::Unverified
                });

        LeaseDocumentRecord {
            id: self.id,
            doc_type,
            title: self.title,
            lease_id: LeaseId(self.lease_id),
            tenant_id: TenantId(self.tenant_id),
            storage_path: self.storage_path,
            expiry_date: self.expiry_date,
            verification_status,
            is_archived: self.is_archived,
            metadata: self.metadata,
            created_at: self.created_at,
        }
    }
}

// -- Audit Repository ---------------------------------------------------------

/// Postgres append-only audit log over the `audit_events` table.
#[derive(Debug, Clone)]
pub struct PgAuditRepo {
    pool: PgPool,
}

impl PgAuditRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepo for PgAuditRepo {
    async fn append(&self, event: NewAuditEvent) -> Result<AuditEventId, StoreError> {
        let id = AuditEventId::new();

        sqlx::query(
            "INSERT INTO audit_events (id, actor_id, action, entity_type, entity_id, metadata, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, NOW())",
        )
        .bind(*id.as_uuid())
        .bind(*event.actor_id.as_uuid())
        .bind(&event.action)
        .bind(&event.entity_type)
        .bind(event.entity_id)
        .bind(&event.metadata)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: Uuid,
    ) -> Result<Vec<AuditEvent>, StoreError> {
        let rows = sqlx::query_as::<_, AuditRow>(
            "SELECT id, actor_id, action, entity_type, entity_id, metadata, created_at
             FROM audit_events
             WHERE entity_type = $1 AND entity_id = $2
             ORDER BY created_at ASC",
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AuditRow::into_event).collect())
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct AuditRow {
    id: Uuid,
    actor_id: Uuid,
    action: String,
    entity_type: String,
    entity_id: Uuid,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl AuditRow {
    fn into_event(self) -> AuditEvent {
        AuditEvent {
            id: AuditEventId(self.id),
            actor_id: TenantId(self.actor_id),
            action: self.action,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            metadata: self.metadata,
            created_at: self.created_at,
        }
    }
}
