//! # Result Synchronizer
//!
//! Persists a successful oracle verdict: the tenant's profile record
//! first, then a fan-out to every lease where the tenant signs, then one
//! audit event for the attempt.
//!
//! ## Failure Semantics
//!
//! The profile write is the only hard error: until `kyc_status` is
//! `verified` nothing durable has happened and the caller can still
//! resolve the attempt as rejected. Everything after it is best-effort.
//! A lease that cannot be synced is logged and counted in the report,
//! never rolled back or retried here; the identity is already verified
//! at the profile level, and per-lease documents can be reconciled out
//! of band from the profile record.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use lkyc_client::{ArtifactHandle, OracleVerdict, SubmittedArtifacts};
use lkyc_core::{AuditEventId, DocumentKind, DocumentSide, KycStatus, TenantId};
use lkyc_store::{
    AuditRepo, IdentityRepo, LeaseDocumentType, LeaseRef, LeaseRepo, NewAuditEvent,
    NewLeaseDocument, StoreError, TenantIdentityRecord, VerifiedIdentityUpdate,
};

// ─── Sync Report ─────────────────────────────────────────────────────

/// What one synchronization run actually wrote.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// Leases whose document records were archived and re-inserted.
    pub leases_updated: usize,
    /// Leases skipped because a write failed; logged, not retried.
    pub leases_failed: usize,
    /// The audit event appended for the attempt, when the append
    /// succeeded.
    pub audit_event_id: Option<AuditEventId>,
}

// ─── Synchronizer ────────────────────────────────────────────────────

/// Fans a verified identity out to the tenant profile, the signer
/// leases, and the audit log.
#[derive(Clone)]
pub struct ResultSynchronizer {
    identities: Arc<dyn IdentityRepo>,
    leases: Arc<dyn LeaseRepo>,
    audit: Arc<dyn AuditRepo>,
}

impl std::fmt::Debug for ResultSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultSynchronizer").finish_non_exhaustive()
    }
}

impl ResultSynchronizer {
    /// Create a synchronizer over the given repositories.
    pub fn new(
        identities: Arc<dyn IdentityRepo>,
        leases: Arc<dyn LeaseRepo>,
        audit: Arc<dyn AuditRepo>,
    ) -> Self {
        Self {
            identities,
            leases,
            audit,
        }
    }

    /// Persist a verified attempt.
    ///
    /// Marks the profile `verified` (hard error if the transition is
    /// illegal or the write fails), then archive-then-inserts the
    /// identity documents on every signer lease, then appends exactly
    /// one `identity_verified` audit event regardless of how many
    /// leases were touched.
    pub async fn apply(
        &self,
        tenant: &TenantId,
        document_type: DocumentKind,
        artifacts: &SubmittedArtifacts,
        verdict: OracleVerdict,
    ) -> Result<SyncReport, StoreError> {
        let verified_at = Utc::now();
        let update = VerifiedIdentityUpdate {
            identity: verdict.identity,
            identity_front_path: artifacts.recto.path.clone(),
            identity_back_path: artifacts.verso.as_ref().map(|h| h.path.clone()),
            selfie_path: artifacts.selfie.as_ref().map(|h| h.path.clone()),
            verified_at,
            selfie_verified_at: artifacts.selfie.as_ref().map(|_| verified_at),
        };
        let record = self.identities.mark_verified(tenant, update).await?;
        tracing::info!(
            tenant = %tenant,
            document_type = %document_type,
            "tenant identity verified"
        );

        let roster = match self.leases.leases_for_signer(tenant).await {
            Ok(roster) => roster,
            Err(e) => {
                tracing::error!(
                    tenant = %tenant,
                    error = %e,
                    "could not enumerate signer leases — skipping lease sync"
                );
                Vec::new()
            }
        };

        let method = if artifacts.selfie.is_some() {
            "document_selfie"
        } else {
            "document"
        };
        let mut leases_updated = 0;
        let mut leases_failed = 0;
        for lease_ref in &roster {
            match self
                .sync_lease(&record, lease_ref, document_type, artifacts, method)
                .await
            {
                Ok(()) => leases_updated += 1,
                Err(e) => {
                    leases_failed += 1;
                    tracing::error!(
                        tenant = %tenant,
                        lease = %lease_ref.lease_id,
                        error = %e,
                        "lease document sync failed — continuing with remaining leases"
                    );
                }
            }
        }

        let event = NewAuditEvent::identity_verified(tenant.clone(), document_type, method);
        let audit_event_id = match self.audit.append(event).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::error!(
                    tenant = %tenant,
                    error = %e,
                    "could not append audit event for verified attempt"
                );
                None
            }
        };

        Ok(SyncReport {
            leases_updated,
            leases_failed,
            audit_event_id,
        })
    }

    /// Replace the identity documents of one lease with the freshly
    /// verified captures: the front side always, the back side when one
    /// was part of the attempt.
    async fn sync_lease(
        &self,
        record: &TenantIdentityRecord,
        lease: &LeaseRef,
        document_type: DocumentKind,
        artifacts: &SubmittedArtifacts,
        method: &str,
    ) -> Result<(), StoreError> {
        self.replace_document(
            record,
            lease,
            document_type,
            DocumentSide::Recto,
            &artifacts.recto,
            method,
        )
        .await?;
        if let Some(verso) = &artifacts.verso {
            self.replace_document(record, lease, document_type, DocumentSide::Verso, verso, method)
                .await?;
        }
        Ok(())
    }

    /// Archive-then-insert one `(lease, doc_type)` document. Never
    /// update-in-place: the prior version stays queryable as history.
    async fn replace_document(
        &self,
        record: &TenantIdentityRecord,
        lease: &LeaseRef,
        document_type: DocumentKind,
        side: DocumentSide,
        handle: &ArtifactHandle,
        method: &str,
    ) -> Result<(), StoreError> {
        let doc_type = LeaseDocumentType::from(side);
        if let Some(existing) = self
            .leases
            .active_document(&lease.lease_id, doc_type)
            .await?
        {
            self.leases.archive_document(existing.id).await?;
        }
        let tenant_name = record
            .extracted_identity
            .as_ref()
            .map(|i| format!("{} {}", i.first_name, i.name));
        self.leases
            .insert_document(NewLeaseDocument {
                doc_type,
                title: doc_type.title().to_string(),
                lease_id: lease.lease_id.clone(),
                tenant_id: record.tenant_id.clone(),
                storage_path: handle.path.clone(),
                expiry_date: record.document_expiry_date,
                verification_status: KycStatus::Verified,
                metadata: serde_json::json!({
                    "document_type": document_type.as_str(),
                    "signer_role": lease.role.as_str(),
                    "checksum": handle.checksum,
                    "tenant_name": tenant_name,
                    "method": method,
                }),
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;
    use lkyc_core::{ExtractedIdentity, LeaseId};
    use lkyc_store::{MemoryAuditRepo, MemoryIdentityRepo, MemoryLeaseRepo, SignerRole};

    fn identity() -> ExtractedIdentity {
        ExtractedIdentity {
            name: "Martin".to_string(),
            first_name: "Claire".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1991, 3, 14),
            birth_place: None,
            sex: None,
            nationality: Some("FRA".to_string()),
            document_number: Some("19FC03146".to_string()),
            expiry_date: NaiveDate::from_ymd_opt(2031, 3, 13),
        }
    }

    fn handle(path: &str) -> ArtifactHandle {
        ArtifactHandle {
            path: path.to_string(),
            content_type: "image/jpeg".to_string(),
            size_bytes: 4,
            checksum: "0".repeat(64),
            created_at: Utc::now(),
        }
    }

    fn two_sided_artifacts() -> SubmittedArtifacts {
        SubmittedArtifacts {
            recto: handle("identity/t/national_id_recto_1.jpg"),
            verso: Some(handle("identity/t/national_id_verso_2.jpg")),
            selfie: Some(handle("identity/t/national_id_selfie_3.jpg")),
        }
    }

    struct Rig {
        sync: ResultSynchronizer,
        identities: MemoryIdentityRepo,
        leases: MemoryLeaseRepo,
        audit: MemoryAuditRepo,
    }

    /// A synchronizer over fresh memory repos, with the tenant seeded
    /// and already carrying the processing marker.
    async fn rig(tenant: &TenantId) -> Rig {
        let identities = MemoryIdentityRepo::new();
        identities.insert(TenantIdentityRecord::unverified(tenant.clone()));
        identities.mark_processing(tenant).await.unwrap();
        let leases = MemoryLeaseRepo::new();
        let audit = MemoryAuditRepo::new();
        let sync = ResultSynchronizer::new(
            Arc::new(identities.clone()),
            Arc::new(leases.clone()),
            Arc::new(audit.clone()),
        );
        Rig {
            sync,
            identities,
            leases,
            audit,
        }
    }

    fn verdict() -> OracleVerdict {
        OracleVerdict {
            confidence: 0.97,
            identity: identity(),
        }
    }

    #[tokio::test]
    async fn apply_verifies_profile_and_fans_out_to_all_leases() {
        let tenant = TenantId::new();
        let rig = rig(&tenant).await;
        let lease_a = LeaseId::new();
        let lease_b = LeaseId::new();
        rig.leases
            .add_signer(lease_a.clone(), tenant.clone(), SignerRole::PrimaryTenant);
        rig.leases
            .add_signer(lease_b.clone(), tenant.clone(), SignerRole::CoTenant);

        let report = rig
            .sync
            .apply(&tenant, DocumentKind::NationalId, &two_sided_artifacts(), verdict())
            .await
            .unwrap();

        assert_eq!(report.leases_updated, 2);
        assert_eq!(report.leases_failed, 0);
        assert!(report.audit_event_id.is_some());

        let record = rig.identities.get(&tenant).await.unwrap().unwrap();
        assert_eq!(record.kyc_status, KycStatus::Verified);
        assert_eq!(
            record.identity_front_path.as_deref(),
            Some("identity/t/national_id_recto_1.jpg")
        );
        assert_eq!(record.document_number.as_deref(), Some("19FC03146"));
        assert!(record.selfie_verified_at.is_some());

        for lease in [&lease_a, &lease_b] {
            let front = rig
                .leases
                .active_document(lease, LeaseDocumentType::IdentityFront)
                .await
                .unwrap()
                .expect("front document");
            assert_eq!(front.storage_path, "identity/t/national_id_recto_1.jpg");
            assert_eq!(front.verification_status, KycStatus::Verified);
            assert_eq!(front.expiry_date, NaiveDate::from_ymd_opt(2031, 3, 13));
            assert_eq!(front.metadata["tenant_name"], "Claire Martin");
            assert_eq!(front.metadata["method"], "document_selfie");
            assert!(rig
                .leases
                .active_document(lease, LeaseDocumentType::IdentityBack)
                .await
                .unwrap()
                .is_some());
        }
    }

    #[tokio::test]
    async fn apply_archives_prior_documents_instead_of_updating() {
        let tenant = TenantId::new();
        let rig = rig(&tenant).await;
        let lease = LeaseId::new();
        rig.leases
            .add_signer(lease.clone(), tenant.clone(), SignerRole::PrimaryTenant);
        rig.leases
            .insert_document(NewLeaseDocument {
                doc_type: LeaseDocumentType::IdentityFront,
                title: LeaseDocumentType::IdentityFront.title().to_string(),
                lease_id: lease.clone(),
                tenant_id: tenant.clone(),
                storage_path: "identity/t/old_front.jpg".to_string(),
                expiry_date: None,
                verification_status: KycStatus::Verified,
                metadata: serde_json::json!({}),
            })
            .await
            .unwrap();

        rig.sync
            .apply(&tenant, DocumentKind::NationalId, &two_sided_artifacts(), verdict())
            .await
            .unwrap();

        let history = rig
            .leases
            .documents_for(&lease, LeaseDocumentType::IdentityFront);
        assert_eq!(history.len(), 2);
        assert_eq!(history.iter().filter(|d| !d.is_archived).count(), 1);
        let active = rig
            .leases
            .active_document(&lease, LeaseDocumentType::IdentityFront)
            .await
            .unwrap()
            .expect("active front");
        assert_eq!(active.storage_path, "identity/t/national_id_recto_1.jpg");
    }

    #[tokio::test]
    async fn apply_one_sided_kind_syncs_front_only() {
        let tenant = TenantId::new();
        let rig = rig(&tenant).await;
        let lease = LeaseId::new();
        rig.leases
            .add_signer(lease.clone(), tenant.clone(), SignerRole::PrimaryTenant);

        let artifacts = SubmittedArtifacts {
            recto: handle("identity/t/passport_recto_1.jpg"),
            verso: None,
            selfie: Some(handle("identity/t/passport_selfie_2.jpg")),
        };
        rig.sync
            .apply(&tenant, DocumentKind::Passport, &artifacts, verdict())
            .await
            .unwrap();

        assert!(rig
            .leases
            .active_document(&lease, LeaseDocumentType::IdentityFront)
            .await
            .unwrap()
            .is_some());
        assert!(rig
            .leases
            .active_document(&lease, LeaseDocumentType::IdentityBack)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn apply_is_best_effort_per_lease() {
        let tenant = TenantId::new();
        let rig = rig(&tenant).await;
        let healthy = LeaseId::new();
        let broken = LeaseId::new();
        rig.leases
            .add_signer(healthy.clone(), tenant.clone(), SignerRole::PrimaryTenant);
        rig.leases
            .add_signer(broken.clone(), tenant.clone(), SignerRole::CoTenant);
        rig.leases.fail_lease(&broken, "partition injected");

        let report = rig
            .sync
            .apply(&tenant, DocumentKind::NationalId, &two_sided_artifacts(), verdict())
            .await
            .unwrap();

        assert_eq!(report.leases_updated, 1);
        assert_eq!(report.leases_failed, 1);
        // The profile result is unaffected by the lease failure.
        let record = rig.identities.get(&tenant).await.unwrap().unwrap();
        assert_eq!(record.kyc_status, KycStatus::Verified);
        assert!(rig
            .leases
            .active_document(&healthy, LeaseDocumentType::IdentityFront)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn apply_emits_exactly_one_audit_event() {
        let tenant = TenantId::new();
        let rig = rig(&tenant).await;
        for _ in 0..3 {
            rig.leases
                .add_signer(LeaseId::new(), tenant.clone(), SignerRole::CoTenant);
        }

        rig.sync
            .apply(&tenant, DocumentKind::NationalId, &two_sided_artifacts(), verdict())
            .await
            .unwrap();

        assert_eq!(rig.audit.len(), 1);
        let events = rig
            .audit
            .list_for_entity("profile", *tenant.as_uuid())
            .await
            .unwrap();
        assert_eq!(events[0].action, "identity_verified");
        assert_eq!(events[0].metadata["method"], "document_selfie");
    }

    #[tokio::test]
    async fn apply_without_selfie_records_document_method() {
        let tenant = TenantId::new();
        let rig = rig(&tenant).await;

        let artifacts = SubmittedArtifacts {
            recto: handle("identity/t/passport_recto_1.jpg"),
            verso: None,
            selfie: None,
        };
        rig.sync
            .apply(&tenant, DocumentKind::Passport, &artifacts, verdict())
            .await
            .unwrap();

        let record = rig.identities.get(&tenant).await.unwrap().unwrap();
        assert!(record.selfie_path.is_none());
        assert!(record.selfie_verified_at.is_none());
        let events = rig
            .audit
            .list_for_entity("profile", *tenant.as_uuid())
            .await
            .unwrap();
        assert_eq!(events[0].metadata["method"], "document");
    }

    #[tokio::test]
    async fn apply_without_processing_marker_is_a_hard_error() {
        let tenant = TenantId::new();
        let identities = MemoryIdentityRepo::new();
        identities.insert(TenantIdentityRecord::unverified(tenant.clone()));
        let leases = MemoryLeaseRepo::new();
        let audit = MemoryAuditRepo::new();
        leases.add_signer(LeaseId::new(), tenant.clone(), SignerRole::PrimaryTenant);
        let sync = ResultSynchronizer::new(
            Arc::new(identities.clone()),
            Arc::new(leases.clone()),
            Arc::new(audit.clone()),
        );

        let err = sync
            .apply(&tenant, DocumentKind::NationalId, &two_sided_artifacts(), verdict())
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::InvalidStatusTransition { .. }));
        // Nothing downstream of the profile write may have happened.
        assert!(audit.is_empty());
        let record = identities.get(&tenant).await.unwrap().unwrap();
        assert_eq!(record.kyc_status, KycStatus::Unverified);
    }
}
