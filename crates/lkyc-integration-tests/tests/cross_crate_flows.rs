//! # End-to-End Capture Journeys
//!
//! Walks the full stack across every crate seam: flow machine → driver →
//! pipeline → artifact store → oracle → repositories. The first journey
//! runs over the real filesystem store to prove the bytes a tenant
//! captures are the bytes the profile record points at.

use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::Mutex;

use lkyc_client::{sha256_hex, ArtifactStore, FsArtifactStore, MemoryArtifactStore, MockOracle};
use lkyc_core::{DocumentKind, ExtractedIdentity, KycStatus, LeaseId, TenantId};
use lkyc_engine::{CompletionHandler, FlowDriver, ResultSynchronizer, SubmissionPipeline};
use lkyc_flow::{CaptureBlob, FlowStep};
use lkyc_store::{
    IdentityRepo, LeaseDocumentType, MemoryAuditRepo, MemoryIdentityRepo, MemoryLeaseRepo,
    SignerRole, TenantIdentityRecord,
};

const RECTO_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x01];
const VERSO_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x02];
const SELFIE_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x03];

#[derive(Default)]
struct RecordingHandler {
    successes: Mutex<Vec<ExtractedIdentity>>,
}

impl CompletionHandler for RecordingHandler {
    fn on_success(&self, identity: &ExtractedIdentity) {
        self.successes.lock().push(identity.clone());
    }

    fn on_skip(&self) {}

    fn on_help(&self) {}
}

fn identity() -> ExtractedIdentity {
    ExtractedIdentity {
        name: "Martin".to_string(),
        first_name: "Claire".to_string(),
        birth_date: NaiveDate::from_ymd_opt(1991, 3, 14),
        birth_place: Some("Lyon".to_string()),
        sex: None,
        nationality: Some("FRA".to_string()),
        document_number: Some("19FC03146".to_string()),
        expiry_date: NaiveDate::from_ymd_opt(2031, 3, 13),
    }
}

fn jpeg(bytes: &[u8]) -> CaptureBlob {
    CaptureBlob::jpeg(bytes.to_vec())
}

struct Backends {
    identities: MemoryIdentityRepo,
    leases: MemoryLeaseRepo,
    audit: MemoryAuditRepo,
}

/// Fresh memory repositories with the tenant seeded as unverified.
fn backends(tenant: &TenantId) -> Backends {
    let identities = MemoryIdentityRepo::new();
    identities.insert(TenantIdentityRecord::unverified(tenant.clone()));
    Backends {
        identities,
        leases: MemoryLeaseRepo::new(),
        audit: MemoryAuditRepo::new(),
    }
}

fn driver_over(
    tenant: &TenantId,
    store: Arc<dyn ArtifactStore>,
    oracle: MockOracle,
    backends: &Backends,
    handler: Arc<RecordingHandler>,
) -> FlowDriver {
    let synchronizer = ResultSynchronizer::new(
        Arc::new(backends.identities.clone()),
        Arc::new(backends.leases.clone()),
        Arc::new(backends.audit.clone()),
    );
    let pipeline = SubmissionPipeline::new(
        store,
        Arc::new(oracle),
        Arc::new(backends.identities.clone()),
        synchronizer,
    );
    FlowDriver::new(tenant.clone(), pipeline, handler)
}

#[tokio::test]
async fn passport_flow_persists_artifacts_to_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(FsArtifactStore::new(tmp.path()));
    let tenant = TenantId::new();
    let backends = backends(&tenant);
    let lease = LeaseId::new();
    backends
        .leases
        .add_signer(lease.clone(), tenant.clone(), SignerRole::PrimaryTenant);
    let handler = Arc::new(RecordingHandler::default());
    let mut driver = driver_over(
        &tenant,
        store.clone(),
        MockOracle::verifying(identity()),
        &backends,
        handler.clone(),
    );

    driver.start().unwrap();
    driver.select_document(DocumentKind::Passport).unwrap();
    assert_eq!(
        driver.capture_recto(jpeg(RECTO_BYTES)).unwrap(),
        FlowStep::Selfie,
        "passport has no verso step"
    );
    let step = driver.capture_selfie(jpeg(SELFIE_BYTES)).await.unwrap();
    assert_eq!(step, FlowStep::Success);

    // The profile record points at real files holding the captured bytes.
    let record = backends.identities.get(&tenant).await.unwrap().unwrap();
    assert_eq!(record.kyc_status, KycStatus::Verified);
    let front_path = record.identity_front_path.clone().unwrap();
    let front_bytes = std::fs::read(store.file_path(&front_path)).unwrap();
    assert_eq!(front_bytes, RECTO_BYTES);
    let selfie_path = record.selfie_path.clone().unwrap();
    let selfie_bytes = std::fs::read(store.file_path(&selfie_path)).unwrap();
    assert_eq!(selfie_bytes, SELFIE_BYTES);
    assert!(record.identity_back_path.is_none());
    assert_eq!(record.document_number.as_deref(), Some("19FC03146"));

    // The lease document row carries the same path plus the blob checksum.
    let docs = backends
        .leases
        .documents_for(&lease, LeaseDocumentType::IdentityFront);
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].storage_path, front_path);
    assert_eq!(
        docs[0].metadata["checksum"].as_str(),
        Some(sha256_hex(RECTO_BYTES).as_str())
    );
    assert_eq!(backends.audit.len(), 1);

    // Identity reaches the embedding only on explicit continue.
    assert!(handler.successes.lock().is_empty());
    driver.continue_after_success().unwrap();
    let successes = handler.successes.lock();
    assert_eq!(successes.len(), 1);
    assert_eq!(successes[0].document_number.as_deref(), Some("19FC03146"));
}

#[tokio::test]
async fn two_sided_flow_records_both_sides() {
    let store = Arc::new(MemoryArtifactStore::new());
    let tenant = TenantId::new();
    let backends = backends(&tenant);
    let lease = LeaseId::new();
    backends
        .leases
        .add_signer(lease.clone(), tenant.clone(), SignerRole::CoTenant);
    let handler = Arc::new(RecordingHandler::default());
    let mut driver = driver_over(
        &tenant,
        store.clone(),
        MockOracle::verifying(identity()),
        &backends,
        handler,
    );

    driver.start().unwrap();
    driver
        .select_document(DocumentKind::ResidencePermit)
        .unwrap();
    assert_eq!(
        driver.capture_recto(jpeg(RECTO_BYTES)).unwrap(),
        FlowStep::DocumentScanVerso
    );
    assert_eq!(
        driver.capture_verso(jpeg(VERSO_BYTES)).unwrap(),
        FlowStep::Selfie
    );
    let step = driver.capture_selfie(jpeg(SELFIE_BYTES)).await.unwrap();
    assert_eq!(step, FlowStep::Success);

    assert_eq!(store.len(), 3);
    let record = backends.identities.get(&tenant).await.unwrap().unwrap();
    assert!(record.identity_back_path.is_some());
    assert_eq!(
        record.document_expiry_date,
        NaiveDate::from_ymd_opt(2031, 3, 13)
    );

    // Both sides land as lease documents, each verified on arrival.
    let front = backends
        .leases
        .documents_for(&lease, LeaseDocumentType::IdentityFront);
    let back = backends
        .leases
        .documents_for(&lease, LeaseDocumentType::IdentityBack);
    assert_eq!(front.len(), 1);
    assert_eq!(back.len(), 1);
    assert_eq!(back[0].verification_status, KycStatus::Verified);
    assert_eq!(back[0].expiry_date, NaiveDate::from_ymd_opt(2031, 3, 13));
}

#[tokio::test]
async fn re_verification_archives_prior_history() {
    let store = Arc::new(MemoryArtifactStore::new());
    let tenant = TenantId::new();
    let backends = backends(&tenant);
    let lease = LeaseId::new();
    backends
        .leases
        .add_signer(lease.clone(), tenant.clone(), SignerRole::PrimaryTenant);
    let handler = Arc::new(RecordingHandler::default());
    let mut driver = driver_over(
        &tenant,
        store,
        MockOracle::verifying(identity()),
        &backends,
        handler,
    );

    for _ in 0..2 {
        driver.start().unwrap();
        driver.select_document(DocumentKind::Passport).unwrap();
        driver.capture_recto(jpeg(RECTO_BYTES)).unwrap();
        let step = driver.capture_selfie(jpeg(SELFIE_BYTES)).await.unwrap();
        assert_eq!(step, FlowStep::Success, "verified → processing is legal");
        driver.continue_after_success().unwrap();
    }

    let record = backends.identities.get(&tenant).await.unwrap().unwrap();
    assert_eq!(record.kyc_status, KycStatus::Verified);

    // Both verifications are kept; only the newest row is active.
    let docs = backends
        .leases
        .documents_for(&lease, LeaseDocumentType::IdentityFront);
    assert_eq!(docs.len(), 2);
    assert!(!docs[0].is_archived, "newest row stays active");
    assert!(docs[1].is_archived, "prior row is archived, not updated");
    assert_eq!(backends.audit.len(), 2, "one audit event per verification");
}
