//! # Preview Handle Lifecycle Through the Driver
//!
//! Preview handles are revoked on every exit path from the flow and on
//! every frame replacement; none may outlive the capture that produced
//! it. These tests drive the revocation paths through the full driver
//! rather than poking the session directly.

use std::sync::Arc;

use chrono::NaiveDate;

use lkyc_client::{ArtifactStore, MemoryArtifactStore, MockOracle};
use lkyc_core::{CaptureSlot, DocumentKind, ExtractedIdentity, RejectionReason, TenantId};
use lkyc_engine::{CompletionHandler, FlowDriver, ResultSynchronizer, SubmissionPipeline};
use lkyc_flow::{CaptureBlob, FlowStep, PreviewHandle};
use lkyc_store::{
    MemoryAuditRepo, MemoryIdentityRepo, MemoryLeaseRepo, TenantIdentityRecord,
};

struct Quiet;

impl CompletionHandler for Quiet {
    fn on_success(&self, _identity: &ExtractedIdentity) {}
    fn on_skip(&self) {}
    fn on_help(&self) {}
}

fn identity() -> ExtractedIdentity {
    ExtractedIdentity {
        name: "Haddad".to_string(),
        first_name: "Nour".to_string(),
        birth_date: NaiveDate::from_ymd_opt(1995, 2, 9),
        birth_place: None,
        sex: None,
        nationality: Some("LBN".to_string()),
        document_number: None,
        expiry_date: None,
    }
}

fn jpeg() -> CaptureBlob {
    CaptureBlob::jpeg(vec![0xFF, 0xD8, 0xFF, 0xE0])
}

fn driver(tenant: &TenantId, oracle: MockOracle) -> FlowDriver {
    let store: Arc<dyn ArtifactStore> = Arc::new(MemoryArtifactStore::new());
    let identities = MemoryIdentityRepo::new();
    identities.insert(TenantIdentityRecord::unverified(tenant.clone()));
    let synchronizer = ResultSynchronizer::new(
        Arc::new(identities.clone()),
        Arc::new(MemoryLeaseRepo::new()),
        Arc::new(MemoryAuditRepo::new()),
    );
    let pipeline = SubmissionPipeline::new(
        store,
        Arc::new(oracle),
        Arc::new(identities),
        synchronizer,
    );
    FlowDriver::new(tenant.clone(), pipeline, Arc::new(Quiet))
}

fn preview_of(driver: &FlowDriver, slot: CaptureSlot) -> PreviewHandle {
    driver.session().get(slot).unwrap().preview.clone()
}

#[tokio::test]
async fn success_continue_revokes_all_previews() {
    let tenant = TenantId::new();
    let mut driver = driver(&tenant, MockOracle::verifying(identity()));

    driver.start().unwrap();
    driver.select_document(DocumentKind::Passport).unwrap();
    driver.capture_recto(jpeg()).unwrap();
    let step = driver.capture_selfie(jpeg()).await.unwrap();
    assert_eq!(step, FlowStep::Success);

    // Previews stay displayable on the success screen.
    let recto = preview_of(&driver, CaptureSlot::Recto);
    let selfie = preview_of(&driver, CaptureSlot::Selfie);
    assert!(!recto.is_revoked());
    assert!(!selfie.is_revoked());

    driver.continue_after_success().unwrap();
    assert!(recto.is_revoked());
    assert!(selfie.is_revoked());
}

#[tokio::test]
async fn cancel_revokes_previews_immediately() {
    let tenant = TenantId::new();
    let mut driver = driver(&tenant, MockOracle::verifying(identity()));

    driver.start().unwrap();
    driver.select_document(DocumentKind::NationalId).unwrap();
    driver.capture_recto(jpeg()).unwrap();
    let recto = preview_of(&driver, CaptureSlot::Recto);

    driver.cancel();
    assert!(recto.is_revoked());
    assert!(driver.session().is_empty());
}

#[tokio::test]
async fn skip_revokes_previews() {
    let tenant = TenantId::new();
    let mut driver = driver(&tenant, MockOracle::verifying(identity()));

    driver.start().unwrap();
    driver.select_document(DocumentKind::NationalId).unwrap();
    driver.capture_recto(jpeg()).unwrap();
    driver.capture_verso(jpeg()).unwrap();
    let recto = preview_of(&driver, CaptureSlot::Recto);
    let verso = preview_of(&driver, CaptureSlot::Verso);

    driver.skip().unwrap();
    assert!(recto.is_revoked());
    assert!(verso.is_revoked());
}

#[tokio::test]
async fn recapture_revokes_only_the_replaced_slot() {
    let tenant = TenantId::new();
    let mut driver = driver(&tenant, MockOracle::verifying(identity()));

    driver.start().unwrap();
    driver.select_document(DocumentKind::NationalId).unwrap();
    driver.capture_recto(jpeg()).unwrap();
    let first_recto = preview_of(&driver, CaptureSlot::Recto);

    // Back up one step and take the shot again.
    assert_eq!(driver.back().unwrap(), FlowStep::DocumentScanRecto);
    driver.capture_recto(jpeg()).unwrap();
    let second_recto = preview_of(&driver, CaptureSlot::Recto);
    assert!(first_recto.is_revoked());
    assert!(!second_recto.is_revoked());

    driver.capture_verso(jpeg()).unwrap();
    assert!(
        !second_recto.is_revoked(),
        "capturing another slot leaves it alone"
    );
}

#[tokio::test]
async fn retry_revokes_only_the_cleared_slot() {
    let tenant = TenantId::new();
    let mut driver = driver(
        &tenant,
        MockOracle::rejecting(RejectionReason::FaceNotDetected, "no face found"),
    );

    driver.start().unwrap();
    driver.select_document(DocumentKind::Passport).unwrap();
    driver.capture_recto(jpeg()).unwrap();
    let step = driver.capture_selfie(jpeg()).await.unwrap();
    assert_eq!(step, FlowStep::Error);
    let recto = preview_of(&driver, CaptureSlot::Recto);
    let selfie = preview_of(&driver, CaptureSlot::Selfie);

    driver.retry(CaptureSlot::Selfie).unwrap();
    assert!(selfie.is_revoked(), "the retried slot is cleared");
    assert!(!recto.is_revoked(), "the kept capture stays displayable");
    assert!(driver.session().has(CaptureSlot::Recto));
    assert!(!driver.session().has(CaptureSlot::Selfie));
}
