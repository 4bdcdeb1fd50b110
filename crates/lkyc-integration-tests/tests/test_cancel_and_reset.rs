//! # Cancellation and Abandon-Restart Journeys
//!
//! A tenant may abandon an attempt at any point, and abandonment must be
//! cheap: no network work after the cancel, no state left behind, and a
//! fresh start must be unaffected by the attempt that died.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use lkyc_client::{
    ArtifactError, ArtifactHandle, ArtifactStore, MemoryArtifactStore, MockOracle, OracleError,
    OracleVerdict, SubmittedArtifacts, VerificationOracle,
};
use lkyc_core::{
    CaptureSlot, DocumentKind, ExtractedIdentity, FailureCode, KycStatus, TenantId,
    VerificationOutcome,
};
use lkyc_engine::{
    CancelToken, CompletionHandler, FlowDriver, ResultSynchronizer, SubmissionPipeline,
};
use lkyc_flow::{CaptureBlob, CaptureSession, CapturedFrame, FlowStep};
use lkyc_store::{
    IdentityRepo, MemoryAuditRepo, MemoryIdentityRepo, MemoryLeaseRepo, TenantIdentityRecord,
};

struct Quiet;

impl CompletionHandler for Quiet {
    fn on_success(&self, _identity: &ExtractedIdentity) {}
    fn on_skip(&self) {}
    fn on_help(&self) {}
}

fn identity() -> ExtractedIdentity {
    ExtractedIdentity {
        name: "Svensson".to_string(),
        first_name: "Linnea".to_string(),
        birth_date: NaiveDate::from_ymd_opt(1999, 8, 17),
        birth_place: None,
        sex: None,
        nationality: Some("SWE".to_string()),
        document_number: Some("SE220981".to_string()),
        expiry_date: None,
    }
}

fn jpeg() -> CaptureBlob {
    CaptureBlob::jpeg(vec![0xFF, 0xD8, 0xFF, 0xE0])
}

struct Rig {
    driver: FlowDriver,
    identities: MemoryIdentityRepo,
    store: Arc<MemoryArtifactStore>,
    oracle: Arc<MockOracle>,
}

fn rig(tenant: &TenantId) -> Rig {
    let store = Arc::new(MemoryArtifactStore::new());
    let oracle = Arc::new(MockOracle::verifying(identity()));
    let identities = MemoryIdentityRepo::new();
    identities.insert(TenantIdentityRecord::unverified(tenant.clone()));
    let synchronizer = ResultSynchronizer::new(
        Arc::new(identities.clone()),
        Arc::new(MemoryLeaseRepo::new()),
        Arc::new(MemoryAuditRepo::new()),
    );
    let pipeline = SubmissionPipeline::new(
        store.clone(),
        oracle.clone(),
        Arc::new(identities.clone()),
        synchronizer,
    );
    let driver = FlowDriver::new(tenant.clone(), pipeline, Arc::new(Quiet));
    Rig {
        driver,
        identities,
        store,
        oracle,
    }
}

#[tokio::test]
async fn abandoned_attempt_then_fresh_start_succeeds() {
    let tenant = TenantId::new();
    let mut rig = rig(&tenant);

    // Get halfway through, then walk away.
    rig.driver.start().unwrap();
    let stale_token = rig.driver.cancel_token();
    rig.driver
        .select_document(DocumentKind::NationalId)
        .unwrap();
    rig.driver.capture_recto(jpeg()).unwrap();
    rig.driver.cancel();
    assert_eq!(rig.driver.step(), FlowStep::Intro);
    assert!(rig.driver.session().is_empty());
    assert!(stale_token.is_cancelled());

    // A fresh start arms a fresh token; the dead attempt has no reach.
    rig.driver.start().unwrap();
    assert!(!rig.driver.cancel_token().is_cancelled());
    rig.driver.select_document(DocumentKind::Passport).unwrap();
    rig.driver.capture_recto(jpeg()).unwrap();
    let step = rig.driver.capture_selfie(jpeg()).await.unwrap();
    assert_eq!(step, FlowStep::Success);

    // Only the second attempt ever touched the network.
    assert_eq!(rig.store.len(), 2);
    assert_eq!(rig.oracle.call_count(), 1);
    let record = rig.identities.get(&tenant).await.unwrap().unwrap();
    assert_eq!(record.kyc_status, KycStatus::Verified);
}

#[tokio::test]
async fn pre_cancelled_token_blocks_all_network_work() {
    let tenant = TenantId::new();
    let mut rig = rig(&tenant);

    rig.driver.start().unwrap();
    let token = rig.driver.cancel_token();
    rig.driver.select_document(DocumentKind::Passport).unwrap();
    rig.driver.capture_recto(jpeg()).unwrap();
    token.cancel();

    let step = rig.driver.capture_selfie(jpeg()).await.unwrap();
    assert_eq!(step, FlowStep::Error);
    let outcome = rig.driver.session().last_outcome.as_ref().unwrap();
    assert_eq!(outcome.error_code(), Some(FailureCode::UploadError));

    assert!(rig.store.is_empty());
    assert_eq!(rig.oracle.call_count(), 0);
    let record = rig.identities.get(&tenant).await.unwrap().unwrap();
    assert_eq!(record.kyc_status, KycStatus::Unverified);
}

#[tokio::test]
async fn cancel_is_idempotent_and_safe_at_intro() {
    let tenant = TenantId::new();
    let mut rig = rig(&tenant);

    // Cancelling before the flow even starts is harmless.
    rig.driver.cancel();
    assert_eq!(rig.driver.step(), FlowStep::Intro);

    rig.driver.start().unwrap();
    rig.driver
        .select_document(DocumentKind::DrivingLicense)
        .unwrap();
    rig.driver.cancel();
    rig.driver.cancel();
    assert_eq!(rig.driver.step(), FlowStep::Intro);
    assert!(rig.driver.session().is_empty());

    // And the driver still works afterwards.
    rig.driver.start().unwrap();
    rig.driver.select_document(DocumentKind::Passport).unwrap();
    rig.driver.capture_recto(jpeg()).unwrap();
    let step = rig.driver.capture_selfie(jpeg()).await.unwrap();
    assert_eq!(step, FlowStep::Success);
}

// ─── Cancellation boundary pinning (pipeline level) ──────────────────
//
// The driver cannot place a cancel between two specific awaits, so these
// tests drive the pipeline directly with trait doubles that cancel the
// token from inside a collaborator call.

/// Store that cancels the attempt token after each successful upload.
struct CancelAfterPut {
    inner: Arc<MemoryArtifactStore>,
    token: CancelToken,
}

#[async_trait]
impl ArtifactStore for CancelAfterPut {
    async fn put(
        &self,
        path: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<ArtifactHandle, ArtifactError> {
        let handle = self.inner.put(path, content_type, bytes).await?;
        self.token.cancel();
        Ok(handle)
    }

    fn backend_name(&self) -> &str {
        "CancelAfterPut"
    }
}

/// Oracle that cancels the attempt token while evaluating, then answers.
struct CancelDuringVerify {
    inner: MockOracle,
    token: CancelToken,
}

#[async_trait]
impl VerificationOracle for CancelDuringVerify {
    async fn verify(
        &self,
        document_type: DocumentKind,
        artifacts: &SubmittedArtifacts,
    ) -> Result<OracleVerdict, OracleError> {
        self.token.cancel();
        self.inner.verify(document_type, artifacts).await
    }

    fn provider_name(&self) -> &str {
        "CancelDuringVerify"
    }
}

fn two_sided_session() -> CaptureSession {
    let mut session = CaptureSession::new();
    session.document_type = Some(DocumentKind::NationalId);
    session.set(CaptureSlot::Recto, CapturedFrame::new(jpeg()));
    session.set(CaptureSlot::Verso, CapturedFrame::new(jpeg()));
    session.set(CaptureSlot::Selfie, CapturedFrame::new(jpeg()));
    session
}

fn pipeline_over(
    tenant: &TenantId,
    store: Arc<dyn ArtifactStore>,
    oracle: Arc<dyn VerificationOracle>,
) -> (SubmissionPipeline, MemoryIdentityRepo, MemoryAuditRepo) {
    let identities = MemoryIdentityRepo::new();
    identities.insert(TenantIdentityRecord::unverified(tenant.clone()));
    let audit = MemoryAuditRepo::new();
    let synchronizer = ResultSynchronizer::new(
        Arc::new(identities.clone()),
        Arc::new(MemoryLeaseRepo::new()),
        Arc::new(audit.clone()),
    );
    let pipeline =
        SubmissionPipeline::new(store, oracle, Arc::new(identities.clone()), synchronizer);
    (pipeline, identities, audit)
}

#[tokio::test]
async fn cancel_between_uploads_aborts_before_the_marker() {
    let tenant = TenantId::new();
    let token = CancelToken::new();
    let inner = Arc::new(MemoryArtifactStore::new());
    let store = Arc::new(CancelAfterPut {
        inner: inner.clone(),
        token: token.clone(),
    });
    let oracle = Arc::new(MockOracle::verifying(identity()));
    let (pipeline, identities, _audit) = pipeline_over(&tenant, store, oracle.clone());

    let session = two_sided_session();
    let outcome = pipeline.submit(&tenant, &session, &token).await;

    // The recto upload landed; the cancel was observed before the verso
    // upload and long before the marker.
    assert_eq!(outcome, VerificationOutcome::upload_error("submission cancelled"));
    assert_eq!(inner.len(), 1);
    assert_eq!(oracle.call_count(), 0);
    let record = identities.get(&tenant).await.unwrap().unwrap();
    assert_eq!(record.kyc_status, KycStatus::Unverified);
}

#[tokio::test]
async fn cancel_after_the_marker_does_not_prevent_resolution() {
    let tenant = TenantId::new();
    let token = CancelToken::new();
    let store = Arc::new(MemoryArtifactStore::new());
    let oracle = Arc::new(CancelDuringVerify {
        inner: MockOracle::verifying(identity()),
        token: token.clone(),
    });
    let (pipeline, identities, audit) = pipeline_over(&tenant, store, oracle);

    let session = two_sided_session();
    let outcome = pipeline.submit(&tenant, &session, &token).await;

    // Past the marker the attempt always runs to resolution; the cancel
    // fired mid-verify changes nothing.
    assert!(outcome.is_success());
    assert!(token.is_cancelled());
    let record = identities.get(&tenant).await.unwrap().unwrap();
    assert_eq!(record.kyc_status, KycStatus::Verified);
    assert_eq!(audit.len(), 1);
}
