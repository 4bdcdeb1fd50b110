//! # Submission Pipeline
//!
//! Runs one verification attempt end to end: sequential artifact
//! uploads, the durable `processing` marker, the oracle call, and the
//! result synchronization. Produces a [`VerificationOutcome`] for the
//! flow machine to resolve on; it never returns an error, because every
//! failure mode is itself an outcome.
//!
//! ## Attempt Shape
//!
//! Uploads run in capture order (recto, then verso, then selfie) and
//! abort on the first failure; nothing later is attempted and the
//! tenant's `kyc_status` is left untouched, because the `processing`
//! marker is written only after every upload succeeded.
//!
//! ## The Processing Marker
//!
//! Once `kyc_status = processing` is written, the attempt always
//! resolves: every code path out of the oracle call ends in
//! `mark_verified` (via the synchronizer) or `mark_rejected`, including
//! persistence failures. A profile is never left parked at
//! `processing`.
//!
//! ## Cancellation
//!
//! The [`CancelToken`] is observed before each upload and before the
//! marker. A cancelled attempt reports `upload_error` with a
//! cancellation message and leaves `kyc_status` untouched. After the
//! marker the token is deliberately ignored.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use lkyc_client::{
    artifact_path, ArtifactHandle, ArtifactStore, SubmittedArtifacts, VerificationOracle,
};
use lkyc_core::{CancelToken, CaptureSlot, DocumentKind, TenantId, VerificationOutcome};
use lkyc_flow::{CaptureSession, CapturedFrame};
use lkyc_store::IdentityRepo;

use crate::metrics::VerifyMetrics;
use crate::sync::ResultSynchronizer;

/// Uploads captures, invokes the oracle, and resolves the attempt
/// against the durable stores.
#[derive(Clone)]
pub struct SubmissionPipeline {
    store: Arc<dyn ArtifactStore>,
    oracle: Arc<dyn VerificationOracle>,
    identities: Arc<dyn IdentityRepo>,
    synchronizer: ResultSynchronizer,
    metrics: VerifyMetrics,
}

impl std::fmt::Debug for SubmissionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionPipeline")
            .field("artifact_backend", &self.store.backend_name())
            .field("oracle_provider", &self.oracle.provider_name())
            .finish_non_exhaustive()
    }
}

impl SubmissionPipeline {
    /// Create a pipeline over the given clients and repositories, with
    /// fresh metrics counters.
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        oracle: Arc<dyn VerificationOracle>,
        identities: Arc<dyn IdentityRepo>,
        synchronizer: ResultSynchronizer,
    ) -> Self {
        Self {
            store,
            oracle,
            identities,
            synchronizer,
            metrics: VerifyMetrics::new(),
        }
    }

    /// The pipeline's submission counters (shared; cloning the handle
    /// does not reset them).
    pub fn metrics(&self) -> VerifyMetrics {
        self.metrics.clone()
    }

    /// Run one attempt against the session's captures.
    ///
    /// The session is read, never mutated; the caller resolves the flow
    /// machine with the returned outcome.
    pub async fn submit(
        &self,
        tenant: &TenantId,
        session: &CaptureSession,
        cancel: &CancelToken,
    ) -> VerificationOutcome {
        self.metrics.attempt_count.fetch_add(1, Ordering::Relaxed);

        let (kind, recto_frame) = match (session.document_type, session.get(CaptureSlot::Recto)) {
            (Some(kind), Some(frame)) => (kind, frame),
            _ => {
                tracing::warn!(
                    tenant = %tenant,
                    session = %session.id,
                    "submission without a captured document — failing locally"
                );
                return VerificationOutcome::missing_document("no document captured");
            }
        };
        tracing::info!(
            tenant = %tenant,
            session = %session.id,
            document_type = %kind,
            "submission started"
        );

        if cancel.is_cancelled() {
            return Self::cancelled(tenant);
        }
        let recto = match self
            .upload_slot(tenant, kind, CaptureSlot::Recto, recto_frame)
            .await
        {
            Ok(handle) => handle,
            Err(outcome) => return outcome,
        };

        let mut verso = None;
        if let Some(frame) = session.get(CaptureSlot::Verso) {
            if cancel.is_cancelled() {
                return Self::cancelled(tenant);
            }
            match self
                .upload_slot(tenant, kind, CaptureSlot::Verso, frame)
                .await
            {
                Ok(handle) => verso = Some(handle),
                Err(outcome) => return outcome,
            }
        }

        let mut selfie = None;
        if let Some(frame) = session.get(CaptureSlot::Selfie) {
            if cancel.is_cancelled() {
                return Self::cancelled(tenant);
            }
            match self
                .upload_slot(tenant, kind, CaptureSlot::Selfie, frame)
                .await
            {
                Ok(handle) => selfie = Some(handle),
                Err(outcome) => return outcome,
            }
        }

        if cancel.is_cancelled() {
            return Self::cancelled(tenant);
        }

        // Point of no return: with the marker down, every path below
        // must resolve the status.
        if let Err(e) = self.identities.mark_processing(tenant).await {
            tracing::warn!(
                tenant = %tenant,
                error = %e,
                "could not write processing marker — aborting attempt"
            );
            return VerificationOutcome::upload_error(format!("could not begin processing: {e}"));
        }

        let submitted = SubmittedArtifacts {
            recto,
            verso,
            selfie,
        };
        match self.oracle.verify(kind, &submitted).await {
            Ok(verdict) => {
                let outcome = VerificationOutcome::Verified {
                    confidence: verdict.confidence,
                    identity: verdict.identity.clone(),
                };
                match self
                    .synchronizer
                    .apply(tenant, kind, &submitted, verdict)
                    .await
                {
                    Ok(report) => {
                        self.metrics.verified_count.fetch_add(1, Ordering::Relaxed);
                        tracing::info!(
                            tenant = %tenant,
                            leases_updated = report.leases_updated,
                            leases_failed = report.leases_failed,
                            "submission verified"
                        );
                        outcome
                    }
                    Err(e) => {
                        tracing::error!(
                            tenant = %tenant,
                            error = %e,
                            "oracle verified but the profile write failed — resolving as rejected"
                        );
                        self.resolve_rejected(tenant).await;
                        self.metrics.rejected_count.fetch_add(1, Ordering::Relaxed);
                        VerificationOutcome::verification_failed(
                            format!("could not persist verification result: {e}"),
                            None,
                        )
                    }
                }
            }
            Err(e) => {
                let reason = e.rejection_reason();
                self.resolve_rejected(tenant).await;
                self.metrics.rejected_count.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    tenant = %tenant,
                    reason = %reason,
                    error = %e,
                    "submission rejected"
                );
                VerificationOutcome::verification_failed(e.to_string(), Some(reason))
            }
        }
    }

    /// Upload one captured slot under its canonical path. Failure is
    /// returned as the attempt outcome.
    async fn upload_slot(
        &self,
        tenant: &TenantId,
        kind: DocumentKind,
        slot: CaptureSlot,
        frame: &CapturedFrame,
    ) -> Result<ArtifactHandle, VerificationOutcome> {
        let path = artifact_path(tenant, kind, slot, frame.captured_at);
        match self
            .store
            .put(&path, frame.blob.content_type(), frame.blob.bytes())
            .await
        {
            Ok(handle) => {
                tracing::debug!(
                    tenant = %tenant,
                    path = %handle.path,
                    backend = self.store.backend_name(),
                    "artifact uploaded"
                );
                Ok(handle)
            }
            Err(e) => {
                self.metrics
                    .upload_failure_count
                    .fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    tenant = %tenant,
                    slot = %slot,
                    error = %e,
                    "artifact upload failed — aborting attempt"
                );
                Err(VerificationOutcome::upload_error(format!(
                    "failed to upload {slot}: {e}"
                )))
            }
        }
    }

    fn cancelled(tenant: &TenantId) -> VerificationOutcome {
        tracing::info!(tenant = %tenant, "submission cancelled before the processing marker");
        VerificationOutcome::upload_error("submission cancelled")
    }

    async fn resolve_rejected(&self, tenant: &TenantId) {
        if let Err(e) = self.identities.mark_rejected(tenant).await {
            tracing::error!(
                tenant = %tenant,
                error = %e,
                "could not mark attempt rejected — profile may be stuck at processing"
            );
        }
    }
}
