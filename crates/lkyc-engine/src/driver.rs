//! # Flow Driver
//!
//! Wires the capture flow machine to the submission pipeline and exposes
//! the completion contract to the embedding application. Capture is the
//! commit: `capture_selfie` runs the whole submission inline and resolves
//! the machine before it returns, so the caller always observes a settled
//! step, never a dangling `Processing`.
//!
//! `Processing` is itself the mutual-exclusion guard: while a submission
//! is in flight the machine sits at `Processing`, and every capture or
//! navigation event is rejected by the machine until the attempt
//! resolves. The driver needs no separate in-flight flag.
//!
//! The error screen offers exactly three ways out: `retry` (re-enter one
//! capture step), `help` (notify the embedding, stay on the screen), and
//! `cancel` (wipe the session). It never auto-retries.

use std::sync::Arc;

use lkyc_core::{CancelToken, CaptureSlot, DocumentKind, ExtractedIdentity, TenantId};
use lkyc_flow::{CaptureBlob, CaptureSession, FlowError, FlowMachine, FlowStep};

use crate::metrics::VerifyMetrics;
use crate::pipeline::SubmissionPipeline;

// ─── Completion Contract ─────────────────────────────────────────────

/// The embedding application's view of flow completion.
///
/// Callbacks are in-process and synchronous; the embedding spawns its
/// own work if a callback needs to do anything slow.
pub trait CompletionHandler: Send + Sync {
    /// The tenant explicitly continued past the success screen. Never
    /// called automatically on oracle success; the verified outcome
    /// stays on the session until acknowledged.
    fn on_success(&self, identity: &ExtractedIdentity);

    /// The tenant skipped verification before any attempt was submitted.
    fn on_skip(&self);

    /// The tenant asked for help from the error screen.
    fn on_help(&self);
}

// ─── Driver ──────────────────────────────────────────────────────────

/// One tenant's verification flow: the machine, the pipeline, and the
/// completion callbacks, driven by capture and navigation events.
pub struct FlowDriver {
    tenant: TenantId,
    machine: FlowMachine,
    pipeline: SubmissionPipeline,
    handler: Arc<dyn CompletionHandler>,
    cancel: CancelToken,
}

impl std::fmt::Debug for FlowDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowDriver")
            .field("tenant", &self.tenant)
            .field("step", &self.machine.step())
            .finish_non_exhaustive()
    }
}

impl FlowDriver {
    /// Create a driver at `Intro` for the given tenant.
    pub fn new(
        tenant: TenantId,
        pipeline: SubmissionPipeline,
        handler: Arc<dyn CompletionHandler>,
    ) -> Self {
        Self {
            tenant,
            machine: FlowMachine::new(),
            pipeline,
            handler,
            cancel: CancelToken::new(),
        }
    }

    /// The current flow step.
    pub fn step(&self) -> FlowStep {
        self.machine.step()
    }

    /// The capture session of the current attempt.
    pub fn session(&self) -> &CaptureSession {
        self.machine.session()
    }

    /// The pipeline's submission counters.
    pub fn metrics(&self) -> VerifyMetrics {
        self.pipeline.metrics()
    }

    /// A clone of the current attempt's cancellation token.
    ///
    /// The token is re-armed on `start` and on `retry`; a clone taken
    /// during an earlier attempt does not affect later ones.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Start the flow, arming a fresh cancellation token.
    pub fn start(&mut self) -> Result<FlowStep, FlowError> {
        let step = self.machine.start()?;
        self.cancel = CancelToken::new();
        Ok(step)
    }

    /// Select the document kind.
    pub fn select_document(&mut self, kind: DocumentKind) -> Result<FlowStep, FlowError> {
        self.machine.select_document(kind)
    }

    /// Capture the document front side.
    pub fn capture_recto(&mut self, blob: CaptureBlob) -> Result<FlowStep, FlowError> {
        self.machine.capture_recto(blob)
    }

    /// Capture the document back side.
    pub fn capture_verso(&mut self, blob: CaptureBlob) -> Result<FlowStep, FlowError> {
        self.machine.capture_verso(blob)
    }

    /// Capture the selfie and, when the machine enters `Processing`, run
    /// the submission to resolution.
    ///
    /// Returns the settled step: `Success`, or `Error` (failed
    /// precondition, upload failure, rejection, or cancellation).
    pub async fn capture_selfie(&mut self, blob: CaptureBlob) -> Result<FlowStep, FlowError> {
        let step = self.machine.capture_selfie(blob)?;
        if step != FlowStep::Processing {
            // Missing-document precondition: the machine went straight
            // to the error screen without any network contact.
            return Ok(step);
        }
        let outcome = self
            .pipeline
            .submit(&self.tenant, self.machine.session(), &self.cancel)
            .await;
        self.machine.resolve(outcome)
    }

    /// Navigate one step backwards.
    pub fn back(&mut self) -> Result<FlowStep, FlowError> {
        self.machine.back()
    }

    /// Re-enter a capture step from the error screen, arming a fresh
    /// cancellation token for the next attempt.
    pub fn retry(&mut self, slot: CaptureSlot) -> Result<FlowStep, FlowError> {
        let step = self.machine.retry(slot)?;
        self.cancel = CancelToken::new();
        Ok(step)
    }

    /// Acknowledge the verified attempt and hand the extracted identity
    /// to the completion handler. Wipes the session.
    pub fn continue_after_success(&mut self) -> Result<FlowStep, FlowError> {
        let identity = self
            .machine
            .session()
            .last_outcome
            .as_ref()
            .and_then(|outcome| outcome.identity())
            .cloned();
        let step = self.machine.acknowledge_success()?;
        if let Some(identity) = identity {
            self.handler.on_success(&identity);
        }
        Ok(step)
    }

    /// Skip verification. Only available before an attempt is submitted;
    /// wipes the session and notifies the handler.
    pub fn skip(&mut self) -> Result<FlowStep, FlowError> {
        match self.machine.step() {
            FlowStep::Processing | FlowStep::Success | FlowStep::Error => {
                Err(FlowError::InvalidTransition {
                    from: self.machine.step().to_string(),
                    to: "intro".to_string(),
                })
            }
            _ => {
                self.machine.reset();
                self.handler.on_skip();
                Ok(FlowStep::Intro)
            }
        }
    }

    /// Ask for help from the error screen. The machine stays at `Error`
    /// so the tenant can still retry or cancel afterwards.
    pub fn help(&self) -> Result<(), FlowError> {
        if self.machine.step() != FlowStep::Error {
            return Err(FlowError::InvalidTransition {
                from: self.machine.step().to_string(),
                to: "help".to_string(),
            });
        }
        self.handler.on_help();
        Ok(())
    }

    /// Abandon the flow: request cancellation of any in-flight network
    /// work and wipe the session.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.machine.reset();
    }
}
