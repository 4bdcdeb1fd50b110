//! # Verification Flow Machine
//!
//! Sequences one verification attempt through its capture steps. Each
//! event is a method that validates the current step, mutates the owned
//! [`CaptureSession`], records the transition, and returns the step the
//! flow landed on.
//!
//! Capture is the commit: there is no separate "submit" action. Capturing
//! the selfie moves the flow to `Processing`, where the caller runs the
//! submission pipeline and reports the result back through [`resolve`].
//!
//! [`resolve`]: FlowMachine::resolve

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lkyc_core::{CaptureSlot, DocumentKind, VerificationOutcome};

use crate::session::{CaptureBlob, CaptureSession, CapturedFrame};

// ─── Flow Steps ──────────────────────────────────────────────────────

/// The steps of the verification capture flow.
///
/// `DocumentChoice` is a selection overlay, not a capture step; the
/// recto → verso edge is taken exactly when the selected document kind
/// requires a verso side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStep {
    /// Landing screen before the flow starts.
    Intro,
    /// Document kind selection overlay.
    DocumentChoice,
    /// Capture of the document front side.
    DocumentScanRecto,
    /// Capture of the document back side (two-sided kinds only).
    DocumentScanVerso,
    /// Capture of the selfie.
    Selfie,
    /// Upload and oracle verification in progress.
    Processing,
    /// The attempt was verified.
    Success,
    /// The attempt failed; the session carries the failure outcome.
    Error,
}

impl FlowStep {
    /// All flow steps, in nominal traversal order.
    pub fn all() -> &'static [FlowStep] {
        &[
            FlowStep::Intro,
            FlowStep::DocumentChoice,
            FlowStep::DocumentScanRecto,
            FlowStep::DocumentScanVerso,
            FlowStep::Selfie,
            FlowStep::Processing,
            FlowStep::Success,
            FlowStep::Error,
        ]
    }

    /// The canonical string form, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intro => "intro",
            Self::DocumentChoice => "document_choice",
            Self::DocumentScanRecto => "document_scan_recto",
            Self::DocumentScanVerso => "document_scan_verso",
            Self::Selfie => "selfie",
            Self::Processing => "processing",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    /// Whether this step resolves an attempt (`Success` or `Error`).
    ///
    /// Resolution steps are terminal for the attempt but not for the
    /// flow: `Error` re-enters capture via `retry`, and both return to
    /// `Intro` via `reset`.
    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }

    /// Whether this step captures a frame.
    pub fn is_capture(&self) -> bool {
        matches!(
            self,
            Self::DocumentScanRecto | Self::DocumentScanVerso | Self::Selfie
        )
    }

    /// The steps reachable from this one, across all events including
    /// `back`, `retry`, and `reset`.
    pub fn valid_transitions(&self) -> &'static [FlowStep] {
        match self {
            Self::Intro => &[FlowStep::DocumentChoice],
            Self::DocumentChoice => &[FlowStep::DocumentScanRecto, FlowStep::Intro],
            Self::DocumentScanRecto => &[
                FlowStep::DocumentScanVerso,
                FlowStep::Selfie,
                FlowStep::DocumentChoice,
                FlowStep::Intro,
            ],
            Self::DocumentScanVerso => &[
                FlowStep::Selfie,
                FlowStep::DocumentScanRecto,
                FlowStep::Intro,
            ],
            Self::Selfie => &[
                FlowStep::Processing,
                FlowStep::Error,
                FlowStep::DocumentScanVerso,
                FlowStep::DocumentScanRecto,
                FlowStep::Intro,
            ],
            Self::Processing => &[FlowStep::Success, FlowStep::Error, FlowStep::Intro],
            Self::Success => &[FlowStep::Intro],
            Self::Error => &[
                FlowStep::DocumentScanRecto,
                FlowStep::DocumentScanVerso,
                FlowStep::Selfie,
                FlowStep::Intro,
            ],
        }
    }
}

impl std::fmt::Display for FlowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors that can occur during flow transitions.
#[derive(Error, Debug)]
pub enum FlowError {
    /// Attempted event is not valid from the current step.
    #[error("invalid flow transition: {from} -> {to}")]
    InvalidTransition {
        /// Current step.
        from: String,
        /// Attempted target step.
        to: String,
    },

    /// The event needs a selected document kind and none is set.
    #[error("no document kind selected")]
    MissingDocumentType,
}

// ─── Transition Record ───────────────────────────────────────────────

/// Record of a flow step transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowTransitionRecord {
    /// Step before the transition.
    pub from_step: FlowStep,
    /// Step after the transition.
    pub to_step: FlowStep,
    /// When the transition occurred.
    pub timestamp: DateTime<Utc>,
    /// The event that caused it.
    pub reason: String,
}

// ─── Flow Machine ────────────────────────────────────────────────────

/// One verification attempt: the current step, the capture session it
/// owns, and the ordered log of every step transition.
///
/// Events are methods returning the step the flow landed on. Invalid
/// events are rejected with structured errors naming the current step
/// and the attempted transition; rejection leaves the machine unchanged.
#[derive(Debug)]
pub struct FlowMachine {
    step: FlowStep,
    session: CaptureSession,
    transitions: Vec<FlowTransitionRecord>,
}

impl FlowMachine {
    /// Create a machine at `Intro` with a fresh, empty session.
    pub fn new() -> Self {
        Self {
            step: FlowStep::Intro,
            session: CaptureSession::new(),
            transitions: Vec::new(),
        }
    }

    /// The current flow step.
    pub fn step(&self) -> FlowStep {
        self.step
    }

    /// The capture session owned by this attempt.
    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    /// Ordered log of all step transitions.
    pub fn transitions(&self) -> &[FlowTransitionRecord] {
        &self.transitions
    }

    /// Start the flow (INTRO → DOCUMENT_CHOICE).
    pub fn start(&mut self) -> Result<FlowStep, FlowError> {
        self.require_step(FlowStep::Intro, "document_choice")?;
        self.do_transition(FlowStep::DocumentChoice, "flow started");
        Ok(self.step)
    }

    /// Select the document kind (DOCUMENT_CHOICE → DOCUMENT_SCAN_RECTO).
    ///
    /// Stores the kind on the session; the choice determines whether a
    /// verso capture step follows the recto.
    pub fn select_document(&mut self, kind: DocumentKind) -> Result<FlowStep, FlowError> {
        self.require_step(FlowStep::DocumentChoice, "document_scan_recto")?;
        self.session.document_type = Some(kind);
        self.do_transition(
            FlowStep::DocumentScanRecto,
            &format!("document selected: {kind}"),
        );
        Ok(self.step)
    }

    /// Capture the document front side (DOCUMENT_SCAN_RECTO →
    /// DOCUMENT_SCAN_VERSO or SELFIE).
    ///
    /// The next step is `DocumentScanVerso` when the selected kind
    /// requires a verso side, `Selfie` otherwise.
    pub fn capture_recto(&mut self, blob: CaptureBlob) -> Result<FlowStep, FlowError> {
        self.require_step(FlowStep::DocumentScanRecto, "document_scan_verso or selfie")?;
        let kind = self
            .session
            .document_type
            .ok_or(FlowError::MissingDocumentType)?;
        self.session.set(CaptureSlot::Recto, CapturedFrame::new(blob));
        if kind.requires_verso() {
            self.do_transition(FlowStep::DocumentScanVerso, "recto captured");
        } else {
            self.do_transition(FlowStep::Selfie, "recto captured");
        }
        Ok(self.step)
    }

    /// Capture the document back side (DOCUMENT_SCAN_VERSO → SELFIE).
    pub fn capture_verso(&mut self, blob: CaptureBlob) -> Result<FlowStep, FlowError> {
        self.require_step(FlowStep::DocumentScanVerso, "selfie")?;
        self.session.set(CaptureSlot::Verso, CapturedFrame::new(blob));
        self.do_transition(FlowStep::Selfie, "verso captured");
        Ok(self.step)
    }

    /// Capture the selfie (SELFIE → PROCESSING, or SELFIE → ERROR on a
    /// failed precondition).
    ///
    /// Capture is the commit: there is no separate submit event. Entering
    /// `Processing` requires a selected document kind and a recto frame;
    /// if either is absent the machine stores a `missing_document`
    /// outcome and goes straight to `Error` without any network contact.
    pub fn capture_selfie(&mut self, blob: CaptureBlob) -> Result<FlowStep, FlowError> {
        self.require_step(FlowStep::Selfie, "processing")?;
        self.session
            .set(CaptureSlot::Selfie, CapturedFrame::new(blob));
        if self.session.document_type.is_none() || !self.session.has(CaptureSlot::Recto) {
            self.session.last_outcome =
                Some(VerificationOutcome::missing_document("no document captured"));
            self.do_transition(FlowStep::Error, "missing document precondition");
        } else {
            self.do_transition(FlowStep::Processing, "selfie captured");
        }
        Ok(self.step)
    }

    /// Resolve the attempt (PROCESSING → SUCCESS or ERROR).
    ///
    /// Called by the submission pipeline with the attempt outcome. The
    /// outcome is stored on the session and carried into the resolution
    /// step.
    pub fn resolve(&mut self, outcome: VerificationOutcome) -> Result<FlowStep, FlowError> {
        self.require_step(FlowStep::Processing, "success or error")?;
        let reason = match outcome.error_code() {
            None => "resolved: verified".to_string(),
            Some(code) => format!("resolved: {code}"),
        };
        let next = if outcome.is_success() {
            FlowStep::Success
        } else {
            FlowStep::Error
        };
        self.session.last_outcome = Some(outcome);
        self.do_transition(next, &reason);
        Ok(self.step)
    }

    /// Navigate one step backwards.
    ///
    /// * `DocumentChoice` → `Intro`.
    /// * `DocumentScanRecto` → `DocumentChoice`, clearing the selected
    ///   kind. Captured frames are kept; only `retry` and `reset` clear
    ///   them.
    /// * `DocumentScanVerso` → `DocumentScanRecto`.
    /// * `Selfie` → `DocumentScanVerso` or `DocumentScanRecto`, by
    ///   whether the selected kind requires a verso side.
    /// * `Error` → `Intro`, wiping the session.
    ///
    /// `Intro`, `Processing`, and `Success` have no backward edge.
    pub fn back(&mut self) -> Result<FlowStep, FlowError> {
        match self.step {
            FlowStep::DocumentChoice => {
                self.do_transition(FlowStep::Intro, "back");
            }
            FlowStep::DocumentScanRecto => {
                self.session.document_type = None;
                self.do_transition(FlowStep::DocumentChoice, "back");
            }
            FlowStep::DocumentScanVerso => {
                self.do_transition(FlowStep::DocumentScanRecto, "back");
            }
            FlowStep::Selfie => {
                let kind = self
                    .session
                    .document_type
                    .ok_or(FlowError::MissingDocumentType)?;
                if kind.requires_verso() {
                    self.do_transition(FlowStep::DocumentScanVerso, "back");
                } else {
                    self.do_transition(FlowStep::DocumentScanRecto, "back");
                }
            }
            FlowStep::Error => {
                self.session.clear_all();
                self.do_transition(FlowStep::Intro, "back");
            }
            FlowStep::Intro | FlowStep::Processing | FlowStep::Success => {
                return Err(FlowError::InvalidTransition {
                    from: self.step.to_string(),
                    to: "previous step".to_string(),
                });
            }
        }
        Ok(self.step)
    }

    /// Re-enter a capture step from the error screen (ERROR →
    /// DOCUMENT_SCAN_RECTO, DOCUMENT_SCAN_VERSO, or SELFIE).
    ///
    /// Clears only the named slot and the stored failure outcome. Slots
    /// captured after the named one are kept; re-capturing replaces them
    /// as the flow passes through again. `retry(Verso)` is rejected when
    /// the selected kind has no verso side.
    pub fn retry(&mut self, slot: CaptureSlot) -> Result<FlowStep, FlowError> {
        let target = match slot {
            CaptureSlot::Recto => FlowStep::DocumentScanRecto,
            CaptureSlot::Verso => FlowStep::DocumentScanVerso,
            CaptureSlot::Selfie => FlowStep::Selfie,
        };
        self.require_step(FlowStep::Error, target.as_str())?;
        if slot == CaptureSlot::Verso {
            let kind = self
                .session
                .document_type
                .ok_or(FlowError::MissingDocumentType)?;
            if !kind.requires_verso() {
                return Err(FlowError::InvalidTransition {
                    from: self.step.to_string(),
                    to: target.to_string(),
                });
            }
        }
        self.session.clear(slot);
        self.session.last_outcome = None;
        self.do_transition(target, &format!("retry {slot}"));
        Ok(self.step)
    }

    /// Acknowledge a verified attempt (SUCCESS → INTRO).
    ///
    /// The caller reads the verified outcome off the session before
    /// acknowledging; acknowledgement wipes the session.
    pub fn acknowledge_success(&mut self) -> Result<FlowStep, FlowError> {
        self.require_step(FlowStep::Success, "intro")?;
        self.session.clear_all();
        self.do_transition(FlowStep::Intro, "success acknowledged");
        Ok(self.step)
    }

    /// Return to `Intro` from any step, wiping the session.
    ///
    /// Idempotent: resetting a machine already at `Intro` records no
    /// transition, and an already-empty session stays empty.
    pub fn reset(&mut self) {
        if self.step != FlowStep::Intro {
            self.do_transition(FlowStep::Intro, "reset");
        }
        self.session.clear_all();
    }

    /// Validate that the flow is at the expected step.
    fn require_step(&self, expected: FlowStep, target: &str) -> Result<(), FlowError> {
        if self.step != expected {
            return Err(FlowError::InvalidTransition {
                from: self.step.to_string(),
                to: target.to_string(),
            });
        }
        Ok(())
    }

    /// Record a step transition.
    fn do_transition(&mut self, to: FlowStep, reason: &str) {
        self.transitions.push(FlowTransitionRecord {
            from_step: self.step,
            to_step: to,
            timestamp: Utc::now(),
            reason: reason.to_string(),
        });
        self.step = to;
    }

    #[cfg(test)]
    fn session_mut(&mut self) -> &mut CaptureSession {
        &mut self.session
    }
}

impl Default for FlowMachine {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
