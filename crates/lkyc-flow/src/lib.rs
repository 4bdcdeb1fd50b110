//! # lkyc-flow — Capture Session and Verification Flow Machine
//!
//! Models one tenant's verification attempt: the in-memory capture session
//! (document sides, selfie, preview handles) and the step sequencer that
//! drives it. The session is an explicit value owned by the caller and
//! passed through the machine's transition methods — there is no ambient
//! singleton holding flow state.
//!
//! ## Steps
//!
//! ```text
//! Intro ──▶ DocumentChoice ──▶ DocumentScanRecto ──▶ DocumentScanVerso
//!                                       │                    │
//!                                       │ (single-sided)     │
//!                                       ▼                    ▼
//!                                     Selfie ◀───────────────┘
//!                                       │
//!                                       ▼
//!                                  Processing ──▶ Success
//!                                       │
//!                                       └───────▶ Error
//! ```
//!
//! The recto → verso branch is taken exactly when the selected
//! [`DocumentKind`](lkyc_core::DocumentKind) requires a verso side.
//! `back()` walks the same edges in reverse; `retry` re-enters a single
//! capture step from the error screen; `reset` returns to `Intro` from
//! anywhere and wipes the session.
//!
//! ## Design Decision
//!
//! The flow uses an enum step with validated transitions rather than eight
//! typestate types. The branch on runtime document metadata (verso or not)
//! and the bidirectional navigation (`back`, `retry`) mean the current step
//! is data, not a compile-time fact; an enum with `Result`-returning
//! transition methods rejects invalid events at runtime and keeps an
//! ordered transition log for audit.

pub mod machine;
pub mod session;

pub use machine::{FlowError, FlowMachine, FlowStep, FlowTransitionRecord};
pub use session::{CaptureBlob, CaptureSession, CapturedFrame, PreviewHandle};
