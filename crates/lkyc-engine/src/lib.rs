//! # lkyc-engine — Verification Engine for the Loka KYC Stack
//!
//! Everything between a captured frame and a verified profile lives here:
//! the submission pipeline (sequential artifact upload, the processing
//! marker, the oracle call), the result synchronizer (profile write plus
//! lease-document fan-out and the audit trail), and the flow driver that
//! wires the capture machine to both.
//!
//! ## Layering
//!
//! - [`SubmissionPipeline`] turns one capture session into one
//!   [`VerificationOutcome`](lkyc_core::VerificationOutcome). It owns the
//!   attempt shape: uploads abort before the processing marker; once the
//!   marker is written, every path resolves the profile status.
//! - [`ResultSynchronizer`] applies a successful verdict: it is the only
//!   writer of `Verified`, and it fans the stored document out to every
//!   lease the tenant signs, archive-then-insert, with one audit event
//!   per verification.
//! - [`FlowDriver`] drives a [`FlowMachine`](lkyc_flow::FlowMachine)
//!   through the pipeline and surfaces completion to the embedding
//!   application via [`CompletionHandler`].
//!
//! The engine holds its collaborators as trait objects
//! ([`ArtifactStore`](lkyc_client::ArtifactStore),
//! [`VerificationOracle`](lkyc_client::VerificationOracle), the
//! `lkyc-store` repositories), so the whole stack runs identically over
//! the HTTP/Postgres backends and the in-memory ones.

pub mod driver;
pub mod metrics;
pub mod pipeline;
pub mod sync;

pub use lkyc_core::CancelToken;

pub use driver::{CompletionHandler, FlowDriver};
pub use metrics::{MetricsSnapshot, VerifyMetrics};
pub use pipeline::SubmissionPipeline;
pub use sync::{ResultSynchronizer, SyncReport};
