//! # lkyc-core — Foundational Types for the Loka KYC Stack
//!
//! This crate is the bedrock of the tenant identity-verification stack. It
//! defines the shared vocabulary every other crate speaks: identifier
//! newtypes, the identity document catalog, capture slots, verification
//! outcomes, the KYC status lattice, and the cancellation token an attempt
//! shares with its transport. Every other crate in the workspace depends
//! on `lkyc-core`; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain identifiers.** `TenantId`, `LeaseId`,
//!    `SessionId`, `AuditEventId` — all UUID newtypes. No bare strings or
//!    bare UUIDs for identifiers.
//!
//! 2. **Single `DocumentKind` catalog.** One definition of which identity
//!    documents exist and which of them carry a verso side. Adding a kind
//!    forces every consumer to handle it through exhaustive `match`.
//!
//! 3. **Typed failure taxonomy.** `FailureCode` covers the three attempt-level
//!    failures (`missing_document`, `upload_error`, `verification_failed`);
//!    `RejectionReason` carries the provider sub-codes with their user-facing
//!    messaging. No stringly-typed error codes cross a crate boundary.
//!
//! 4. **Validated status transitions.** `KycStatus::can_transition_to`
//!    encodes the legal edges of the profile status machine; repositories
//!    reject anything else.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `lkyc-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug` and `Clone`; the data-bearing ones
//!   implement `Serialize`/`Deserialize`.

pub mod cancel;
pub mod document;
pub mod error;
pub mod id;
pub mod outcome;
pub mod status;

// Re-export primary types for ergonomic imports.
pub use cancel::CancelToken;
pub use document::{CaptureSlot, DocumentKind, DocumentSide, DOCUMENT_KIND_COUNT};
pub use error::ParseError;
pub use id::{AuditEventId, LeaseId, SessionId, TenantId};
pub use outcome::{ExtractedIdentity, FailureCode, RejectionReason, VerificationOutcome};
pub use status::KycStatus;
