//! # lkyc-store — Durable State for the Loka KYC Stack
//!
//! Repositories for everything the verification pipeline persists: tenant
//! identity profiles, lease signer rosters, per-lease identity documents,
//! and the append-only audit log.
//!
//! ## Architecture
//!
//! Persistence is split along three trait seams — [`IdentityRepo`],
//! [`LeaseRepo`], [`AuditRepo`] — so the pipeline and synchronizer depend
//! on behavior, not on a database:
//!
//! - [`postgres`] holds the production implementations over `sqlx`
//!   (runtime queries, no compile-time checking against a live schema).
//! - [`memory`] holds in-memory implementations used by unit and
//!   integration tests, including failure injection for fan-out tests.
//!
//! ## Status Machine Enforcement
//!
//! Both backends funnel every profile status write through
//! `KycStatus::can_transition_to`. An illegal edge (`unverified ->
//! verified` with no attempt in flight, `processing -> processing`, ...)
//! is a [`StoreError::InvalidStatusTransition`], never a silent overwrite.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod records;
pub mod repo;

pub use error::StoreError;
pub use memory::{MemoryAuditRepo, MemoryIdentityRepo, MemoryLeaseRepo, Store};
pub use postgres::{PgAuditRepo, PgIdentityRepo, PgLeaseRepo};
pub use records::{
    AuditEvent, LeaseDocumentRecord, LeaseDocumentType, LeaseRef, NewAuditEvent, NewLeaseDocument,
    SignerRole, TenantIdentityRecord, VerifiedIdentityUpdate,
};
pub use repo::{AuditRepo, IdentityRepo, LeaseRepo};
