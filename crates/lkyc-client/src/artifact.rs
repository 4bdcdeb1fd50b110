//! # Artifact Store — Capture Upload Contract
//!
//! Defines the storage contract for capture artifacts (document scans and
//! selfies) and its non-HTTP backends. Every stored artifact is addressed
//! by the canonical path convention
//! `identity/{tenant_id}/{document_kind}_{slot}_{timestamp}.jpg` and
//! receipted with a SHA-256 checksum of the stored bytes.
//!
//! ## Architecture
//!
//! The [`ArtifactStore`] trait abstracts over the storage backend.
//! Production deployments use the HTTP client in [`crate::storage`];
//! tests and local development use [`MemoryArtifactStore`] or
//! [`FsArtifactStore`]. Uploads are upsert-safe: a retried attempt may
//! rewrite the same path without error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use lkyc_core::{CaptureSlot, DocumentKind, TenantId};

// ─── Checksums ───────────────────────────────────────────────────────

/// Compute a lowercase SHA-256 hex string over raw artifact bytes.
///
/// Capture artifacts are opaque binary (JPEG frames), so the digest is
/// taken over the bytes as uploaded. No canonicalization applies.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let hash = Sha256::digest(bytes);
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

// ─── Path Convention ─────────────────────────────────────────────────

/// Build the canonical storage path for a capture artifact:
/// `identity/{tenant_id}/{document_kind}_{slot}_{timestamp}.jpg`.
///
/// The timestamp is epoch milliseconds, which keeps re-captures of the
/// same slot from colliding while staying lexically sortable within a
/// tenant directory.
pub fn artifact_path(
    tenant: &TenantId,
    kind: DocumentKind,
    slot: CaptureSlot,
    at: DateTime<Utc>,
) -> String {
    format!(
        "identity/{}/{}_{}_{}.jpg",
        tenant.as_uuid(),
        kind.as_str(),
        slot.as_str(),
        at.timestamp_millis()
    )
}

// ─── Artifact Handle ─────────────────────────────────────────────────

/// Receipt for a stored capture artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactHandle {
    /// Canonical storage path (see [`artifact_path`]).
    pub path: String,
    /// MIME type of the stored bytes.
    pub content_type: String,
    /// Size of the stored bytes.
    pub size_bytes: u64,
    /// Lowercase SHA-256 hex of the stored bytes.
    pub checksum: String,
    /// When the artifact was stored.
    pub created_at: DateTime<Utc>,
}

/// The artifact handles of one completed submission, in the shape the
/// verification oracle consumes: recto, verso for two-sided kinds, and
/// the selfie when one was part of the attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedArtifacts {
    /// Document front side.
    pub recto: ArtifactHandle,
    /// Document back side, for kinds that require one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verso: Option<ArtifactHandle>,
    /// Selfie frame, for attempts that captured one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selfie: Option<ArtifactHandle>,
}

impl SubmittedArtifacts {
    /// Stored paths in upload order (recto, then verso, then selfie,
    /// skipping absent slots).
    pub fn paths(&self) -> Vec<&str> {
        let mut paths = vec![self.recto.path.as_str()];
        if let Some(verso) = &self.verso {
            paths.push(verso.path.as_str());
        }
        if let Some(selfie) = &self.selfie {
            paths.push(selfie.path.as_str());
        }
        paths
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors from artifact store operations.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// The store is unreachable or refused the write.
    #[error("artifact store unavailable: {reason}")]
    Unavailable {
        /// Human-readable description of the outage or refusal.
        reason: String,
    },

    /// Filesystem write failed.
    #[error("failed to write artifact {path}: {source}")]
    Io {
        /// The artifact path that could not be written.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The remote receipt's checksum does not match the uploaded bytes.
    #[error("checksum mismatch for {path}: sent {sent}, receipt says {received}")]
    ChecksumMismatch {
        /// The artifact path that was uploaded.
        path: String,
        /// SHA-256 hex of the bytes as sent.
        sent: String,
        /// SHA-256 hex reported by the storage service.
        received: String,
    },

    /// HTTP client failure.
    #[error(transparent)]
    Transport(#[from] crate::error::ClientError),
}

// ─── Store Contract ──────────────────────────────────────────────────

/// Storage backend for capture artifacts.
///
/// Implementations must be `Send + Sync` so they can be shared across
/// async tasks behind an `Arc`. The trait is object-safe to support
/// runtime backend selection (memory vs. filesystem vs. HTTP).
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store one artifact at the given path, replacing any previous
    /// content at that path.
    async fn put(
        &self,
        path: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<ArtifactHandle, ArtifactError>;

    /// Return the human-readable name of this backend implementation
    /// (e.g. "MemoryArtifactStore", "HttpArtifactStore").
    fn backend_name(&self) -> &str;
}

pub(crate) fn make_handle(path: &str, content_type: &str, bytes: &[u8]) -> ArtifactHandle {
    ArtifactHandle {
        path: path.to_string(),
        content_type: content_type.to_string(),
        size_bytes: bytes.len() as u64,
        checksum: sha256_hex(bytes),
        created_at: Utc::now(),
    }
}

// ─── Memory Backend ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct StoredObject {
    content_type: String,
    bytes: Vec<u8>,
}

/// In-memory artifact store for tests and local development.
///
/// Supports one-shot failure injection: [`fail_next_put`] arms a
/// deterministic [`ArtifactError::Unavailable`] for the next `put`,
/// after which the store recovers.
///
/// [`fail_next_put`]: MemoryArtifactStore::fail_next_put
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    objects: RwLock<HashMap<String, StoredObject>>,
    fail_next: Mutex<Option<String>>,
}

impl MemoryArtifactStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a failure for the next `put` with the given reason.
    pub fn fail_next_put(&self, reason: &str) {
        *self.fail_next.lock() = Some(reason.to_string());
    }

    /// Whether an artifact is stored at the given path.
    pub fn contains(&self, path: &str) -> bool {
        self.objects.read().contains_key(path)
    }

    /// The stored bytes at the given path, if any.
    pub fn bytes_at(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.read().get(path).map(|o| o.bytes.clone())
    }

    /// The stored content type at the given path, if any.
    pub fn content_type_at(&self, path: &str) -> Option<String> {
        self.objects.read().get(path).map(|o| o.content_type.clone())
    }

    /// All stored paths, sorted.
    pub fn stored_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.objects.read().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Number of stored artifacts.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn put(
        &self,
        path: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<ArtifactHandle, ArtifactError> {
        if let Some(reason) = self.fail_next.lock().take() {
            return Err(ArtifactError::Unavailable { reason });
        }
        let handle = make_handle(path, content_type, bytes);
        self.objects.write().insert(
            path.to_string(),
            StoredObject {
                content_type: content_type.to_string(),
                bytes: bytes.to_vec(),
            },
        );
        Ok(handle)
    }

    fn backend_name(&self) -> &str {
        "MemoryArtifactStore"
    }
}

// ─── Filesystem Backend ──────────────────────────────────────────────

/// Filesystem artifact store rooted at a directory.
///
/// Artifact paths become file paths under the root; parent directories
/// are created on demand. Writes replace existing content.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Create a store rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Compute the filesystem path for an artifact path.
    pub fn file_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn put(
        &self,
        path: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<ArtifactHandle, ArtifactError> {
        let file = self.file_path(path);
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ArtifactError::Io {
                    path: path.to_string(),
                    source: e,
                })?;
        }
        tokio::fs::write(&file, bytes)
            .await
            .map_err(|e| ArtifactError::Io {
                path: path.to_string(),
                source: e,
            })?;
        Ok(make_handle(path, content_type, bytes))
    }

    fn backend_name(&self) -> &str {
        "FsArtifactStore"
    }
}
