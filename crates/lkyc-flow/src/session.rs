//! # Capture Session
//!
//! Slot-scoped storage for one verification attempt. Each of the three
//! slots (`recto`, `verso`, `selfie`) holds at most one [`CapturedFrame`]:
//! the raw binary plus a locally-displayable [`PreviewHandle`].
//!
//! ## Resource Contract
//!
//! Every preview handle stored in a slot is revoked on every exit path from
//! that slot: replacement by a newer capture, slot clear (retry), full wipe
//! (reset, teardown), and session drop. No preview outlives the session
//! that created it.
//!
//! Session contents are ephemeral by design: frames carry raw image bytes
//! and are never serialized or persisted. Durable records reference the
//! storage paths produced by the upload step instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use lkyc_core::{CaptureSlot, DocumentKind, SessionId, VerificationOutcome};

// ─── Capture Blob ────────────────────────────────────────────────────

/// Raw bytes of one capture plus the declared content type.
#[derive(Clone, PartialEq, Eq)]
pub struct CaptureBlob {
    bytes: Vec<u8>,
    content_type: String,
}

impl CaptureBlob {
    /// Wrap raw JPEG bytes.
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            content_type: "image/jpeg".to_string(),
        }
    }

    /// Wrap raw bytes with an explicit content type.
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }

    /// The raw capture bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The declared content type.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Size of the capture in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the capture is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for CaptureBlob {
    // Frames are raw image data; print the size, not the bytes.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureBlob")
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

// ─── Preview Handle ──────────────────────────────────────────────────

/// A locally-displayable reference to a captured frame.
///
/// Revocation is shared across clones: revoking any clone marks the
/// underlying preview reference as released everywhere. Revoke is
/// idempotent. The session revokes handles on every exit path; holding a
/// clone lets callers observe that the contract was honored.
#[derive(Debug, Clone)]
pub struct PreviewHandle {
    id: Uuid,
    uri: String,
    revoked: Arc<AtomicBool>,
}

impl PreviewHandle {
    /// Create a fresh, unrevoked preview handle.
    pub fn new() -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            uri: format!("preview://{id}"),
            revoked: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The handle identifier.
    pub fn id(&self) -> &Uuid {
        &self.id
    }

    /// The displayable URI for this preview.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Revoke the underlying preview reference. Idempotent.
    pub fn revoke(&self) {
        self.revoked.store(true, Ordering::SeqCst);
    }

    /// Whether the preview has been revoked.
    pub fn is_revoked(&self) -> bool {
        self.revoked.load(Ordering::SeqCst)
    }
}

impl Default for PreviewHandle {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Captured Frame ──────────────────────────────────────────────────

/// One captured slot: raw binary plus its preview handle.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// The raw capture.
    pub blob: CaptureBlob,
    /// Locally-displayable preview of the capture.
    pub preview: PreviewHandle,
    /// When the capture occurred.
    pub captured_at: DateTime<Utc>,
}

impl CapturedFrame {
    /// Create a frame from a blob, generating a fresh preview handle.
    pub fn new(blob: CaptureBlob) -> Self {
        Self {
            blob,
            preview: PreviewHandle::new(),
            captured_at: Utc::now(),
        }
    }

    /// Revoke this frame's preview handle.
    fn release(&self) {
        self.preview.revoke();
    }
}

// ─── Capture Session ─────────────────────────────────────────────────

/// In-memory state of one verification attempt.
///
/// Created on flow start, destroyed on reset, success-continue, or
/// explicit cancel. Mutated only by the flow machine's transition methods.
/// Not `Clone`: the session exclusively owns its frames so the preview
/// contract has a single enforcement point.
#[derive(Debug)]
pub struct CaptureSession {
    /// Unique session identifier.
    pub id: SessionId,
    /// Selected document kind, if the tenant has chosen one.
    pub document_type: Option<DocumentKind>,
    /// Outcome of the most recent processing resolution.
    pub last_outcome: Option<VerificationOutcome>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    recto: Option<CapturedFrame>,
    verso: Option<CapturedFrame>,
    selfie: Option<CapturedFrame>,
}

impl CaptureSession {
    /// Create an empty session.
    pub fn new() -> Self {
        Self {
            id: SessionId::new(),
            document_type: None,
            last_outcome: None,
            created_at: Utc::now(),
            recto: None,
            verso: None,
            selfie: None,
        }
    }

    /// Store a frame in the named slot, replacing any previous capture.
    ///
    /// The replaced frame's preview is revoked before it is dropped; the
    /// other slots are untouched.
    pub fn set(&mut self, slot: CaptureSlot, frame: CapturedFrame) {
        let cell = self.slot_mut(slot);
        if let Some(previous) = cell.take() {
            previous.release();
        }
        *cell = Some(frame);
    }

    /// The frame currently held in the named slot.
    pub fn get(&self, slot: CaptureSlot) -> Option<&CapturedFrame> {
        match slot {
            CaptureSlot::Recto => self.recto.as_ref(),
            CaptureSlot::Verso => self.verso.as_ref(),
            CaptureSlot::Selfie => self.selfie.as_ref(),
        }
    }

    /// Whether the named slot holds a capture.
    pub fn has(&self, slot: CaptureSlot) -> bool {
        self.get(slot).is_some()
    }

    /// Clear the named slot, revoking its preview. The other slots are
    /// untouched.
    pub fn clear(&mut self, slot: CaptureSlot) {
        if let Some(frame) = self.slot_mut(slot).take() {
            frame.release();
        }
    }

    /// Wipe the whole session: revoke and drop every frame, clear the
    /// selected document kind and the last outcome.
    pub fn clear_all(&mut self) {
        for slot in CaptureSlot::all() {
            self.clear(*slot);
        }
        self.document_type = None;
        self.last_outcome = None;
    }

    /// The slots currently holding a capture, in capture order.
    pub fn captured_slots(&self) -> Vec<CaptureSlot> {
        CaptureSlot::all()
            .iter()
            .copied()
            .filter(|slot| self.has(*slot))
            .collect()
    }

    /// Whether the session holds no document kind, no captures, and no
    /// outcome.
    pub fn is_empty(&self) -> bool {
        self.document_type.is_none()
            && self.last_outcome.is_none()
            && self.recto.is_none()
            && self.verso.is_none()
            && self.selfie.is_none()
    }

    fn slot_mut(&mut self, slot: CaptureSlot) -> &mut Option<CapturedFrame> {
        match slot {
            CaptureSlot::Recto => &mut self.recto,
            CaptureSlot::Verso => &mut self.verso,
            CaptureSlot::Selfie => &mut self.selfie,
        }
    }
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CaptureSession {
    // Safety net: the machine revokes previews on every explicit exit
    // path, but a session dropped mid-flow must not leak live previews.
    fn drop(&mut self) {
        for slot in CaptureSlot::all() {
            if let Some(frame) = self.get(*slot) {
                frame.release();
            }
        }
    }
}
