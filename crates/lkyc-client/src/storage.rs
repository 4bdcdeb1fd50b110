//! Typed client for the artifact storage service.
//!
//! Base URL: `storage.api.loka.rent`. All endpoints live under the
//! `storage/api/v1` context path and speak snake_case JSON.
//!
//! ## Endpoints
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | PUT    | `/artifacts/{path}` | Store a capture artifact |
//!
//! Uploads are upsert-safe: re-PUTting a path replaces its content. The
//! service answers with a receipt carrying its own checksum of the
//! stored bytes; the client cross-checks it against the checksum of the
//! bytes as sent and fails the upload on mismatch.
//!
//! Transient failures (transport, 5xx) are re-sent on a short backoff
//! schedule; attach an attempt's [`CancelToken`] with
//! [`HttpArtifactStore::with_cancel`] to stop the backoff when the
//! tenant abandons the attempt.

use async_trait::async_trait;
use lkyc_core::CancelToken;
use serde::{Deserialize, Serialize};

use crate::artifact::{make_handle, sha256_hex, ArtifactError, ArtifactHandle, ArtifactStore};
use crate::error::ClientError;

/// API version path for the storage service.
const STORAGE_API_PREFIX: &str = "storage/api/v1";

// -- Types matching the storage API schema ------------------------------------

/// Upload receipt from the storage service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageReceipt {
    /// Path the artifact was stored at.
    pub path: String,
    /// Size of the stored bytes as counted by the service.
    pub size_bytes: u64,
    /// Lowercase SHA-256 hex of the stored bytes as computed by the
    /// service.
    pub checksum: String,
}

// -- Client -------------------------------------------------------------------

/// Client for the artifact storage service.
#[derive(Debug, Clone)]
pub struct HttpArtifactStore {
    http: reqwest::Client,
    base_url: url::Url,
    cancel: Option<CancelToken>,
}

impl HttpArtifactStore {
    pub(crate) fn new(http: reqwest::Client, base_url: url::Url) -> Self {
        Self {
            http,
            base_url,
            cancel: None,
        }
    }

    /// Tie this client's retry schedule to an attempt's cancel token.
    ///
    /// A fired token stops the backoff between retry waves; it does not
    /// abort a request already in flight.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

#[async_trait]
impl ArtifactStore for HttpArtifactStore {
    /// Store one artifact.
    ///
    /// Calls `PUT {base}/storage/api/v1/artifacts/{path}` with the raw
    /// bytes as the body and the content type as the `Content-Type`
    /// header.
    async fn put(
        &self,
        path: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<ArtifactHandle, ArtifactError> {
        let endpoint = format!("PUT /artifacts/{path}");
        let url = format!("{}{}/artifacts/{path}", self.base_url, STORAGE_API_PREFIX);
        let checksum = sha256_hex(bytes);
        let body = bytes.to_vec();

        let resp = crate::retry::send_with_retry(&endpoint, self.cancel.as_ref(), || {
            self.http
                .put(&url)
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(body.clone())
                .send()
        })
        .await
        .map_err(|e| ClientError::Transit {
            endpoint: endpoint.clone(),
            source: e,
        })?;

        if !resp.status().is_success() {
            return Err(ClientError::from_response(endpoint, resp).await.into());
        }

        let receipt: StorageReceipt = resp.json().await.map_err(|e| ClientError::Decode {
            endpoint,
            source: e,
        })?;

        if receipt.checksum != checksum {
            return Err(ArtifactError::ChecksumMismatch {
                path: path.to_string(),
                sent: checksum,
                received: receipt.checksum,
            });
        }

        Ok(make_handle(path, content_type, bytes))
    }

    fn backend_name(&self) -> &str {
        "HttpArtifactStore"
    }
}
