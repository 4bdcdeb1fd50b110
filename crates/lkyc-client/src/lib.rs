//! # lkyc-client -- Typed Rust clients for the verification providers
//!
//! Provides ergonomic, typed access to the two external services the
//! identity-verification pipeline depends on:
//! - **Artifact storage** via `storage.api.loka.rent`
//! - **Verification oracle** via `verify.api.loka.rent`
//!
//! ## Architecture
//!
//! This crate is the ONLY authorized path for the KYC stack to talk to
//! provider HTTP endpoints. The pipeline in `lkyc-engine` consumes the
//! [`ArtifactStore`] and [`VerificationOracle`] traits, so engine code
//! never sees a URL; swapping a provider means implementing a trait, not
//! rewiring the pipeline. Attempt cancellation reaches the transport
//! too: [`ProviderClient::with_cancel`] threads one
//! [`CancelToken`](lkyc_core::CancelToken) into the retry schedules of
//! both sub-clients.
//!
//! ## API Path Convention
//!
//! Both providers expose versioned context paths. The full URL pattern
//! is `{base_url}/{context-path}/api/v1/{resource}`. For example:
//! `https://storage.api.loka.rent/storage/api/v1/artifacts/{path}`.

pub mod artifact;
pub mod config;
pub mod error;
pub mod oracle;
pub(crate) mod retry;
pub mod storage;
pub mod verify;

pub use artifact::{
    artifact_path, sha256_hex, ArtifactError, ArtifactHandle, ArtifactStore, FsArtifactStore,
    MemoryArtifactStore, SubmittedArtifacts,
};
pub use config::ClientConfig;
pub use error::ClientError;
pub use oracle::{MockOracle, OracleError, OracleVerdict, VerificationOracle};
pub use storage::HttpArtifactStore;
pub use verify::HttpOracle;

use std::time::Duration;

/// Top-level provider client. Holds sub-clients for each service.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    storage: storage::HttpArtifactStore,
    oracle: verify::HttpOracle,
}

impl ProviderClient {
    /// Create a new provider client from configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::AUTHORIZATION,
                    reqwest::header::HeaderValue::from_str(&format!(
                        "Bearer {}",
                        config.api_token.as_str()
                    ))
                    .map_err(|_| ClientError::Config(config::ConfigError::InvalidToken))?,
                );
                headers
            })
            .build()
            .map_err(|e| ClientError::Init { source: e })?;

        Ok(Self {
            storage: storage::HttpArtifactStore::new(http.clone(), config.storage_url),
            oracle: verify::HttpOracle::new(http, config.oracle_url),
        })
    }

    /// Tie both sub-clients' retry schedules to a verification
    /// attempt's cancel token — share the token you hand the submission
    /// pipeline, and mint a fresh pair for the next attempt.
    pub fn with_cancel(mut self, cancel: lkyc_core::CancelToken) -> Self {
        self.storage = self.storage.with_cancel(cancel.clone());
        self.oracle = self.oracle.with_cancel(cancel);
        self
    }

    /// Create a client using configuration from environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Access the artifact storage client.
    pub fn storage(&self) -> &storage::HttpArtifactStore {
        &self.storage
    }

    /// Access the verification oracle client.
    pub fn oracle(&self) -> &verify::HttpOracle {
        &self.oracle
    }
}
