//! Failure taxonomy for provider calls.
//!
//! Split by where the call died: `Transit` never got an answer, `Api`
//! got an error status, `Decode` got a 2xx whose body the schema does
//! not admit. Provider error bodies are clamped to a short snippet
//! before they ride in an error — they can echo entire submissions.

/// A provider call that did not produce a usable response.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never completed: connect, TLS, timeout, or a
    /// connection dropped mid-body.
    #[error("provider call {endpoint} failed in transit: {source}")]
    Transit {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The provider answered with an error status.
    #[error("provider call {endpoint} answered HTTP {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        /// Leading fragment of the response body.
        body: String,
    },
    /// The provider answered 2xx with a body that does not match its
    /// schema.
    #[error("provider call {endpoint} returned an unreadable body: {source}")]
    Decode {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The underlying HTTP client could not be built.
    #[error("provider client construction failed: {source}")]
    Init { source: reqwest::Error },
    /// The client configuration is unusable.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}

/// Longest body fragment an `Api` error carries.
const BODY_SNIPPET_MAX: usize = 512;

impl ClientError {
    /// Build the [`ClientError::Api`] variant from an error response,
    /// draining and clamping the body.
    pub(crate) async fn from_response(endpoint: String, resp: reqwest::Response) -> Self {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Self::Api {
            endpoint,
            status,
            body: clamp_body(body),
        }
    }
}

/// Truncate a provider body to a printable snippet, cutting on a char
/// boundary.
fn clamp_body(mut body: String) -> String {
    if body.len() > BODY_SNIPPET_MAX {
        let mut cut = BODY_SNIPPET_MAX;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push('…');
    }
    body
}
