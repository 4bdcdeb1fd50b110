//! Retry schedule for provider calls.
//!
//! Capture uploads sit on the interactive path of a verification
//! attempt: a tenant is watching a spinner while their frames go up.
//! The schedule is therefore short — two retry waves with sub-second
//! backoff — and it abandons the remaining waves as soon as the
//! attempt's [`CancelToken`] fires.
//!
//! Transient failures are retried: transport errors (connect, TLS,
//! timeout) and server errors (5xx). Both provider calls are safe to
//! re-send — the artifact PUT is an upsert and the verification POST a
//! pure evaluation of stored artifacts. Client errors (4xx) are
//! contract violations and surface immediately.

use std::time::Duration;

use lkyc_core::CancelToken;

/// Retry waves after the initial request.
const MAX_RETRIES: u32 = 2;

/// First backoff; doubles each wave: 150ms, 300ms.
const BASE_DELAY_MS: u64 = 150;

/// Send a provider request, retrying transient failures on a short
/// backoff.
///
/// `send` is called up to `MAX_RETRIES + 1` times. The return value is
/// whatever the wire last produced: a 5xx response that survives the
/// whole schedule comes back as `Ok`, so callers keep one status-code
/// path for "the provider said no".
///
/// A fired `cancel` token stops the schedule between waves — the
/// current outcome is returned as-is and nothing is re-sent. It never
/// aborts a request already in flight.
pub(crate) async fn send_with_retry<F, Fut>(
    endpoint: &str,
    cancel: Option<&CancelToken>,
    send: F,
) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    let mut wave = 0u32;
    loop {
        let outcome = send().await;
        let transient = match &outcome {
            Ok(resp) => resp.status().is_server_error(),
            Err(_) => true,
        };
        if !transient || wave == MAX_RETRIES {
            return outcome;
        }

        let delay = Duration::from_millis(BASE_DELAY_MS << wave);
        match &outcome {
            Ok(resp) => tracing::warn!(
                endpoint,
                wave = wave + 1,
                status = resp.status().as_u16(),
                "provider answered a server error, retrying in {delay:?}"
            ),
            Err(e) => tracing::warn!(
                endpoint,
                wave = wave + 1,
                "provider call failed in transit, retrying in {delay:?}: {e}"
            ),
        }

        if cancel.is_some_and(|c| c.is_cancelled()) {
            tracing::debug!(endpoint, "attempt cancelled, abandoning the retry schedule");
            return outcome;
        }
        tokio::time::sleep(delay).await;
        if cancel.is_some_and(|c| c.is_cancelled()) {
            tracing::debug!(endpoint, "attempt cancelled during backoff");
            return outcome;
        }
        wave += 1;
    }
}
