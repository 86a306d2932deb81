//! HTTP client wrapper for the upstream sample database API.

use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use url::Url;

use crate::error::{GatewayError, GatewayResult};

/// User agent string identifying this service upstream.
const USER_AGENT: &str = concat!("samples-oai/", env!("CARGO_PKG_VERSION"));

/// Maximum number of attempts for transient failures.
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds).
const RETRY_BASE_DELAY_MS: u64 = 250;

/// Create a blocking HTTP client with a bounded timeout.
pub fn create_client(timeout_secs: u64) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()
}

/// Download a URL as text, retrying connection errors, timeouts and 5xx.
///
/// Upstream reads have no side effects, so a bounded number of retries is
/// safe. Client errors (4xx) are returned immediately.
pub fn download_text(client: &Client, url: &Url) -> GatewayResult<String> {
    let mut last_error: Option<String> = None;

    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            // Exponential backoff: 250ms, 500ms
            let delay = RETRY_BASE_DELAY_MS * (1 << (attempt - 1));
            tracing::debug!(attempt, delay_ms = delay, "Retrying after delay");
            thread::sleep(Duration::from_millis(delay));
        }

        match client.get(url.clone()).send() {
            Ok(response) => {
                let status = response.status();

                if status.is_server_error() {
                    tracing::warn!(
                        status = %status,
                        url = %url,
                        attempt = attempt + 1,
                        max_retries = MAX_RETRIES,
                        "Upstream server error, will retry"
                    );
                    last_error = Some(format!("Server error: {status}"));
                    continue;
                }

                let response = response.error_for_status()?;
                let bytes = response.bytes()?;
                return Ok(String::from_utf8_lossy(&bytes).into_owned());
            }
            Err(e) => {
                if e.is_connect() || e.is_timeout() {
                    tracing::warn!(
                        error = %e,
                        url = %url,
                        attempt = attempt + 1,
                        max_retries = MAX_RETRIES,
                        "Upstream connection error, will retry"
                    );
                    last_error = Some(e.to_string());
                    continue;
                }
                return Err(GatewayError::Http(e));
            }
        }
    }

    Err(GatewayError::RetriesExhausted {
        attempts: MAX_RETRIES,
        message: last_error.unwrap_or_else(|| "Unknown error".to_string()),
    })
}
