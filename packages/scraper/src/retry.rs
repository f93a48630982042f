//! HTTP retry with exponential backoff.
//!
//! Every upstream request goes through [`send_json`], which rebuilds the
//! request on each attempt and retries connection errors, timeouts,
//! HTTP 429 and 5xx. Other 4xx responses are permanent and fail at once.

use std::time::Duration;

use crate::ScrapeError;

/// Retries after the first attempt for transient failures.
///
/// Backoff doubles from one second (1s, 2s, 4s), seven seconds in total.
const MAX_RETRIES: u32 = 3;

/// Full re-fetches when a successful response has an undecodable body.
const MAX_BODY_RETRIES: u32 = 2;

/// Longest body excerpt included in parse-failure logs.
const BODY_PREVIEW_LEN: usize = 300;

/// Sends the request built by `build_request` and parses the body as JSON.
///
/// `build_request` is called once per attempt since a
/// [`reqwest::RequestBuilder`] is consumed by sending it.
///
/// # Errors
///
/// Returns [`ScrapeError`] if the request still fails after all retries,
/// the upstream answers with a permanent error status, or the body is not
/// valid JSON after all re-fetches.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(build_request: F) -> Result<serde_json::Value, ScrapeError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut body_attempt = 0;
    loop {
        let response = send_inner(&build_request).await?;
        let url = response.url().to_string();
        let status = response.status();

        let failure = match response.text().await {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    log::warn!(
                        "JSON parse failed for {url} (status {status}, {} bytes): {e}\n  \
                         body preview: {}",
                        text.len(),
                        preview(&text),
                    );
                    ScrapeError::Parse(format!("{url}: {e}"))
                }
            },
            Err(e) => {
                log::warn!("Body read failed for {url} (status {status}): {e}");
                ScrapeError::Http(e)
            }
        };

        if body_attempt >= MAX_BODY_RETRIES {
            log::error!("Giving up on {url} after {MAX_BODY_RETRIES} body retries");
            return Err(failure);
        }
        body_attempt += 1;
        let delay = backoff(body_attempt);
        log::warn!("  body retry {body_attempt}/{MAX_BODY_RETRIES} in {delay:?}...");
        tokio::time::sleep(delay).await;
    }
}

#[allow(clippy::future_not_send)]
async fn send_inner<F>(build_request: &F) -> Result<reqwest::Response, ScrapeError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;
    loop {
        let failure = match build_request().send().await {
            Ok(response) => {
                let status = response.status();
                if !is_retryable_status(status) {
                    if status.is_client_error() || status.is_server_error() {
                        return Err(ScrapeError::Status {
                            status,
                            url: response.url().to_string(),
                        });
                    }
                    return Ok(response);
                }
                log::warn!("  HTTP {status} from {}", response.url());
                ScrapeError::Status {
                    status,
                    url: response.url().to_string(),
                }
            }
            Err(e) if is_transient(&e) => {
                log::warn!("  transient error: {e}");
                ScrapeError::Http(e)
            }
            Err(e) => return Err(ScrapeError::Http(e)),
        };

        if attempt >= MAX_RETRIES {
            return Err(failure);
        }
        attempt += 1;
        let delay = backoff(attempt);
        log::warn!("  retry {attempt}/{MAX_RETRIES} in {delay:?}...");
        tokio::time::sleep(delay).await;
    }
}

/// Whether a response status is worth retrying (429 and 5xx).
#[must_use]
pub fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}

/// Delay before retry number `attempt` (1-based).
const fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << (attempt - 1))
}

fn preview(text: &str) -> &str {
    if text.len() <= BODY_PREVIEW_LEN {
        return text;
    }
    let mut end = BODY_PREVIEW_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;

    #[test]
    fn retries_rate_limits_and_server_errors_only() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(StatusCode::FORBIDDEN));
        assert!(!is_retryable_status(StatusCode::OK));
    }

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff(1), Duration::from_secs(1));
        assert_eq!(backoff(2), Duration::from_secs(2));
        assert_eq!(backoff(3), Duration::from_secs(4));
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let text = "ə".repeat(BODY_PREVIEW_LEN);
        let cut = preview(&text);
        assert!(cut.len() <= BODY_PREVIEW_LEN);
        assert!(cut.chars().all(|c| c == 'ə'));
        assert_eq!(preview("short"), "short");
    }
}
