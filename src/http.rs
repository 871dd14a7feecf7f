use crate::error::HttpError;
use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Done,
    RetryLater,
    Fail,
}

fn classify(status: StatusCode) -> Outcome {
    if status.is_success() {
        Outcome::Done
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        Outcome::RetryLater
    } else {
        Outcome::Fail
    }
}

/// Sends the request built by `build` until it is not rate limited.
///
/// A 429 answer sleeps for `backoff` and tries again, with no upper bound on
/// attempts. Any other non-success status is returned as
/// [`HttpError::Status`].
pub async fn send_with_retry<F>(build: F, backoff: Duration) -> Result<Response, HttpError>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 1;
    loop {
        let response = build().send().await?;
        let status = response.status();
        let url = response.url().to_string();
        debug!("{} answered {} (attempt {})", url, status, attempt);

        match classify(status) {
            Outcome::Done => return Ok(response),
            Outcome::RetryLater => {
                warn!(
                    "Rate limited by {}, retrying in {} ms",
                    url,
                    backoff.as_millis()
                );
                sleep(backoff).await;
                attempt += 1;
            }
            Outcome::Fail => {
                let body = response.text().await.unwrap_or_default();
                return Err(HttpError::Status { url, status, body });
            }
        }
    }
}
