use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use tokio::time::timeout;
use tracing::debug;

use super::types::{FailureBreakdown, RunResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Response arrived with a status other than 200.
    Status(u16),
    Timeout,
    Transport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(FailureKind),
}

impl Outcome {
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// Issues one GET and classifies it. The body is always drained so the
/// connection can go back to the pool.
pub(super) async fn execute_get(
    client: &Client,
    target_url: &str,
    response_header_timeout: Duration,
) -> Outcome {
    let response = match timeout(response_header_timeout, client.get(target_url).send()).await {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => {
            debug!("Request failed: {}", err);
            return Outcome::Failure(classify_error(&err));
        }
        Err(_elapsed) => {
            debug!("Timed out waiting for response headers from {}", target_url);
            return Outcome::Failure(FailureKind::Timeout);
        }
    };

    let status = response.status();
    if let Err(err) = drain_response_body(response).await {
        debug!("Failed to read response body: {}", err);
        return Outcome::Failure(classify_error(&err));
    }

    if status == StatusCode::OK {
        Outcome::Success
    } else {
        Outcome::Failure(FailureKind::Status(status.as_u16()))
    }
}

fn classify_error(err: &reqwest::Error) -> FailureKind {
    if err.is_timeout() {
        FailureKind::Timeout
    } else {
        FailureKind::Transport
    }
}

async fn drain_response_body(response: reqwest::Response) -> Result<u64, reqwest::Error> {
    let mut stream = response.bytes_stream();
    let mut total_bytes: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let bytes = chunk?;
        total_bytes = total_bytes.saturating_add(u64::try_from(bytes.len()).unwrap_or(u64::MAX));
    }
    Ok(total_bytes)
}

/// Lock-free outcome counters shared by all workers of one run.
#[derive(Debug, Default)]
pub(super) struct OutcomeTally {
    success: AtomicU64,
    non_ok_status: AtomicU64,
    timeouts: AtomicU64,
    transport_errors: AtomicU64,
}

impl OutcomeTally {
    pub(super) fn record(&self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Success => &self.success,
            Outcome::Failure(FailureKind::Status(_)) => &self.non_ok_status,
            Outcome::Failure(FailureKind::Timeout) => &self.timeouts,
            Outcome::Failure(FailureKind::Transport) => &self.transport_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn finish(&self, total_count: u64, duration: Duration) -> RunResult {
        RunResult {
            duration,
            success_count: self.success.load(Ordering::Acquire),
            total_count,
            failures: FailureBreakdown {
                non_ok_status: self.non_ok_status.load(Ordering::Acquire),
                timeouts: self.timeouts.load(Ordering::Acquire),
                transport_errors: self.transport_errors.load(Ordering::Acquire),
            },
        }
    }
}
