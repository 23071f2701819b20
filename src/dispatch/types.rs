use std::time::Duration;

use crate::args::PositiveUsize;
use crate::error::ValidationError;

/// One burst: `total_count` GETs against `target_url` over `worker_count`
/// workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSpec {
    pub target_url: String,
    pub total_count: u64,
    pub worker_count: PositiveUsize,
}

impl TestSpec {
    #[must_use]
    pub fn new(target_url: impl Into<String>, total_count: u64, worker_count: PositiveUsize) -> Self {
        Self {
            target_url: target_url.into(),
            total_count,
            worker_count,
        }
    }

    /// Builds a spec from untrusted caller input.
    ///
    /// # Errors
    ///
    /// Returns an error when the URL is empty or either count is not positive.
    pub fn validated(
        target_url: &str,
        total_count: i64,
        worker_count: i64,
    ) -> Result<Self, ValidationError> {
        if target_url.is_empty() {
            return Err(ValidationError::MissingUrl);
        }
        let total_count = u64::try_from(total_count)
            .ok()
            .filter(|count| *count > 0)
            .ok_or(ValidationError::CountNotPositive)?;
        let worker_count = usize::try_from(worker_count)
            .ok()
            .and_then(|count| PositiveUsize::try_from(count).ok())
            .ok_or(ValidationError::ConcurrencyNotPositive)?;
        Ok(Self::new(target_url, total_count, worker_count))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureBreakdown {
    pub non_ok_status: u64,
    pub timeouts: u64,
    pub transport_errors: u64,
}

impl FailureBreakdown {
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.non_ok_status
            .saturating_add(self.timeouts)
            .saturating_add(self.transport_errors)
    }
}

/// Aggregate of one dispatch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunResult {
    pub duration: Duration,
    pub success_count: u64,
    pub total_count: u64,
    pub failures: FailureBreakdown,
}

impl RunResult {
    #[must_use]
    pub const fn failure_count(&self) -> u64 {
        self.total_count.saturating_sub(self.success_count)
    }

    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX)
    }
}
