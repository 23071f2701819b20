//! Run history persistence.
mod sqlite;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};

use crate::dispatch::{RunResult, TestSpec};
use crate::error::StoreError;

pub use sqlite::{SqliteStore, StoredRun};

/// One completed run as persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRecord {
    pub url: String,
    pub count: u64,
    pub concurrency: usize,
    pub duration_ms: u64,
    pub success_count: u64,
    /// RFC 3339 UTC timestamp.
    pub created_at: String,
}

impl TestRecord {
    #[must_use]
    pub fn from_run(spec: &TestSpec, result: &RunResult) -> Self {
        Self {
            url: spec.target_url.clone(),
            count: result.total_count,
            concurrency: spec.worker_count.get(),
            duration_ms: result.duration_ms(),
            success_count: result.success_count,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn save_test_result(&self, record: &TestRecord) -> Result<(), StoreError>;

    /// Cheap round trip used by the health check.
    async fn ping(&self) -> Result<(), StoreError>;
}
