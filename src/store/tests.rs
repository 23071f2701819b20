use std::future::Future;
use std::time::Duration;

use tempfile::tempdir;

use super::*;
use crate::args::PositiveUsize;
use crate::dispatch::FailureBreakdown;

fn run_async_test<F>(future: F) -> Result<(), String>
where
    F: Future<Output = Result<(), String>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("Failed to build runtime: {}", err))?;
    runtime.block_on(future)
}

fn record(url: &str, success_count: u64) -> TestRecord {
    TestRecord {
        url: url.to_owned(),
        count: 10,
        concurrency: 3,
        duration_ms: 1_234,
        success_count,
        created_at: "2026-01-01T00:00:00Z".to_owned(),
    }
}

#[test]
fn saved_runs_come_back_newest_first() -> Result<(), String> {
    run_async_test(async {
        let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
        let store = SqliteStore::open(dir.path().join("runs.db"))
            .await
            .map_err(|err| err.to_string())?;

        store
            .save_test_result(&record("http://first", 10))
            .await
            .map_err(|err| err.to_string())?;
        store
            .save_test_result(&record("http://second", 7))
            .await
            .map_err(|err| err.to_string())?;

        let runs = store.recent(10).await.map_err(|err| err.to_string())?;
        let urls: Vec<&str> = runs.iter().map(|run| run.record.url.as_str()).collect();
        if urls != ["http://second", "http://first"] {
            return Err(format!("Unexpected order: {:?}", urls));
        }
        let latest = runs.first().ok_or_else(|| "Missing run".to_owned())?;
        if latest.record != record("http://second", 7) {
            return Err(format!("Unexpected record: {:?}", latest.record));
        }

        let limited = store.recent(1).await.map_err(|err| err.to_string())?;
        if limited.len() != 1 {
            return Err(format!("Expected 1 run, got {}", limited.len()));
        }
        Ok(())
    })
}

#[test]
fn reopening_keeps_history() -> Result<(), String> {
    run_async_test(async {
        let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
        let path = dir.path().join("runs.db");
        {
            let store = SqliteStore::open(&path)
                .await
                .map_err(|err| err.to_string())?;
            store
                .save_test_result(&record("http://kept", 1))
                .await
                .map_err(|err| err.to_string())?;
        }
        let store = SqliteStore::open(&path)
            .await
            .map_err(|err| err.to_string())?;
        let runs = store.recent(5).await.map_err(|err| err.to_string())?;
        if runs.len() != 1 {
            return Err(format!("Expected 1 run after reopen, got {}", runs.len()));
        }
        Ok(())
    })
}

#[test]
fn ping_succeeds_on_open_store() -> Result<(), String> {
    run_async_test(async {
        let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
        let store = SqliteStore::open(dir.path().join("runs.db"))
            .await
            .map_err(|err| err.to_string())?;
        store.ping().await.map_err(|err| err.to_string())
    })
}

#[test]
fn open_fails_for_missing_directory() -> Result<(), String> {
    run_async_test(async {
        let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
        let path = dir.path().join("missing").join("runs.db");
        if SqliteStore::open(&path).await.is_ok() {
            return Err("Expected open to fail".to_owned());
        }
        Ok(())
    })
}

#[test]
fn record_from_run_copies_spec_and_result() -> Result<(), String> {
    let workers = PositiveUsize::try_from(4).map_err(|err| err.to_string())?;
    let spec = TestSpec::new("http://target", 9, workers);
    let result = RunResult {
        duration: Duration::from_millis(1_500),
        success_count: 8,
        total_count: 9,
        failures: FailureBreakdown {
            non_ok_status: 1,
            timeouts: 0,
            transport_errors: 0,
        },
    };
    let record = TestRecord::from_run(&spec, &result);
    if record.url != "http://target"
        || record.count != 9
        || record.concurrency != 4
        || record.duration_ms != 1_500
        || record.success_count != 8
    {
        return Err(format!("Unexpected record: {:?}", record));
    }
    if chrono::DateTime::parse_from_rfc3339(&record.created_at).is_err() {
        return Err(format!("created_at is not RFC 3339: {}", record.created_at));
    }
    Ok(())
}
