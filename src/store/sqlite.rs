use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_rusqlite::Connection;

use crate::error::StoreError;

use super::{ResultStore, TestRecord};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS load_tests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    count INTEGER NOT NULL,
    concurrency INTEGER NOT NULL,
    duration_ms INTEGER NOT NULL,
    success_count INTEGER NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_load_tests_created_at ON load_tests(created_at);";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRun {
    pub id: i64,
    pub record: TestRecord,
}

pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

impl SqliteStore {
    /// Opens (or creates) the database and its `load_tests` table.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be opened or the schema cannot
    /// be created.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)
            .await
            .map_err(|source| StoreError::Open {
                path: path.clone(),
                source,
            })?;
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await
        .map_err(|source| StoreError::Query {
            context: "initialize schema",
            source,
        })?;
        Ok(Self { conn, path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns up to `limit` runs, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error when the query fails.
    pub async fn recent(&self, limit: usize) -> Result<Vec<StoredRun>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, url, count, concurrency, duration_ms, success_count, created_at
                     FROM load_tests ORDER BY id DESC LIMIT ?1",
                )?;
                let rows = stmt.query_map(rusqlite::params![limit], |row| {
                    Ok(StoredRun {
                        id: row.get(0)?,
                        record: TestRecord {
                            url: row.get(1)?,
                            count: clamp_u64(row.get(2)?),
                            concurrency: usize::try_from(row.get::<_, i64>(3)?)
                                .unwrap_or_default(),
                            duration_ms: clamp_u64(row.get(4)?),
                            success_count: clamp_u64(row.get(5)?),
                            created_at: row.get(6)?,
                        },
                    })
                })?;
                let runs = rows.collect::<Result<Vec<_>, rusqlite::Error>>()?;
                Ok(runs)
            })
            .await
            .map_err(|source| StoreError::Query {
                context: "read load tests",
                source,
            })
    }
}

#[async_trait]
impl ResultStore for SqliteStore {
    async fn save_test_result(&self, record: &TestRecord) -> Result<(), StoreError> {
        let record = record.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO load_tests (url, count, concurrency, duration_ms, success_count, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    rusqlite::params![
                        record.url,
                        clamp_i64(record.count),
                        i64::try_from(record.concurrency).unwrap_or(i64::MAX),
                        clamp_i64(record.duration_ms),
                        clamp_i64(record.success_count),
                        record.created_at
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(|source| StoreError::Query {
                context: "insert load test",
                source,
            })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.conn
            .call(|conn| {
                conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
                Ok(())
            })
            .await
            .map_err(|source| StoreError::Query {
                context: "ping",
                source,
            })
    }
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn clamp_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}
