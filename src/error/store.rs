use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to open database '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: tokio_rusqlite::Error,
    },
    #[error("Database error during {context}: {source}")]
    Query {
        context: &'static str,
        #[source]
        source: tokio_rusqlite::Error,
    },
    #[error("Database ping timed out.")]
    PingTimeout,
}
