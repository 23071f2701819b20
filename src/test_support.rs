//! Shared fixtures for unit tests: an HTTP target double and recording
//! implementations of the collaborator ports.
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::error::{MailError, StoreError};
use crate::notify::Notifier;
use crate::store::{ResultStore, TestRecord};

pub(crate) fn run_async_test<F>(future: F) -> Result<(), String>
where
    F: Future<Output = Result<(), String>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .map_err(|err| format!("Failed to build runtime: {}", err))?;
    runtime.block_on(future)
}

/// How the mock target frames its replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MockMode {
    /// One request per connection, answered with `Connection: close`.
    Close,
    /// Serves requests on the same connection until the client hangs up.
    KeepAlive,
    /// Sends headers announcing a body it never finishes.
    StalledBody,
}

#[derive(Default)]
struct MockStats {
    connections: AtomicU64,
    hits: AtomicU64,
    in_flight: AtomicU64,
    max_in_flight: AtomicU64,
}

/// Answers every request with a fixed status after a fixed delay.
pub(crate) struct MockServer {
    pub(crate) url: String,
    stats: Arc<MockStats>,
    handle: JoinHandle<()>,
}

impl MockServer {
    pub(crate) fn hits(&self) -> u64 {
        self.stats.hits.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> u64 {
        self.stats.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn connections(&self) -> u64 {
        self.stats.connections.load(Ordering::SeqCst)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub(crate) async fn spawn_mock(status: u16, latency: Duration) -> Result<MockServer, String> {
    spawn_mock_with(status, latency, MockMode::Close).await
}

pub(crate) async fn spawn_mock_with(
    status: u16,
    latency: Duration,
    mode: MockMode,
) -> Result<MockServer, String> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|err| format!("bind mock server failed: {}", err))?;
    let addr = listener
        .local_addr()
        .map_err(|err| format!("mock server addr failed: {}", err))?;
    let stats = Arc::new(MockStats::default());
    let server_stats = Arc::clone(&stats);

    let handle = tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            server_stats.connections.fetch_add(1, Ordering::SeqCst);
            let stats = Arc::clone(&server_stats);
            tokio::spawn(async move {
                serve_connection(socket, status, latency, mode, &stats).await;
            });
        }
    });

    Ok(MockServer {
        url: format!("http://{}/", addr),
        stats,
        handle,
    })
}

async fn serve_connection(
    mut socket: TcpStream,
    status: u16,
    latency: Duration,
    mode: MockMode,
    stats: &MockStats,
) {
    let mut buffer = Vec::with_capacity(1024);
    loop {
        if !read_request_head(&mut socket, &mut buffer).await {
            return;
        }

        stats.hits.fetch_add(1, Ordering::SeqCst);
        let now = stats
            .in_flight
            .fetch_add(1, Ordering::SeqCst)
            .saturating_add(1);
        stats.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        stats.in_flight.fetch_sub(1, Ordering::SeqCst);

        let reason = if status == 200 { "OK" } else { "Error" };
        let response = match mode {
            MockMode::Close => format!(
                "HTTP/1.1 {} {}\r\nContent-Length: 2\r\nConnection: close\r\n\r\nOK",
                status, reason
            ),
            MockMode::KeepAlive => {
                format!("HTTP/1.1 {} {}\r\nContent-Length: 2\r\n\r\nOK", status, reason)
            }
            MockMode::StalledBody => format!(
                "HTTP/1.1 {} {}\r\nContent-Length: 100\r\n\r\nOK",
                status, reason
            ),
        };
        if socket.write_all(response.as_bytes()).await.is_err() {
            return;
        }
        match mode {
            MockMode::KeepAlive => {}
            MockMode::Close => {
                drop(socket.shutdown().await);
                return;
            }
            MockMode::StalledBody => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                return;
            }
        }
    }
}

/// Consumes one request head from `buffer`, reading more as needed. GET
/// requests carry no body, so anything after the blank line is the next
/// pipelined request.
async fn read_request_head(socket: &mut TcpStream, buffer: &mut Vec<u8>) -> bool {
    let mut chunk = [0u8; 1024];
    loop {
        if let Some(end) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            let rest = buffer.split_off(end.saturating_add(4));
            *buffer = rest;
            return true;
        }
        let Ok(read) = socket.read(&mut chunk).await else {
            return false;
        };
        if read == 0 {
            return false;
        }
        buffer.extend_from_slice(chunk.get(..read).unwrap_or_default());
    }
}

/// In-memory store; `healthy = false` makes every call fail.
pub(crate) struct RecordingStore {
    pub(crate) records: Mutex<Vec<TestRecord>>,
    pub(crate) healthy: bool,
}

impl RecordingStore {
    pub(crate) const fn new(healthy: bool) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            healthy,
        }
    }

    pub(crate) fn saved(&self) -> Vec<TestRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ResultStore for RecordingStore {
    async fn save_test_result(&self, record: &TestRecord) -> Result<(), StoreError> {
        if !self.healthy {
            return Err(StoreError::PingTimeout);
        }
        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if self.healthy {
            Ok(())
        } else {
            Err(StoreError::PingTimeout)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SentEmail {
    pub(crate) to: String,
    pub(crate) subject: String,
    pub(crate) body: String,
}

/// Captures emails; `fail = true` rejects every send after recording it.
pub(crate) struct RecordingNotifier {
    pub(crate) sent: Mutex<Vec<SentEmail>>,
    pub(crate) fail: bool,
}

impl RecordingNotifier {
    pub(crate) const fn new(fail: bool) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail,
        }
    }

    pub(crate) fn sent(&self) -> Vec<SentEmail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentEmail {
                to: to.to_owned(),
                subject: subject.to_owned(),
                body: body.to_owned(),
            });
        }
        if self.fail {
            return Err(MailError::ConnectionClosed { context: "test" });
        }
        Ok(())
    }
}

/// Polls `check` until it holds or `limit` elapses.
pub(crate) async fn wait_until<F>(limit: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let polling = async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(limit, polling).await.is_ok()
}
