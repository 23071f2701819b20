use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::{debug, warn};

use crate::args::PositiveUsize;
use crate::error::HttpError;

use super::barrier::CompletionBarrier;
use super::client::{ClientSettings, build_client};
use super::outcome::{OutcomeTally, execute_get};
use super::types::{RunResult, TestSpec};

/// Owns the shared client. Holds no per-run state, so one instance can serve
/// any number of sequential or overlapping runs.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: Client,
    response_header_timeout: Duration,
}

impl Dispatcher {
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(settings: &ClientSettings) -> Result<Self, HttpError> {
        Ok(Self {
            client: build_client(settings)?,
            response_header_timeout: settings.response_header_timeout,
        })
    }

    /// Issues exactly `spec.total_count` requests and waits for all of them.
    ///
    /// Per-request failures are counted, never returned.
    pub async fn run(&self, spec: &TestSpec) -> RunResult {
        let worker_count = spec.worker_count.get();
        let (work_tx, work_rx) = flume::bounded::<()>(worker_count);
        let tally = Arc::new(OutcomeTally::default());
        let barrier = Arc::new(CompletionBarrier::default());
        let target_url: Arc<str> = Arc::from(spec.target_url.as_str());

        debug!(
            "Dispatching {} requests to {} over {} workers",
            spec.total_count, spec.target_url, worker_count
        );

        let started = Instant::now();
        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let worker = Worker {
                id: worker_id,
                client: self.client.clone(),
                target_url: Arc::clone(&target_url),
                response_header_timeout: self.response_header_timeout,
                queue: work_rx.clone(),
                tally: Arc::clone(&tally),
                barrier: Arc::clone(&barrier),
            };
            workers.push(tokio::spawn(worker.run()));
        }
        drop(work_rx);

        for _ in 0..spec.total_count {
            barrier.arm();
            if work_tx.send_async(()).await.is_err() {
                warn!("All workers exited before the queue was drained.");
                barrier.release();
                break;
            }
        }
        drop(work_tx);

        barrier.wait().await;
        let duration = started.elapsed();

        for handle in workers {
            if let Err(err) = handle.await {
                warn!("Worker task failed: {}", err);
            }
        }

        tally.finish(spec.total_count, duration)
    }
}

struct Worker {
    id: usize,
    client: Client,
    target_url: Arc<str>,
    response_header_timeout: Duration,
    queue: flume::Receiver<()>,
    tally: Arc<OutcomeTally>,
    barrier: Arc<CompletionBarrier>,
}

impl Worker {
    async fn run(self) {
        let mut handled: u64 = 0;
        while self.queue.recv_async().await.is_ok() {
            let outcome =
                execute_get(&self.client, &self.target_url, self.response_header_timeout).await;
            self.tally.record(outcome);
            self.barrier.release();
            handled = handled.saturating_add(1);
        }
        debug!("Worker {} exiting after {} requests", self.id, handled);
    }
}

/// One-shot dispatch with the default client settings.
///
/// # Errors
///
/// Returns an error when the HTTP client cannot be built.
pub async fn run(
    target_url: &str,
    total_count: u64,
    worker_count: PositiveUsize,
) -> Result<RunResult, HttpError> {
    let dispatcher = Dispatcher::new(&ClientSettings::default())?;
    Ok(dispatcher
        .run(&TestSpec::new(target_url, total_count, worker_count))
        .await)
}
