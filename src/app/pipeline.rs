use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::Settings;
use crate::dispatch::{Dispatcher, RunResult, TestSpec};
use crate::notify::{Notifier, Report, SmtpMailer, run_report};
use crate::store::{ResultStore, TestRecord};

/// Everything a run needs after validation: the dispatcher and the optional
/// collaborators that receive its result.
pub struct RunContext {
    dispatcher: Dispatcher,
    store: Option<Arc<dyn ResultStore>>,
    notifier: Option<Arc<dyn Notifier>>,
    notify_to: Option<String>,
}

impl RunContext {
    #[must_use]
    pub const fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            store: None,
            notifier: None,
            notify_to: None,
        }
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ResultStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>, to: impl Into<String>) -> Self {
        self.notifier = Some(notifier);
        self.notify_to = Some(to.into());
        self
    }

    /// Attaches an SMTP mailer when both a relay and a recipient are configured.
    #[must_use]
    pub fn with_mailer_from(self, settings: &Settings) -> Self {
        match (settings.smtp.clone(), settings.notify_to.clone()) {
            (Some(smtp), Some(to)) => {
                info!("Email reports enabled: {} via {}:{}", to, smtp.host, smtp.port);
                self.with_notifier(Arc::new(SmtpMailer::new(smtp)), to)
            }
            (None, Some(_)) => {
                info!("Email reports disabled: no SMTP host configured.");
                self
            }
            (Some(_) | None, None) => {
                info!("Email reports disabled: no recipient configured.");
                self
            }
        }
    }

    #[must_use]
    pub fn store(&self) -> Option<&Arc<dyn ResultStore>> {
        self.store.as_ref()
    }

    #[must_use]
    pub const fn emails_enabled(&self) -> bool {
        self.notifier.is_some() && self.notify_to.is_some()
    }

    pub(crate) async fn deliver(&self, report: &Report) {
        let (Some(notifier), Some(to)) = (self.notifier.as_ref(), self.notify_to.as_deref())
        else {
            return;
        };
        match notifier.send_email(to, &report.subject, &report.body).await {
            Ok(()) => info!("Sent \"{}\" to {}", report.subject, to),
            Err(err) => error!("Failed to send \"{}\": {}", report.subject, err),
        }
    }
}

/// Dispatches one burst and hands the result to the store and the mailer.
///
/// Collaborator failures are logged and never change the returned result.
pub async fn execute_run(ctx: &RunContext, spec: &TestSpec) -> RunResult {
    info!(
        "Starting load test: {} requests to {} at concurrency {}",
        spec.total_count,
        spec.target_url,
        spec.worker_count.get()
    );
    let result = ctx.dispatcher.run(spec).await;
    info!(
        "Load test finished for {}: {}/{} successful in {}ms",
        spec.target_url,
        result.success_count,
        result.total_count,
        result.duration_ms()
    );

    if let Some(store) = ctx.store.as_ref() {
        let record = TestRecord::from_run(spec, &result);
        match store.save_test_result(&record).await {
            Ok(()) => info!("Recorded run for {}", spec.target_url),
            Err(err) => error!("Failed to record run for {}: {}", spec.target_url, err),
        }
    }

    let report = run_report(&spec.target_url, spec.worker_count.get(), &result);
    ctx.deliver(&report).await;
    result
}

/// Fire-and-forget variant used by the control server.
pub fn spawn_run(ctx: Arc<RunContext>, spec: TestSpec) -> JoinHandle<RunResult> {
    tokio::spawn(async move { execute_run(&ctx, &spec).await })
}

pub(crate) fn spawn_report(ctx: Arc<RunContext>, report: Report) -> JoinHandle<()> {
    tokio::spawn(async move { ctx.deliver(&report).await })
}
