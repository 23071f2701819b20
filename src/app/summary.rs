use serde::Serialize;

use crate::dispatch::{RunResult, TestSpec};
use crate::error::{AppError, AppResult};
use crate::notify::report::{compute_report_stats, format_duration, format_x100};

#[derive(Debug, Serialize)]
pub(crate) struct RunSummary<'spec> {
    pub(crate) url: &'spec str,
    pub(crate) total_requests: u64,
    pub(crate) concurrency: usize,
    pub(crate) successful: u64,
    pub(crate) failed: u64,
    pub(crate) non_ok_status: u64,
    pub(crate) timeouts: u64,
    pub(crate) transport_errors: u64,
    pub(crate) duration_ms: u64,
    pub(crate) success_rate: String,
    pub(crate) requests_per_sec: String,
}

impl<'spec> RunSummary<'spec> {
    pub(crate) fn new(spec: &'spec TestSpec, result: &RunResult) -> Self {
        let stats = compute_report_stats(result);
        Self {
            url: &spec.target_url,
            total_requests: result.total_count,
            concurrency: spec.worker_count.get(),
            successful: result.success_count,
            failed: result.failure_count(),
            non_ok_status: result.failures.non_ok_status,
            timeouts: result.failures.timeouts,
            transport_errors: result.failures.transport_errors,
            duration_ms: result.duration_ms(),
            success_rate: format_x100(stats.success_rate_x100),
            requests_per_sec: format_x100(stats.requests_per_sec_x100),
        }
    }
}

pub(crate) fn summary_lines(spec: &TestSpec, result: &RunResult) -> Vec<String> {
    let summary = RunSummary::new(spec, result);
    vec![
        format!("Target: {}", summary.url),
        format!("Total Requests: {}", summary.total_requests),
        format!("Concurrency: {}", summary.concurrency),
        format!(
            "Successful: {} ({}%)",
            summary.successful, summary.success_rate
        ),
        format!("Failed: {}", summary.failed),
        format!("Non-200 Status: {}", summary.non_ok_status),
        format!("Timeouts: {}", summary.timeouts),
        format!("Transport Errors: {}", summary.transport_errors),
        format!("Duration: {}", format_duration(result.duration)),
        format!("Throughput: {} req/s", summary.requests_per_sec),
    ]
}

pub(crate) fn render_json(spec: &TestSpec, result: &RunResult) -> AppResult<String> {
    serde_json::to_string_pretty(&RunSummary::new(spec, result)).map_err(AppError::from)
}

pub(crate) fn print_summary(spec: &TestSpec, result: &RunResult, json: bool) -> AppResult<()> {
    if json {
        println!("{}", render_json(spec, result)?);
        return Ok(());
    }
    for line in summary_lines(spec, result) {
        println!("{}", line);
    }
    Ok(())
}
