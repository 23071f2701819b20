//! Plain-text report bodies.
//!
//! Ratios are computed in fixed point (hundredths) so that a run with zero
//! requests or zero elapsed time still renders without dividing by zero.
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::dispatch::RunResult;

/// Success rate at or above which a target is considered stable (x100).
const STABLE_SUCCESS_RATE_X100: u64 = 9_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportStats {
    pub success_rate_x100: u64,
    pub failure_rate_x100: u64,
    pub requests_per_sec_x100: u64,
    /// Elapsed time divided by request count. This mixes wall-clock time
    /// with concurrency and is only an approximation of request latency.
    pub approx_response_ms_x100: u64,
}

#[must_use]
pub fn compute_report_stats(result: &RunResult) -> ReportStats {
    let total = u128::from(result.total_count);
    let duration_ms = result.duration.as_millis().max(1);

    let ratio_x100 = |numerator: u128, scale: u128, denominator: u128| -> u64 {
        numerator
            .saturating_mul(scale)
            .checked_div(denominator)
            .map_or(0, |value| u64::try_from(value).unwrap_or(u64::MAX))
    };

    ReportStats {
        success_rate_x100: ratio_x100(u128::from(result.success_count), 10_000, total),
        failure_rate_x100: ratio_x100(u128::from(result.failure_count()), 10_000, total),
        requests_per_sec_x100: ratio_x100(total, 100_000, duration_ms),
        approx_response_ms_x100: ratio_x100(result.duration.as_millis(), 100, total),
    }
}

#[must_use]
pub fn format_x100(value: u64) -> String {
    format!("{}.{:02}", value / 100, value % 100)
}

#[must_use]
pub fn format_duration(duration: Duration) -> String {
    format!("{}.{:03}s", duration.as_secs(), duration.subsec_millis())
}

/// Report mailed after every completed run.
#[must_use]
pub fn run_report(url: &str, concurrency: usize, result: &RunResult) -> Report {
    let stats = compute_report_stats(result);
    let success_rate = format_x100(stats.success_rate_x100);
    let throughput = format_x100(stats.requests_per_sec_x100);

    let mut lines = vec![
        "Load test finished.".to_owned(),
        String::new(),
        format!("Target URL: {}", url),
        String::new(),
        "Summary:".to_owned(),
        format!("- Total requests sent: {}", result.total_count),
        format!("- Concurrency level: {}", concurrency),
        format!("- Successful responses: {}", result.success_count),
        format!("- Failed responses: {}", result.failure_count()),
        format!(
            "  (non-200 status: {}, timeouts: {}, transport errors: {})",
            result.failures.non_ok_status,
            result.failures.timeouts,
            result.failures.transport_errors
        ),
        format!("- Success rate: {}%", success_rate),
        format!("- Total duration: {}", format_duration(result.duration)),
        format!("- Throughput: {} req/s", throughput),
        format!(
            "- Approximate average response time: {} ms",
            format_x100(stats.approx_response_ms_x100)
        ),
        String::new(),
        "Analysis:".to_owned(),
        format!("- The target handled about {} requests per second.", throughput),
        format!(
            "- Failure rate was {}%.",
            format_x100(stats.failure_rate_x100)
        ),
        format!(
            "- Up to {} requests were in flight at the same time.",
            concurrency
        ),
    ];

    let verdict = if result.total_count == 0 {
        "- No requests were issued."
    } else if stats.success_rate_x100 >= STABLE_SUCCESS_RATE_X100 {
        "- Success rate is at or above 90%, the target looks stable at this load."
    } else {
        "- Success rate is below 90%, which points to saturation, network trouble, or rate limiting."
    };
    lines.push(verdict.to_owned());

    if result.failure_count() > 0 {
        lines.extend(
            [
                "",
                "Recommendations:",
                "- Check the target's logs and resource usage for the failed requests.",
                "- Consider scaling out, caching, or a load balancer in front of the target.",
                "- Repeat with different counts and concurrency to find the breaking point.",
            ]
            .map(str::to_owned),
        );
    }
    lines.extend(["", "--", "loadtester automated report", ""].map(str::to_owned));
    let body = lines.join("\n");

    Report {
        subject: format!("Load Test Report: {}", url),
        body,
    }
}

/// Report mailed for a health check when health emails are enabled.
#[must_use]
pub fn health_report(status: &str, db_connected: bool, checked_at: DateTime<Utc>) -> Report {
    let verdict = if db_connected {
        "All systems operational."
    } else {
        "Database connection failed, immediate attention required."
    };
    let body = format!(
        "Health check report:\n\nService status: {}\nDatabase connected: {}\nChecked at: {}\n\n{}\n\n--\nloadtester monitoring\n",
        status,
        db_connected,
        checked_at.format("%a, %d %b %Y %H:%M:%S UTC"),
        verdict
    );
    Report {
        subject: "loadtester health check".to_owned(),
        body,
    }
}
