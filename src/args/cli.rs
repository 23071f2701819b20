use clap::{Args, Parser, Subcommand};
use std::time::Duration;

use super::parsers::{
    parse_duration_arg, parse_positive_u64, parse_positive_usize, parse_target_url,
};
use super::types::{PositiveU64, PositiveUsize};

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Async HTTP burst load tester - fixed worker pool dispatcher with a JSON control surface, SQLite run history, and emailed reports."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to config file (TOML or JSON); defaults to ./loadtester.toml or ./loadtester.json
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    /// Enable debug logging (overridden by LOADTESTER_LOG / RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Serve the HTTP control surface (POST /start-test, GET /health)
    Serve(ServeArgs),
    /// Run a single burst and print its summary
    Run(RunArgs),
    /// List recorded runs from the database
    History(HistoryArgs),
}

#[derive(Debug, Args, Clone)]
pub struct ServeArgs {
    /// Address to listen on (e.g., 0.0.0.0:8080); PORT env var sets the port
    #[arg(long)]
    pub listen: Option<String>,

    /// SQLite database path for run history
    #[arg(long)]
    pub db: Option<String>,

    /// Recipient for emailed run reports
    #[arg(long = "notify-to")]
    pub notify_to: Option<String>,

    /// Also email a report for every health check
    #[arg(long = "health-emails")]
    pub health_emails: bool,
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Target URL to GET
    #[arg(long, short, value_parser = parse_target_url)]
    pub url: String,

    /// Total number of requests to issue
    #[arg(long, short = 'n', value_parser = parse_positive_u64)]
    pub count: PositiveU64,

    /// Number of concurrent workers
    #[arg(long, short = 'C', default_value = "1", value_parser = parse_positive_usize)]
    pub concurrency: PositiveUsize,

    /// Record the run in this SQLite database
    #[arg(long)]
    pub db: Option<String>,

    /// Email the run report to this address (requires SMTP settings)
    #[arg(long = "notify-to")]
    pub notify_to: Option<String>,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,

    /// TCP connect timeout (supports ms/s/m/h)
    #[arg(long = "connect-timeout", value_parser = parse_duration_arg)]
    pub connect_timeout: Option<Duration>,

    /// Time allowed for response headers to arrive (supports ms/s/m/h)
    #[arg(long = "header-timeout", value_parser = parse_duration_arg)]
    pub response_header_timeout: Option<Duration>,

    /// Overall per-request timeout (supports ms/s/m/h)
    #[arg(long = "request-timeout", value_parser = parse_duration_arg)]
    pub request_timeout: Option<Duration>,
}

#[derive(Debug, Args, Clone)]
pub struct HistoryArgs {
    /// SQLite database path for run history
    #[arg(long)]
    pub db: Option<String>,

    /// Number of most recent runs to show
    #[arg(long, default_value = "20", value_parser = parse_positive_usize)]
    pub limit: PositiveUsize,
}
