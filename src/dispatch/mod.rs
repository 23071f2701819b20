//! Fixed-pool GET dispatcher.
//!
//! A run feeds exactly `total_count` work signals through a bounded queue to
//! `worker_count` tasks sharing one HTTP client, waits on a completion
//! barrier until every signal has produced a recorded outcome, and returns
//! the aggregated counts together with the wall-clock duration.
mod barrier;
mod client;
mod outcome;
mod runner;
mod types;


pub use client::ClientSettings;
pub use outcome::{FailureKind, Outcome};
pub use runner::{Dispatcher, run};
pub use types::{FailureBreakdown, RunResult, TestSpec};
