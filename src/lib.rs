//! Core library for the `loadtester` CLI.
//!
//! The centerpiece is [`dispatch`]: a fixed pool of workers draining a
//! bounded queue of GET requests against one target, with a completion
//! barrier and atomic aggregation. Around it sit the run pipeline, a small
//! JSON control server, SQLite run history, and emailed reports.
pub mod app;
pub mod args;
pub mod config;
pub mod control;
pub mod dispatch;
pub mod entry;
pub mod error;
pub mod logger;
pub mod notify;
pub mod shutdown;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;
