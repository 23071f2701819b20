//! Run orchestration shared by the CLI subcommands and the control server.
mod history;
mod oneshot;
pub mod pipeline;
mod serve;
pub(crate) mod summary;


pub use pipeline::{RunContext, execute_run, spawn_run};

pub(crate) use history::show_history;
pub(crate) use oneshot::run_once;
pub(crate) use serve::serve;
