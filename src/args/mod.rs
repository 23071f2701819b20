//! CLI argument types and parsing helpers.
mod cli;
mod defaults;
pub(crate) mod parsers;
mod types;

#[cfg(test)]
mod test_support;

pub use cli::{Cli, Command, HistoryArgs, RunArgs, ServeArgs};
pub use types::{PositiveU64, PositiveUsize};

pub(crate) use defaults::{DEFAULT_DB_PATH, DEFAULT_LISTEN_ADDR, DEFAULT_USER_AGENT};
