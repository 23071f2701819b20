//! Configuration loading and resolution.
mod apply;
mod loader;
mod parse;
pub mod types;


pub use apply::{CliOverrides, Settings, SmtpSettings, resolve_settings};
pub use loader::load_config;

pub(crate) use apply::process_env;
#[cfg(test)]
pub(crate) use loader::load_config_file;
pub(crate) use parse::parse_duration_value;
