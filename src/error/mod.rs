mod app;
mod config;
mod control;
mod http;
mod mail;
mod store;
mod validation;

#[cfg(test)]
mod test_support;

pub use app::{AppError, AppResult};
pub use config::ConfigError;
pub use control::ControlError;
pub use http::HttpError;
pub use mail::MailError;
pub use store::StoreError;
pub use validation::ValidationError;
