//! Emailed run and health reports.
pub mod report;
mod smtp;


use async_trait::async_trait;

use crate::error::MailError;

pub use report::{Report, health_report, run_report};
pub use smtp::SmtpMailer;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}
