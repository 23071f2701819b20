use std::path::PathBuf;
use std::time::Duration;

use crate::args::parsers::parse_bool_env;
use crate::args::{DEFAULT_DB_PATH, DEFAULT_LISTEN_ADDR};
use crate::dispatch::ClientSettings;
use crate::error::{AppError, AppResult, ConfigError, ValidationError};

use super::parse::parse_duration_value;
use super::types::{ClientConfig, ConfigFile};

const DEFAULT_SMTP_PORT: u16 = 25;
const DEFAULT_SENDER: &str = "loadtester@localhost";

/// Values given on the command line; they win over env and file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub listen: Option<String>,
    pub db_path: Option<String>,
    pub notify_to: Option<String>,
    pub health_emails: bool,
    pub connect_timeout: Option<Duration>,
    pub response_header_timeout: Option<Duration>,
    pub request_timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub listen: String,
    pub db_path: PathBuf,
    pub smtp: Option<SmtpSettings>,
    pub notify_to: Option<String>,
    pub health_emails: bool,
    pub client: ClientSettings,
}

pub(crate) fn process_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

/// Resolves settings with precedence CLI > environment > config file > defaults.
///
/// # Errors
///
/// Returns an error when an environment variable or config value is malformed.
pub fn resolve_settings<E>(
    file: Option<&ConfigFile>,
    env: E,
    overrides: &CliOverrides,
) -> AppResult<Settings>
where
    E: Fn(&str) -> Option<String>,
{
    let file = file.cloned().unwrap_or_default();

    let listen = match (overrides.listen.clone(), env("PORT")) {
        (Some(listen), _) => listen,
        (None, Some(port)) => {
            let port: u16 = port.trim().parse().map_err(|err| {
                AppError::config(ConfigError::InvalidEnv {
                    name: "PORT",
                    source: ValidationError::InvalidPort {
                        value: port.clone(),
                        source: err,
                    },
                })
            })?;
            format!("0.0.0.0:{}", port)
        }
        (None, None) => file
            .server
            .as_ref()
            .and_then(|server| server.listen.clone())
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_owned()),
    };

    let from_database_url = || {
        env("DATABASE_URL")
            .map(|url| sqlite_path_from_url(&url))
            .transpose()
    };
    let db_path = overrides
        .db_path
        .clone()
        .or_else(|| env("DATABASE_PATH"))
        .map_or_else(from_database_url, |path| Ok(Some(path)))?
        .or_else(|| file.database.as_ref().and_then(|db| db.path.clone()))
        .unwrap_or_else(|| DEFAULT_DB_PATH.to_owned());

    let smtp_file = file.smtp.clone().unwrap_or_default();
    let smtp_host = env("SMTP_HOST").or(smtp_file.host);
    let smtp = match smtp_host {
        Some(host) => {
            let port: u16 = match env("SMTP_PORT") {
                Some(value) => value.trim().parse().map_err(|err| {
                    AppError::config(ConfigError::InvalidEnv {
                        name: "SMTP_PORT",
                        source: ValidationError::InvalidPort {
                            value: value.clone(),
                            source: err,
                        },
                    })
                })?,
                None => smtp_file.port.unwrap_or(DEFAULT_SMTP_PORT),
            };
            let username = env("SMTP_USERNAME").or(smtp_file.username);
            let password = env("SMTP_PASSWORD").or(smtp_file.password);
            let from = env("SMTP_FROM")
                .or(smtp_file.from)
                .or_else(|| username.clone())
                .unwrap_or_else(|| DEFAULT_SENDER.to_owned());
            Some(SmtpSettings {
                host,
                port,
                username,
                password,
                from,
            })
        }
        None => None,
    };

    let notify_file = file.notify.clone().unwrap_or_default();
    let notify_to = overrides
        .notify_to
        .clone()
        .or_else(|| env("NOTIFY_TO"))
        .or(notify_file.to);
    let health_emails = overrides.health_emails
        || env("NOTIFY_HEALTH_EMAILS")
            .and_then(|value| parse_bool_env(&value))
            .or(notify_file.health_emails)
            .unwrap_or(false);

    let client = resolve_client(file.client.as_ref(), overrides)?;

    Ok(Settings {
        listen,
        db_path: PathBuf::from(db_path),
        smtp,
        notify_to,
        health_emails,
        client,
    })
}

/// Accepts `sqlite://path`, `sqlite:path` or a bare path. Any other URL
/// scheme is refused; only the scheme is reported, never the credentials.
fn sqlite_path_from_url(url: &str) -> Result<String, ConfigError> {
    let trimmed = url.trim();
    if let Some(path) = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
    {
        return Ok(path.to_owned());
    }
    trimmed.split_once("://").map_or_else(
        || Ok(trimmed.to_owned()),
        |(scheme, _)| {
            Err(ConfigError::UnsupportedDatabaseUrl {
                scheme: scheme.to_owned(),
            })
        },
    )
}

fn resolve_client(
    config: Option<&ClientConfig>,
    overrides: &CliOverrides,
) -> AppResult<ClientSettings> {
    let defaults = ClientSettings::default();
    let config = config.cloned().unwrap_or_default();

    Ok(ClientSettings {
        connect_timeout: match overrides.connect_timeout {
            Some(value) => value,
            None => config_duration(
                "client.connect_timeout",
                config.connect_timeout.as_deref(),
                defaults.connect_timeout,
            )?,
        },
        tls_handshake_timeout: config_duration(
            "client.tls_handshake_timeout",
            config.tls_handshake_timeout.as_deref(),
            defaults.tls_handshake_timeout,
        )?,
        response_header_timeout: match overrides.response_header_timeout {
            Some(value) => value,
            None => config_duration(
                "client.response_header_timeout",
                config.response_header_timeout.as_deref(),
                defaults.response_header_timeout,
            )?,
        },
        request_timeout: match overrides.request_timeout {
            Some(value) => value,
            None => config_duration(
                "client.request_timeout",
                config.request_timeout.as_deref(),
                defaults.request_timeout,
            )?,
        },
        tcp_keepalive: config_duration(
            "client.tcp_keepalive",
            config.tcp_keepalive.as_deref(),
            defaults.tcp_keepalive,
        )?,
    })
}

fn config_duration(
    field: &'static str,
    value: Option<&str>,
    default: Duration,
) -> AppResult<Duration> {
    value.map_or(Ok(default), |value| {
        parse_duration_value(value)
            .map_err(|source| AppError::config(ConfigError::InvalidField { field, source }))
    })
}
