use std::time::Duration;

use reqwest::Client;

use crate::args::DEFAULT_USER_AGENT;
use crate::error::HttpError;

pub(crate) const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub(crate) const DEFAULT_TLS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
pub(crate) const DEFAULT_RESPONSE_HEADER_TIMEOUT: Duration = Duration::from_secs(10);
pub(crate) const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
pub(crate) const DEFAULT_TCP_KEEPALIVE: Duration = Duration::from_secs(30);

/// Per-request latency bounds for the shared client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientSettings {
    pub connect_timeout: Duration,
    pub tls_handshake_timeout: Duration,
    pub response_header_timeout: Duration,
    pub request_timeout: Duration,
    pub tcp_keepalive: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            tls_handshake_timeout: DEFAULT_TLS_HANDSHAKE_TIMEOUT,
            response_header_timeout: DEFAULT_RESPONSE_HEADER_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            tcp_keepalive: DEFAULT_TCP_KEEPALIVE,
        }
    }
}

impl ClientSettings {
    /// reqwest applies its connect timeout to the whole connector, TLS
    /// handshake included.
    #[must_use]
    pub const fn connector_timeout(&self) -> Duration {
        self.connect_timeout.saturating_add(self.tls_handshake_timeout)
    }
}

pub(super) fn build_client(settings: &ClientSettings) -> Result<Client, HttpError> {
    Client::builder()
        .user_agent(DEFAULT_USER_AGENT)
        .connect_timeout(settings.connector_timeout())
        .timeout(settings.request_timeout)
        .tcp_keepalive(settings.tcp_keepalive)
        .pool_idle_timeout(Some(settings.tcp_keepalive))
        .build()
        .map_err(|source| HttpError::BuildClientFailed { source })
}
