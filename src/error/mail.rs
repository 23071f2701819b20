use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Failed to connect to SMTP server {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("SMTP I/O error during {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("SMTP {context} timed out.")]
    Timeout { context: &'static str },
    #[error("SMTP connection closed during {context}.")]
    ConnectionClosed { context: &'static str },
    #[error("Malformed SMTP reply during {context}: '{line}'")]
    MalformedReply { context: &'static str, line: String },
    #[error("Unexpected SMTP reply during {context}: expected {expected}, got {code} {message}")]
    UnexpectedReply {
        context: &'static str,
        expected: u16,
        code: u16,
        message: String,
    },
    #[error("TLS upgrade with SMTP server {host} failed: {source}")]
    Tls {
        host: String,
        #[source]
        source: tokio_native_tls::native_tls::Error,
    },
    #[error("Refusing to send SMTP credentials to {host} over an unencrypted connection.")]
    InsecureAuth { host: String },
    #[error("SMTP server does not support AUTH.")]
    AuthUnsupported,
    #[error("Header '{name}' contains a line break.")]
    HeaderInjection { name: &'static str },
}
