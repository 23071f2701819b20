use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_native_tls::{TlsStream, native_tls};
use tracing::debug;

use crate::config::SmtpSettings;
use crate::error::MailError;

use super::Notifier;

/// Upper bound for each SMTP round trip.
const SMTP_STEP_TIMEOUT: Duration = Duration::from_secs(30);
const HELLO_NAME: &str = "loadtester.localdomain";

/// SMTP submission: upgrades with STARTTLS whenever the server offers it and
/// only sends AUTH PLAIN over TLS or to a loopback relay.
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    settings: SmtpSettings,
}

struct Envelope<'msg> {
    to: &'msg str,
    subject: &'msg str,
    body: &'msg str,
}

impl SmtpMailer {
    #[must_use]
    pub const fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub const fn settings(&self) -> &SmtpSettings {
        &self.settings
    }

    async fn start_tls(&self, stream: TcpStream) -> Result<TlsStream<TcpStream>, MailError> {
        let tls_error = |source| MailError::Tls {
            host: self.settings.host.clone(),
            source,
        };
        let connector = native_tls::TlsConnector::new().map_err(tls_error)?;
        let connector = tokio_native_tls::TlsConnector::from(connector);
        timeout(
            SMTP_STEP_TIMEOUT,
            connector.connect(&self.settings.host, stream),
        )
        .await
        .map_err(|_elapsed| MailError::Timeout {
            context: "TLS handshake",
        })?
        .map_err(tls_error)
    }

    async fn transact<S>(
        &self,
        session: &mut SmtpSession<S>,
        capabilities: &Capabilities,
        encrypted: bool,
        envelope: &Envelope<'_>,
    ) -> Result<(), MailError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        if let (Some(username), Some(password)) = (
            self.settings.username.as_deref(),
            self.settings.password.as_deref(),
        ) {
            if !capabilities.supports("AUTH") {
                return Err(MailError::AuthUnsupported);
            }
            if !plain_auth_permitted(&self.settings.host, encrypted) {
                return Err(MailError::InsecureAuth {
                    host: self.settings.host.clone(),
                });
            }
            let token = STANDARD.encode(format!("\0{}\0{}", username, password));
            session
                .command(&format!("AUTH PLAIN {}", token), 235, "AUTH")
                .await?;
        }
        session
            .command(
                &format!("MAIL FROM:<{}>", self.settings.from),
                250,
                "MAIL FROM",
            )
            .await?;
        session
            .command(&format!("RCPT TO:<{}>", envelope.to), 250, "RCPT TO")
            .await?;
        session.command("DATA", 354, "DATA").await?;
        let message = build_message(
            &self.settings.from,
            envelope.to,
            envelope.subject,
            envelope.body,
        );
        session.write(&message, "message").await?;
        session.expect(250, "message").await?;
        session.command("QUIT", 221, "QUIT").await
    }
}

#[async_trait]
impl Notifier for SmtpMailer {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        reject_line_breaks("To", to)?;
        reject_line_breaks("Subject", subject)?;
        reject_line_breaks("From", &self.settings.from)?;
        let envelope = Envelope { to, subject, body };

        let addr = format!("{}:{}", self.settings.host, self.settings.port);
        let stream = timeout(SMTP_STEP_TIMEOUT, TcpStream::connect(&addr))
            .await
            .map_err(|_elapsed| MailError::Timeout { context: "connect" })?
            .map_err(|source| MailError::Connect {
                addr: addr.clone(),
                source,
            })?;
        let mut session = SmtpSession::new(stream);
        session.expect(220, "greeting").await?;
        let capabilities = session.hello().await?;

        if capabilities.supports("STARTTLS") {
            session.command("STARTTLS", 220, "STARTTLS").await?;
            let tls_stream = self.start_tls(session.into_inner()).await?;
            let mut secure = SmtpSession::new(tls_stream);
            // Capabilities announced before the upgrade are discarded.
            let secure_capabilities = secure.hello().await?;
            self.transact(&mut secure, &secure_capabilities, true, &envelope)
                .await?;
        } else {
            self.transact(&mut session, &capabilities, false, &envelope)
                .await?;
        }

        debug!("Delivered '{}' to {} via {}", subject, to, addr);
        Ok(())
    }
}

/// AUTH PLAIN sends the password as base64; allow it only when encrypted or
/// when the relay is on the loopback interface.
pub(super) fn plain_auth_permitted(host: &str, encrypted: bool) -> bool {
    encrypted || matches!(host, "localhost" | "127.0.0.1" | "::1")
}

/// Extension keywords from an EHLO reply.
#[derive(Debug, Default)]
pub(super) struct Capabilities {
    keywords: Vec<String>,
}

impl Capabilities {
    pub(super) fn from_reply(lines: &[String]) -> Self {
        // The first line names the server; extensions follow.
        let keywords = lines
            .iter()
            .skip(1)
            .filter_map(|line| line.split_whitespace().next())
            .map(str::to_ascii_uppercase)
            .collect();
        Self { keywords }
    }

    pub(super) fn supports(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|known| known == keyword)
    }
}

struct SmtpSession<S> {
    stream: BufReader<S>,
}

impl<S> SmtpSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
        }
    }

    fn into_inner(self) -> S {
        self.stream.into_inner()
    }

    async fn hello(&mut self) -> Result<Capabilities, MailError> {
        self.write(&format!("EHLO {}\r\n", HELLO_NAME), "EHLO")
            .await?;
        let lines = self.reply(250, "EHLO").await?;
        Ok(Capabilities::from_reply(&lines))
    }

    async fn command(
        &mut self,
        line: &str,
        expected: u16,
        context: &'static str,
    ) -> Result<(), MailError> {
        self.write(&format!("{}\r\n", line), context).await?;
        self.expect(expected, context).await
    }

    async fn write(&mut self, data: &str, context: &'static str) -> Result<(), MailError> {
        let sent = async {
            self.stream.write_all(data.as_bytes()).await?;
            self.stream.flush().await
        };
        timeout(SMTP_STEP_TIMEOUT, sent)
            .await
            .map_err(|_elapsed| MailError::Timeout { context })?
            .map_err(|source| MailError::Io { context, source })
    }

    async fn expect(&mut self, expected: u16, context: &'static str) -> Result<(), MailError> {
        self.reply(expected, context).await?;
        Ok(())
    }

    async fn reply(
        &mut self,
        expected: u16,
        context: &'static str,
    ) -> Result<Vec<String>, MailError> {
        let (code, lines) = self.read_reply(context).await?;
        if code == expected {
            Ok(lines)
        } else {
            Err(MailError::UnexpectedReply {
                context,
                expected,
                code,
                message: lines.join(" "),
            })
        }
    }

    /// Reads one possibly multi-line reply (`250-...` continuations).
    async fn read_reply(&mut self, context: &'static str) -> Result<(u16, Vec<String>), MailError> {
        let mut lines = Vec::new();
        loop {
            let mut line = String::new();
            let read = timeout(SMTP_STEP_TIMEOUT, self.stream.read_line(&mut line))
                .await
                .map_err(|_elapsed| MailError::Timeout { context })?
                .map_err(|source| MailError::Io { context, source })?;
            if read == 0 {
                return Err(MailError::ConnectionClosed { context });
            }
            let line = line.trim_end_matches(['\r', '\n']);
            let code = line
                .get(..3)
                .and_then(|digits| digits.parse::<u16>().ok())
                .ok_or_else(|| MailError::MalformedReply {
                    context,
                    line: line.to_owned(),
                })?;
            let separator = line.get(3..4).unwrap_or(" ");
            lines.push(line.get(4..).unwrap_or_default().to_owned());
            if separator != "-" {
                return Ok((code, lines));
            }
        }
    }
}

fn reject_line_breaks(name: &'static str, value: &str) -> Result<(), MailError> {
    if value.contains(['\r', '\n']) {
        return Err(MailError::HeaderInjection { name });
    }
    Ok(())
}

/// Renders headers and a dot-stuffed CRLF body terminated by `.`.
pub(super) fn build_message(from: &str, to: &str, subject: &str, body: &str) -> String {
    let mut message = String::with_capacity(body.len().saturating_add(256));
    let headers = [
        ("From", from.to_owned()),
        ("To", to.to_owned()),
        ("Subject", subject.to_owned()),
        ("Date", Utc::now().to_rfc2822()),
        ("MIME-Version", "1.0".to_owned()),
        ("Content-Type", "text/plain; charset=\"utf-8\"".to_owned()),
    ];
    for (name, value) in headers {
        message.push_str(name);
        message.push_str(": ");
        message.push_str(&value);
        message.push_str("\r\n");
    }
    message.push_str("\r\n");
    for line in body.lines() {
        if line.starts_with('.') {
            message.push('.');
        }
        message.push_str(line);
        message.push_str("\r\n");
    }
    message.push_str(".\r\n");
    message
}
