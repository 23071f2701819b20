use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, Take,
};

use crate::error::ControlError;

/// Cap on the whole request, head and body together.
pub(super) const MAX_REQUEST_BYTES: usize = 1024 * 1024;

#[derive(Debug)]
pub(super) struct HttpRequest {
    pub(super) method: String,
    pub(super) path: String,
    pub(super) body: Vec<u8>,
}

impl HttpRequest {
    /// Path without the query string.
    pub(super) fn route(&self) -> &str {
        self.path
            .split_once('?')
            .map_or(self.path.as_str(), |(route, _)| route)
    }
}

/// A request that could not be parsed, with the status to answer it with.
#[derive(Debug)]
pub(super) struct RequestError {
    pub(super) status: u16,
    pub(super) message: String,
}

impl RequestError {
    fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

type LimitedReader<S> = BufReader<Take<S>>;

/// Reads the request line, the headers (only `Content-Length` is kept) and
/// exactly `Content-Length` body bytes.
pub(super) async fn read_http_request<S>(stream: S) -> Result<HttpRequest, RequestError>
where
    S: AsyncRead + Unpin,
{
    let limit = u64::try_from(MAX_REQUEST_BYTES)
        .unwrap_or(u64::MAX)
        .saturating_add(1);
    let mut reader = BufReader::new(stream.take(limit));
    let mut line = String::new();

    read_head_line(&mut reader, &mut line).await?;
    let mut parts = line.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| RequestError::new(400, "Missing HTTP method"))?
        .to_ascii_uppercase();
    let path = parts
        .next()
        .ok_or_else(|| RequestError::new(400, "Missing request path"))?
        .to_owned();

    let mut content_length: usize = 0;
    loop {
        read_head_line(&mut reader, &mut line).await?;
        if line.is_empty() {
            break;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| RequestError::new(400, "Malformed header"))?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            content_length = value.trim().parse().map_err(|err| {
                RequestError::new(400, format!("Invalid Content-Length: {}", err))
            })?;
        }
    }
    if content_length > MAX_REQUEST_BYTES {
        return Err(RequestError::new(413, "Request body too large"));
    }

    let mut body = vec![0u8; content_length];
    let filled = reader.read_exact(&mut body).await;
    if filled.is_err() {
        return Err(incomplete(&reader, "Incomplete request body"));
    }

    Ok(HttpRequest { method, path, body })
}

/// Reads one CRLF-terminated head line into `line`, without the terminator.
async fn read_head_line<S>(
    reader: &mut LimitedReader<S>,
    line: &mut String,
) -> Result<(), RequestError>
where
    S: AsyncRead + Unpin,
{
    line.clear();
    reader
        .read_line(line)
        .await
        .map_err(|err| RequestError::new(400, format!("Failed to read request: {}", err)))?;
    if !line.ends_with('\n') {
        return Err(incomplete(reader, "Incomplete request headers"));
    }
    let content_len = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(content_len);
    Ok(())
}

/// The stream ended early: either the size cap cut it off or the client did.
fn incomplete<S>(reader: &LimitedReader<S>, message: &str) -> RequestError
where
    S: AsyncRead,
{
    if reader.get_ref().limit() == 0 {
        RequestError::new(413, "Request too large")
    } else {
        RequestError::new(400, message)
    }
}

pub(super) const fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "OK",
    }
}

pub(super) async fn write_response<S>(
    socket: &mut S,
    status: u16,
    body: &[u8],
) -> Result<(), ControlError>
where
    S: AsyncWrite + Unpin,
{
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        status_text(status),
        body.len()
    );
    socket
        .write_all(head.as_bytes())
        .await
        .map_err(|err| ControlError::Write {
            context: "response head",
            source: err,
        })?;
    socket.write_all(body).await.map_err(|err| ControlError::Write {
        context: "response body",
        source: err,
    })?;
    drop(socket.shutdown().await);
    Ok(())
}
