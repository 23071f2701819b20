use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::app::RunContext;
use crate::app::pipeline::spawn_report;
use crate::app::spawn_run;
use crate::dispatch::TestSpec;
use crate::error::{ControlError, StoreError};
use crate::notify::health_report;
use crate::store::ResultStore;

use super::http::{HttpRequest, read_http_request, write_response};
use super::types::{ErrorResponse, HealthResponse, StartTestRequest, StartTestResponse};

const HEALTH_PING_TIMEOUT: Duration = Duration::from_secs(5);
/// How long a client may take to deliver a complete request.
pub(crate) const DEFAULT_REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared by every connection task.
pub struct ControlState {
    runs: Arc<RunContext>,
    store: Arc<dyn ResultStore>,
    health_emails: bool,
    read_timeout: Duration,
}

impl ControlState {
    #[must_use]
    pub fn new(runs: Arc<RunContext>, store: Arc<dyn ResultStore>, health_emails: bool) -> Self {
        Self {
            runs,
            store,
            health_emails,
            read_timeout: DEFAULT_REQUEST_READ_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }
}

#[derive(Debug)]
pub(super) struct Reply {
    pub(super) status: u16,
    pub(super) body: Vec<u8>,
}

pub(super) async fn handle_connection(
    mut socket: TcpStream,
    state: &ControlState,
) -> Result<(), ControlError> {
    let read = tokio::time::timeout(state.read_timeout, read_http_request(&mut socket)).await;
    let reply = match read {
        Err(_elapsed) => {
            debug!("Control client did not finish its request in time");
            error_reply(408, "Request timeout")?
        }
        Ok(Ok(request)) => {
            debug!("Control request: {} {}", request.method, request.path);
            match handle_request(state, &request).await {
                Ok(reply) => reply,
                Err(err) => {
                    warn!("Control handler failed: {}", err);
                    error_reply(500, "Internal server error")?
                }
            }
        }
        Ok(Err(err)) => error_reply(err.status, &err.message)?,
    };
    write_response(&mut socket, reply.status, &reply.body).await
}

pub(super) async fn handle_request(
    state: &ControlState,
    request: &HttpRequest,
) -> Result<Reply, ControlError> {
    match request.route() {
        "/start-test" => start_test(state, request),
        "/health" => health(state).await,
        _ => error_reply(404, "Not found"),
    }
}

fn start_test(state: &ControlState, request: &HttpRequest) -> Result<Reply, ControlError> {
    if request.method != "POST" {
        return error_reply(405, "Method not allowed");
    }
    let payload: StartTestRequest = match serde_json::from_slice(&request.body) {
        Ok(payload) => payload,
        Err(err) => {
            debug!("Rejected start-test body: {}", err);
            return error_reply(400, "Invalid JSON body");
        }
    };
    let spec = match TestSpec::validated(&payload.url, payload.count, payload.concurrency) {
        Ok(spec) => spec,
        Err(err) => {
            debug!("Rejected start-test parameters: {}", err);
            return error_reply(400, "Invalid parameters");
        }
    };

    drop(spawn_run(Arc::clone(&state.runs), spec));
    let message = format!(
        "Load test started for {} with {} requests at concurrency {}",
        payload.url, payload.count, payload.concurrency
    );
    json_reply(200, &StartTestResponse { message })
}

async fn health(state: &ControlState) -> Result<Reply, ControlError> {
    let db_connected = match tokio::time::timeout(HEALTH_PING_TIMEOUT, state.store.ping()).await {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            warn!("Health check: database ping failed: {}", err);
            false
        }
        Err(_) => {
            warn!("Health check: {}", StoreError::PingTimeout);
            false
        }
    };
    let checked_at = Utc::now();
    let status = if db_connected { "healthy" } else { "unhealthy" };

    if state.health_emails {
        let report = health_report(status, db_connected, checked_at);
        drop(spawn_report(Arc::clone(&state.runs), report));
    }

    let response = HealthResponse {
        status: status.to_owned(),
        db_connected,
        timestamp: checked_at.to_rfc3339_opts(SecondsFormat::Secs, true),
    };
    json_reply(if db_connected { 200 } else { 503 }, &response)
}

fn json_reply<T: Serialize>(status: u16, payload: &T) -> Result<Reply, ControlError> {
    let body = serde_json::to_vec(payload).map_err(|err| ControlError::Serialize {
        context: "control response",
        source: err,
    })?;
    Ok(Reply { status, body })
}

fn error_reply(status: u16, message: &str) -> Result<Reply, ControlError> {
    json_reply(
        status,
        &ErrorResponse {
            error: message.to_owned(),
        },
    )
}
