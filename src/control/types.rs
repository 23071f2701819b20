use serde::{Deserialize, Serialize};

/// Body of `POST /start-test`. Missing fields read as empty/zero and are
/// rejected by validation.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct StartTestRequest {
    pub url: String,
    pub count: i64,
    pub concurrency: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct StartTestResponse {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub db_connected: bool,
    pub timestamp: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}
