//! JSON control surface: `POST /start-test` and `GET /health`.
mod handlers;
mod http;
mod server;
mod types;


pub use handlers::ControlState;
pub use server::{bind, serve};
pub use types::{ErrorResponse, HealthResponse, StartTestRequest, StartTestResponse};
