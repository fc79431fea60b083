//! Health and status endpoints

use axum::{Json, extract::State as AxumState};
use serde::Serialize;

use crate::SharedState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub name: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub started_at: String,
    pub pr_max_age: String,
    pub handlers: Vec<&'static str>,
}

/// GET / - Plain liveness string
pub async fn root(AxumState(state): AxumState<SharedState>) -> String {
    format!("{} is running", state.config.app_name)
}

/// GET /status - Server status and registered handlers
pub async fn status(AxumState(state): AxumState<SharedState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        name: state.config.app_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        started_at: state.started_at.to_rfc3339(),
        pr_max_age: state.config.pr_max_age.to_string(),
        handlers: state.registry.keys(),
    })
}
