use std::time::Duration;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::warn;

use crate::AppState;

const PING_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connections: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle: Option<usize>,
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    match state.store.ping(PING_TIMEOUT).await {
        Ok(()) => {
            let pool = state.store.pool();
            (
                StatusCode::OK,
                Json(HealthReport {
                    status: "up",
                    message: "It's healthy".to_string(),
                    connections: Some(pool.size()),
                    idle: Some(pool.num_idle()),
                }),
            )
        }
        Err(e) => {
            warn!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthReport {
                    status: "down",
                    message: "database unavailable".to_string(),
                    connections: None,
                    idle: None,
                }),
            )
        }
    }
}
