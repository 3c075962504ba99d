use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::auth::Principal;
use crate::http::server::AppState;
use crate::security::RateLimitStatus;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub tracked_clients: usize,
}

#[derive(Serialize)]
pub struct ClearResult {
    pub client_id: String,
    pub cleared: bool,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        tracked_clients: state.rate_limiter.tracked_clients(),
    })
}

pub async fn get_rate_limit(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Json<RateLimitStatus> {
    Json(state.rate_limiter.get_status(&client_id))
}

pub async fn clear_rate_limit(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
    principal: Principal,
) -> Json<ClearResult> {
    let cleared = state.rate_limiter.clear_limit(&client_id);
    tracing::info!(
        client_id = %client_id,
        cleared,
        admin = %principal.user_id,
        "Rate limit cleared by admin"
    );
    Json(ClearResult { client_id, cleared })
}
