//! Service routes fronted by the shield.
//!
//! The real business logic lives elsewhere; these handlers show the three
//! ways it consumes the auth gate: a principal from `with_auth`, a tenant
//! check, and an ownership check.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};

use crate::auth::{AuthError, Principal};
use crate::http::server::AppState;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn me(principal: Principal) -> Json<Principal> {
    Json(principal)
}

pub async fn clinic(
    State(state): State<AppState>,
    Path(clinic_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, AuthError> {
    let principal = state.gate.require_clinic_access(&headers, &clinic_id).await?;
    Ok(Json(json!({
        "clinic_id": clinic_id,
        "viewer": principal.user_id,
        "role": principal.role,
    })))
}

pub async fn child(
    State(state): State<AppState>,
    Path(child_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, AuthError> {
    let principal = state
        .gate
        .require_ownership(&headers, "child", &child_id, "parent_id")
        .await?;
    Ok(Json(json!({
        "child_id": child_id,
        "viewer": principal.user_id,
    })))
}
