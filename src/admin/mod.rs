pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};

use self::handlers::*;
use crate::auth::{with_auth, AuthGate, AuthLayer, Role};
use crate::http::server::AppState;

/// Admin API, reserved for super admins.
pub fn setup_admin_router(gate: Arc<AuthGate>) -> Router<AppState> {
    let router = Router::new()
        .route("/admin/status", get(get_status))
        .route(
            "/admin/rate-limits/{client_id}",
            get(get_rate_limit).delete(clear_rate_limit),
        );
    with_auth(router, AuthLayer::roles(gate, [Role::SuperAdmin]))
}
