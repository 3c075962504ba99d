use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    Router,
};

use crate::auth::error::handle_auth_error;
use crate::auth::gate::AuthGate;
use crate::auth::principal::Role;
use crate::http::request::RequestIdExt;

/// What `with_auth` demands of the caller.
#[derive(Clone)]
pub struct AuthLayer {
    gate: Arc<AuthGate>,
    roles: Option<Arc<[Role]>>,
}

impl AuthLayer {
    /// Any resolved user.
    pub fn authenticated(gate: Arc<AuthGate>) -> Self {
        Self { gate, roles: None }
    }

    /// A user holding one of `roles`.
    pub fn roles(gate: Arc<AuthGate>, roles: impl Into<Vec<Role>>) -> Self {
        let roles: Vec<Role> = roles.into();
        Self {
            gate,
            roles: Some(Arc::from(roles)),
        }
    }
}

/// Resolves and authorizes the caller, then hands the `Principal` to the
/// handler through request extensions.
pub async fn auth_middleware(
    State(layer): State<AuthLayer>,
    mut request: Request,
    next: Next,
) -> Response {
    let result = match &layer.roles {
        Some(roles) => layer.gate.require_role(request.headers(), roles).await,
        None => layer.gate.require_auth(request.headers()).await,
    };

    match result {
        Ok(principal) => {
            tracing::debug!(
                request_id = %request.request_id(),
                user_id = %principal.user_id,
                role = %principal.role,
                "Request authorized"
            );
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(request_id = %request.request_id(), path = %request.uri().path(), "Request denied by auth gate");
            handle_auth_error(&e)
        }
    }
}

/// Put `router` behind the auth gate.
pub fn with_auth<S>(router: Router<S>, layer: AuthLayer) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(layer, auth_middleware))
}
