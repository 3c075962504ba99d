//! Startup orchestration.
//!
//! Builds the three request-defense components from a validated config, in
//! dependency order. Any failure here is fatal.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::auth::{AuthGate, MemoryUserStore, SessionTokenProvider};
use crate::config::ShieldConfig;
use crate::http::server::AppState;
use crate::security::{CorsConfigError, CorsPolicy, RateLimiter};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid CORS configuration: {0}")]
    Cors(#[from] CorsConfigError),

    #[error("auth.session_secret is not set")]
    MissingSessionSecret,
}

/// Assemble shared state with the built-in collaborators: session-token
/// identity and the config-seeded user store.
pub fn build_state(config: &ShieldConfig) -> Result<AppState, StartupError> {
    // an empty HMAC key verifies tokens anyone can sign
    if config.auth.session_secret.trim().is_empty() {
        return Err(StartupError::MissingSessionSecret);
    }

    let cors = Arc::new(CorsPolicy::new(&config.cors)?);
    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));

    let identity = Arc::new(SessionTokenProvider::with_hs256(
        config.auth.session_secret.as_bytes(),
        config.auth.session_cookie.clone(),
    ));
    let users = Arc::new(MemoryUserStore::from_config(&config.store));
    let gate = Arc::new(AuthGate::new(
        identity,
        users,
        Duration::from_millis(config.auth.lookup_timeout_ms),
    ));

    tracing::info!(
        allowed_origins = config.cors.allowed_origins.len(),
        rate_limit_enabled = config.rate_limit.enabled,
        max_requests = config.rate_limit.max_requests,
        window_ms = config.rate_limit.window_ms,
        "Request shield initialized"
    );

    Ok(AppState {
        cors,
        rate_limiter,
        gate,
    })
}
