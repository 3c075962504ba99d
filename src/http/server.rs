//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the Axum router with the service routes and admin API
//! - Stack the request-defense middleware (CORS → rate limit → auth)
//! - Wire up request ids, tracing and the request timeout
//! - Run the rate-limit sweeper alongside the server
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::setup_admin_router;
use crate::auth::{with_auth, AuthGate, AuthLayer};
use crate::config::ShieldConfig;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::routes;
use crate::lifecycle::{build_state, StartupError};
use crate::security::{with_cors, with_rate_limit, CorsPolicy, RateLimiter};

/// Shared request-defense components, injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub cors: Arc<CorsPolicy>,
    pub rate_limiter: Arc<RateLimiter>,
    pub gate: Arc<AuthGate>,
}

pub struct HttpServer {
    router: Router,
    config: ShieldConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a server with the built-in collaborators.
    pub fn new(config: ShieldConfig) -> Result<Self, StartupError> {
        let state = build_state(&config)?;
        Ok(Self::with_state(config, state))
    }

    /// Create a server around externally built components.
    pub fn with_state(config: ShieldConfig, state: AppState) -> Self {
        let router = Self::build_router(&config, state.clone());
        Self {
            router,
            config,
            state,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ShieldConfig, state: AppState) -> Router {
        let authenticated = with_auth(
            Router::new().route("/api/me", get(routes::me)),
            AuthLayer::authenticated(state.gate.clone()),
        );

        // these handlers call the gate themselves with path parameters
        let scoped = Router::new()
            .route("/api/clinics/{clinic_id}", get(routes::clinic))
            .route("/api/children/{child_id}", get(routes::child));

        let app = Router::new()
            .route("/health", get(routes::health))
            .merge(authenticated)
            .merge(scoped)
            .merge(setup_admin_router(state.gate.clone()))
            .with_state(state.clone());

        let app = with_rate_limit(app, state.rate_limiter.clone());
        let app = with_cors(app, state.cors.clone());

        app.layer(
            ServiceBuilder::new()
                .layer(set_request_id_layer())
                .layer(TraceLayer::new_for_http())
                .layer(propagate_request_id_layer())
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.timeouts.request_secs,
                ))),
        )
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn config(&self) -> &ShieldConfig {
        &self.config
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweep_secs = self.config.rate_limit.sweep_interval_secs;
        if sweep_secs > 0 {
            let limiter = self.state.rate_limiter.clone();
            let sweeper_shutdown = shutdown.resubscribe();
            tokio::spawn(async move {
                limiter
                    .run_sweeper(Duration::from_secs(sweep_secs), sweeper_shutdown)
                    .await;
            });
        }

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
