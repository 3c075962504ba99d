//! Request-defense middleware for multi-tenant web services.
//!
//! Three layers sit in front of business logic: an origin-allowlist CORS
//! policy, a fixed-window rate limiter with cooldown blocks, and an auth gate
//! enforcing role, clinic (tenant) and ownership rules.

pub mod admin;
pub mod auth;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use auth::{AuthGate, AuthLayer, Principal, Role};
pub use config::ShieldConfig;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
pub use security::{CorsPolicy, RateLimiter};
