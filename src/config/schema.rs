//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the shield.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::auth::Role;

/// Root configuration for the request shield.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ShieldConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Cross-origin policy.
    pub cors: CorsConfig,

    /// Identity resolution and authorization settings.
    pub auth: AuthConfig,

    /// Seed records for the in-memory user store.
    pub store: StoreConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Fixed-window rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Window length in milliseconds.
    pub window_ms: u64,

    /// Requests allowed per client within one window.
    pub max_requests: u32,

    /// How long a client stays blocked after exceeding the limit, in milliseconds.
    pub block_duration_ms: u64,

    /// Chance (0.0 - 1.0) that a single check also sweeps expired entries.
    pub cleanup_probability: f64,

    /// Interval of the background sweeper in seconds (0 disables it).
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_ms: 15 * 60 * 1000,
            max_requests: 100,
            block_duration_ms: 15 * 60 * 1000,
            cleanup_probability: 0.01,
            sweep_interval_secs: 0,
        }
    }
}

/// Origin allowlist and the CORS headers granted to allowed origins.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Exact origins (scheme + host + port) allowed to make cross-origin calls.
    pub allowed_origins: Vec<String>,

    /// Methods advertised in `Access-Control-Allow-Methods`.
    pub allowed_methods: Vec<String>,

    /// Request headers advertised in `Access-Control-Allow-Headers`.
    pub allowed_headers: Vec<String>,

    /// Response headers advertised in `Access-Control-Expose-Headers`.
    pub exposed_headers: Vec<String>,

    /// Emit `Access-Control-Allow-Credentials: true`.
    pub allow_credentials: bool,

    /// Preflight cache duration in seconds.
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            allowed_methods: ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allowed_headers: ["Content-Type", "Authorization", "X-Requested-With"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
            exposed_headers: [
                "X-RateLimit-Limit",
                "X-RateLimit-Remaining",
                "X-RateLimit-Reset",
            ]
            .iter()
            .map(|h| h.to_string())
            .collect(),
            allow_credentials: true,
            max_age_secs: 86_400,
        }
    }
}

/// Identity resolution settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret used to verify session tokens (HS256). Has no default;
    /// it must come from the config file or `SHIELD_SESSION_SECRET`.
    pub session_secret: String,

    /// Cookie carrying the session token when no bearer header is sent.
    pub session_cookie: String,

    /// Upper bound for a single identity or user-store lookup in milliseconds.
    pub lookup_timeout_ms: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_secret: String::new(),
            session_cookie: "__session".to_string(),
            lookup_timeout_ms: 5_000,
        }
    }
}

/// Records preloaded into the in-memory user store.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    pub users: Vec<UserSeed>,
    pub resources: Vec<ResourceSeed>,
}

/// A user known to the store, keyed by identity-provider subject.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserSeed {
    /// Subject id issued by the identity provider.
    pub subject: String,
    /// Internal record id.
    pub id: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub clinic_id: Option<String>,
}

/// An owned resource used by ownership checks.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResourceSeed {
    /// Resource type, e.g. "child".
    pub kind: String,
    pub id: String,
    /// Arbitrary fields; ownership checks read one of them.
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
