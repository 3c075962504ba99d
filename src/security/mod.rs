//! Request-defense subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (preflight short-circuit, refuse disallowed origins)
//!     → rate_limit.rs (per-client fixed window, 429 while blocked)
//!     → auth (resolve and authorize caller)
//!     → handler
//! ```
//!
//! # Design Decisions
//! - Neither CORS nor rate limiting ever fails; both return decisions
//! - Client identity for rate limiting comes from proxy headers (headers.rs)

pub mod cors;
pub mod headers;
pub mod rate_limit;

pub use cors::{cors_middleware, with_cors, CorsConfigError, CorsPolicy};
pub use rate_limit::{
    rate_limit_middleware, with_rate_limit, MemoryStore, RateLimitDecision, RateLimitEntry,
    RateLimitStatus, RateLimitStore, RateLimiter,
};
