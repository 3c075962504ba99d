//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Middleware denials and lifecycle events:
//!     → logging.rs (structured tracing events, request id attached)
//!     → metrics.rs (denial counters, store size gauge)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;
