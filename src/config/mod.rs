//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ShieldConfig (validated, immutable)
//!     → merged once into RateLimiter / CorsPolicy / AuthGate at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, read_config, ConfigError};
pub use validation::{validate_config, ValidationError};
pub use schema::{
    AuthConfig, CorsConfig, ListenerConfig, LogFormat, ObservabilityConfig, RateLimitConfig,
    ResourceSeed, ShieldConfig, StoreConfig, TimeoutConfig, UserSeed,
};
