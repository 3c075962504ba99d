//! Configuration validation.
//!
//! Serde handles syntactic checks; this module checks value ranges and the
//! header material the CORS policy will render. All failures are returned,
//! not just the first.

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use axum::http::{HeaderName, HeaderValue, Method};

use crate::config::schema::ShieldConfig;

/// Well-known secrets that are never accepted.
const PLACEHOLDER_SECRETS: &[&str] = &["CHANGE_ME_IN_PRODUCTION", "changeme", "secret"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ShieldConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }

    let rl = &config.rate_limit;
    if rl.window_ms == 0 {
        errors.push(ValidationError::new("rate_limit.window_ms", "must be > 0"));
    }
    if rl.max_requests == 0 {
        errors.push(ValidationError::new("rate_limit.max_requests", "must be > 0"));
    }
    if !(0.0..=1.0).contains(&rl.cleanup_probability) {
        errors.push(ValidationError::new(
            "rate_limit.cleanup_probability",
            "must be between 0.0 and 1.0",
        ));
    }

    let cors = &config.cors;
    for origin in &cors.allowed_origins {
        if origin == "*" {
            errors.push(ValidationError::new(
                "cors.allowed_origins",
                "wildcard origins are not supported; list exact origins",
            ));
        } else if HeaderValue::from_str(origin).is_err() {
            errors.push(ValidationError::new(
                "cors.allowed_origins",
                format!("'{origin}' is not a valid header value"),
            ));
        }
    }
    for method in &cors.allowed_methods {
        if method.parse::<Method>().is_err() {
            errors.push(ValidationError::new(
                "cors.allowed_methods",
                format!("'{method}' is not an HTTP method"),
            ));
        }
    }
    for (field, names) in [
        ("cors.allowed_headers", &cors.allowed_headers),
        ("cors.exposed_headers", &cors.exposed_headers),
    ] {
        for name in names {
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                errors.push(ValidationError::new(
                    field,
                    format!("'{name}' is not a valid header name"),
                ));
            }
        }
    }

    let secret = config.auth.session_secret.trim();
    if secret.is_empty() {
        errors.push(ValidationError::new("auth.session_secret", "must be set"));
    } else if PLACEHOLDER_SECRETS
        .iter()
        .any(|placeholder| secret.eq_ignore_ascii_case(placeholder))
    {
        errors.push(ValidationError::new(
            "auth.session_secret",
            "must not be a placeholder value",
        ));
    }
    if config.auth.lookup_timeout_ms == 0 {
        errors.push(ValidationError::new("auth.lookup_timeout_ms", "must be > 0"));
    }

    let mut subjects = HashSet::new();
    for user in &config.store.users {
        if !subjects.insert(user.subject.as_str()) {
            errors.push(ValidationError::new(
                "store.users",
                format!("duplicate subject '{}'", user.subject),
            ));
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
