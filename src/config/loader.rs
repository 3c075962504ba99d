//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ShieldConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ShieldConfig, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Read a TOML file without validating it, so overrides can be applied first.
pub fn read_config(path: &Path) -> Result<ShieldConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ShieldConfig, ConfigError> {
    let config: ShieldConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use std::io::Write;

    #[test]
    fn test_load_minimal_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[listener]\nbind_address = \"127.0.0.1:9000\"\n[auth]\nsession_secret = \"s3cr3t-for-tests\""
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window_ms, 900_000);
        assert_eq!(config.cors.max_age_secs, 86_400);
    }

    #[test]
    fn test_parse_store_seeds() {
        let config = parse_config(
            r#"
            [auth]
            session_secret = "s3cr3t-for-tests"

            [[store.users]]
            subject = "sub_1"
            id = "u1"
            email = "manager@clinic.test"
            role = "clinic_manager"
            clinic_id = "c1"

            [[store.resources]]
            kind = "child"
            id = "child_1"
            fields = { parent_id = "u2", name = "Ada" }
            "#,
        )
        .unwrap();

        assert_eq!(config.store.users.len(), 1);
        assert_eq!(config.store.users[0].role, Role::ClinicManager);
        assert_eq!(config.store.users[0].clinic_id.as_deref(), Some("c1"));
        assert_eq!(
            config.store.resources[0].fields.get("parent_id"),
            Some(&serde_json::Value::String("u2".into()))
        );
    }

    #[test]
    fn test_invalid_values_collect_every_error() {
        let err = parse_config(
            r#"
            [auth]
            session_secret = "s3cr3t-for-tests"

            [rate_limit]
            window_ms = 0
            max_requests = 0
            "#,
        )
        .unwrap_err();

        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_seeded_admin_without_secret_is_rejected() {
        let err = parse_config(
            r#"
            [[store.users]]
            subject = "ops"
            id = "u_ops"
            email = "ops@clinic.test"
            role = "super_admin"
            "#,
        )
        .unwrap_err();

        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "auth.session_secret");
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_read_config_skips_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[rate_limit]\nmax_requests = 7").unwrap();

        let config = read_config(file.path()).unwrap();
        assert_eq!(config.rate_limit.max_requests, 7);
        assert!(config.auth.session_secret.is_empty());
        assert!(matches!(
            load_config(file.path()).unwrap_err(),
            ConfigError::Validation(_)
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/shield.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
