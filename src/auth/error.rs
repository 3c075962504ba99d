use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::auth::provider::CollaboratorError;
use crate::http::response::{error_response, DenialKind};
use crate::observability::metrics;

/// Why an authorization check failed.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no identity token")]
    Unauthorized,

    #[error("no user record for subject '{subject}'")]
    UserNotFound { subject: String },

    #[error("forbidden: {message}")]
    Forbidden { message: String },

    #[error("{resource_type} '{resource_id}' not found")]
    NotFound {
        resource_type: String,
        resource_id: String,
    },

    #[error("{operation} failed: {source}")]
    Internal {
        operation: &'static str,
        #[source]
        source: CollaboratorError,
    },
}

impl AuthError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> DenialKind {
        match self {
            Self::Unauthorized | Self::UserNotFound { .. } => DenialKind::Unauthorized,
            Self::Forbidden { .. } => DenialKind::Forbidden,
            Self::NotFound { .. } => DenialKind::NotFound,
            Self::Internal { .. } => DenialKind::InternalError,
        }
    }

    /// Message safe to show the caller.
    fn client_message(&self) -> String {
        match self {
            Self::Unauthorized => "Authentication required".to_string(),
            Self::UserNotFound { .. } => "User not found".to_string(),
            Self::Forbidden { message } => message.clone(),
            Self::NotFound { .. } => "Resource not found".to_string(),
            Self::Internal { .. } => "Internal server error".to_string(),
        }
    }
}

/// Translate an auth failure into its HTTP response, logging it on the way.
pub fn handle_auth_error(error: &AuthError) -> Response {
    let kind = error.kind();
    match error {
        AuthError::Unauthorized => tracing::warn!("Request carried no identity token"),
        AuthError::UserNotFound { subject } => {
            tracing::warn!(subject = %subject, "Identity token resolved to no user record")
        }
        AuthError::Forbidden { message } => tracing::warn!(reason = %message, "Access forbidden"),
        AuthError::NotFound {
            resource_type,
            resource_id,
        } => tracing::warn!(%resource_type, %resource_id, "Ownership check on missing resource"),
        AuthError::Internal { .. } => tracing::error!(error = ?error, "Authorization failed internally"),
    }
    metrics::record_auth_denied(kind.code());
    error_response(kind, error.client_message())
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        handle_auth_error(&self)
    }
}
