//! Collaborators the gate depends on: who is calling, and what the store
//! knows about them.
//!
//! Implementations own their connections. Anything acquired for a lookup must
//! be released when the returned future completes or is dropped, so nothing
//! outlives a single call.

use std::time::Duration;

use async_trait::async_trait;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::principal::Role;

/// Failure of an external collaborator.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A user as stored by the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub clinic_id: Option<String>,
}

/// Resolves the caller's subject id from the request.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` when the request carries no usable identity.
    async fn subject(&self, headers: &HeaderMap) -> Result<Option<String>, CollaboratorError>;
}

/// Read access to users and owned resources.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_subject(
        &self,
        subject: &str,
    ) -> Result<Option<UserRecord>, CollaboratorError>;

    /// Fetch a resource as a JSON object so any owner field can be read.
    async fn find_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<Option<serde_json::Value>, CollaboratorError>;
}
