//! The resolved caller and the pure authorization checks on it.

use std::fmt;
use std::str::FromStr;

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};

use crate::auth::error::AuthError;
use crate::auth::provider::UserRecord;

/// Fixed role set. `SuperAdmin` passes every role and tenant check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    ClinicManager,
    Admin,
    Parent,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::ClinicManager => "clinic_manager",
            Self::Admin => "admin",
            Self::Parent => "parent",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Self::SuperAdmin),
            "clinic_manager" => Ok(Self::ClinicManager),
            "admin" => Ok(Self::Admin),
            "parent" => Ok(Self::Parent),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Authenticated caller, valid for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    /// Subject id issued by the identity provider.
    #[serde(skip)]
    pub identity_token: String,
    pub user_id: String,
    pub email: String,
    pub role: Role,
    pub clinic_id: Option<String>,
}

impl Principal {
    pub fn from_record(identity_token: String, record: UserRecord) -> Self {
        Self {
            identity_token,
            user_id: record.id,
            email: record.email,
            role: record.role,
            clinic_id: record.clinic_id,
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }

    pub fn authorize_roles(&self, allowed: &[Role]) -> Result<(), AuthError> {
        if self.is_super_admin() || allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AuthError::forbidden("Insufficient permissions"))
        }
    }

    /// A principal without a clinic never matches.
    pub fn authorize_clinic(&self, clinic_id: &str) -> Result<(), AuthError> {
        if self.is_super_admin() || self.clinic_id.as_deref() == Some(clinic_id) {
            Ok(())
        } else {
            Err(AuthError::forbidden("Access denied to this clinic"))
        }
    }

    pub fn authorize_owner(&self, owner_id: Option<&str>) -> Result<(), AuthError> {
        if self.is_super_admin() || owner_id == Some(self.user_id.as_str()) {
            Ok(())
        } else {
            Err(AuthError::forbidden("Access denied to this resource"))
        }
    }
}

/// Handlers behind `with_auth` receive the principal the middleware resolved.
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(AuthError::Unauthorized)
    }
}
