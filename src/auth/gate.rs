//! Identity resolution and role / tenant / ownership enforcement.
//!
//! # States (per request)
//! ```text
//! Unauthenticated → resolve token → Authenticated(principal) → check → Authorized | Forbidden
//! Unauthenticated → no token / no user record → Unauthorized
//! ```
//!
//! Every `require_*` call re-resolves the caller; nothing is cached between
//! requests. Collaborator calls are bounded by the lookup timeout, and a
//! timeout is reported as an internal error.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderMap;
use serde_json::Value;

use crate::auth::error::AuthError;
use crate::auth::principal::{Principal, Role};
use crate::auth::provider::{CollaboratorError, IdentityProvider, UserStore};

pub struct AuthGate {
    identity: Arc<dyn IdentityProvider>,
    users: Arc<dyn UserStore>,
    lookup_timeout: Duration,
}

impl AuthGate {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        users: Arc<dyn UserStore>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            identity,
            users,
            lookup_timeout,
        }
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, CollaboratorError>>,
    ) -> Result<T, AuthError> {
        match tokio::time::timeout(self.lookup_timeout, call).await {
            Ok(result) => result.map_err(|source| AuthError::Internal { operation, source }),
            Err(_) => Err(AuthError::Internal {
                operation,
                source: CollaboratorError::Timeout(self.lookup_timeout),
            }),
        }
    }

    /// Resolve the caller to a stored user.
    pub async fn require_auth(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        let subject = self
            .bounded("identity resolution", self.identity.subject(headers))
            .await?
            .ok_or(AuthError::Unauthorized)?;

        let record = self
            .bounded("user lookup", self.users.find_user_by_subject(&subject))
            .await?;

        match record {
            Some(record) => Ok(Principal::from_record(subject, record)),
            None => Err(AuthError::UserNotFound { subject }),
        }
    }

    /// Caller must hold one of `allowed` (super admins always pass).
    pub async fn require_role(
        &self,
        headers: &HeaderMap,
        allowed: &[Role],
    ) -> Result<Principal, AuthError> {
        let principal = self.require_auth(headers).await?;
        principal.authorize_roles(allowed)?;
        Ok(principal)
    }

    pub async fn require_super_admin(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        self.require_role(headers, &[Role::SuperAdmin]).await
    }

    pub async fn require_clinic_manager(
        &self,
        headers: &HeaderMap,
    ) -> Result<Principal, AuthError> {
        self.require_role(headers, &[Role::ClinicManager, Role::SuperAdmin])
            .await
    }

    pub async fn require_admin(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        self.require_role(headers, &[Role::Admin, Role::SuperAdmin])
            .await
    }

    pub async fn require_parent(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        self.require_role(headers, &[Role::Parent]).await
    }

    /// Caller must belong to `clinic_id` unless they are a super admin.
    pub async fn require_clinic_access(
        &self,
        headers: &HeaderMap,
        clinic_id: &str,
    ) -> Result<Principal, AuthError> {
        let principal = self.require_auth(headers).await?;
        principal.authorize_clinic(clinic_id)?;
        Ok(principal)
    }

    /// Caller must be the owner recorded in `owner_field` of the resource.
    pub async fn require_ownership(
        &self,
        headers: &HeaderMap,
        resource_type: &str,
        resource_id: &str,
        owner_field: &str,
    ) -> Result<Principal, AuthError> {
        let principal = self.require_auth(headers).await?;
        if principal.is_super_admin() {
            return Ok(principal);
        }

        let resource = self
            .bounded(
                "resource lookup",
                self.users.find_resource(resource_type, resource_id),
            )
            .await?
            .ok_or_else(|| AuthError::NotFound {
                resource_type: resource_type.to_string(),
                resource_id: resource_id.to_string(),
            })?;

        let owner = resource.get(owner_field).and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        principal.authorize_owner(owner.as_deref())?;
        Ok(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::memory_store::MemoryUserStore;
    use crate::auth::provider::UserRecord;
    use async_trait::async_trait;
    use axum::http::HeaderValue;

    /// Treats the `x-test-subject` header as the resolved subject.
    struct HeaderIdentity;

    #[async_trait]
    impl IdentityProvider for HeaderIdentity {
        async fn subject(&self, headers: &HeaderMap) -> Result<Option<String>, CollaboratorError> {
            Ok(headers
                .get("x-test-subject")
                .and_then(|v| v.to_str().ok())
                .map(String::from))
        }
    }

    struct FailingStore;

    #[async_trait]
    impl UserStore for FailingStore {
        async fn find_user_by_subject(
            &self,
            _subject: &str,
        ) -> Result<Option<UserRecord>, CollaboratorError> {
            Err(CollaboratorError::Unavailable("connection refused".into()))
        }

        async fn find_resource(
            &self,
            _resource_type: &str,
            _resource_id: &str,
        ) -> Result<Option<Value>, CollaboratorError> {
            Err(CollaboratorError::Unavailable("connection refused".into()))
        }
    }

    struct HangingStore;

    #[async_trait]
    impl UserStore for HangingStore {
        async fn find_user_by_subject(
            &self,
            _subject: &str,
        ) -> Result<Option<UserRecord>, CollaboratorError> {
            std::future::pending().await
        }

        async fn find_resource(
            &self,
            _resource_type: &str,
            _resource_id: &str,
        ) -> Result<Option<Value>, CollaboratorError> {
            std::future::pending().await
        }
    }

    fn user(id: &str, role: Role, clinic_id: Option<&str>) -> UserRecord {
        UserRecord {
            id: id.to_string(),
            email: format!("{id}@clinic.test"),
            role,
            clinic_id: clinic_id.map(String::from),
        }
    }

    fn gate() -> AuthGate {
        let store = MemoryUserStore::new();
        store.insert_user("sub_root", user("u_root", Role::SuperAdmin, None));
        store.insert_user("sub_mgr", user("u_mgr", Role::ClinicManager, Some("X")));
        store.insert_user("sub_parent", user("u_parent", Role::Parent, Some("X")));
        store.insert_user("sub_orphan", user("u_orphan", Role::Parent, None));
        store.insert_resource("child", "ch1", serde_json::json!({ "parent_id": "u_parent" }));
        store.insert_resource("child", "ch2", serde_json::json!({ "parent_id": "u_other" }));
        store.insert_resource("child", "ch3", serde_json::json!({ "name": "no owner" }));

        AuthGate::new(
            Arc::new(HeaderIdentity),
            Arc::new(store),
            Duration::from_secs(1),
        )
    }

    fn as_subject(subject: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-test-subject", HeaderValue::from_static(subject));
        headers
    }

    #[tokio::test]
    async fn test_require_auth_without_token() {
        let err = gate().require_auth(&HeaderMap::new()).await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
    }

    #[tokio::test]
    async fn test_require_auth_unknown_subject() {
        let err = gate().require_auth(&as_subject("sub_ghost")).await.unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound { subject } if subject == "sub_ghost"));
    }

    #[tokio::test]
    async fn test_require_auth_returns_stored_record() {
        let principal = gate().require_auth(&as_subject("sub_mgr")).await.unwrap();
        assert_eq!(principal.identity_token, "sub_mgr");
        assert_eq!(principal.user_id, "u_mgr");
        assert_eq!(principal.email, "u_mgr@clinic.test");
        assert_eq!(principal.role, Role::ClinicManager);
        assert_eq!(principal.clinic_id.as_deref(), Some("X"));
    }

    #[tokio::test]
    async fn test_role_specialisations() {
        let gate = gate();
        assert!(gate.require_super_admin(&as_subject("sub_root")).await.is_ok());
        assert!(gate.require_super_admin(&as_subject("sub_mgr")).await.is_err());

        assert!(gate.require_clinic_manager(&as_subject("sub_mgr")).await.is_ok());
        assert!(gate.require_clinic_manager(&as_subject("sub_root")).await.is_ok());
        assert!(matches!(
            gate.require_clinic_manager(&as_subject("sub_parent")).await,
            Err(AuthError::Forbidden { .. })
        ));

        assert!(gate.require_parent(&as_subject("sub_parent")).await.is_ok());
        assert!(gate.require_parent(&as_subject("sub_mgr")).await.is_err());

        assert!(gate.require_admin(&as_subject("sub_parent")).await.is_err());
    }

    #[tokio::test]
    async fn test_role_check_still_requires_auth() {
        let err = gate()
            .require_role(&HeaderMap::new(), &[Role::Parent])
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
    }

    #[tokio::test]
    async fn test_clinic_access() {
        let gate = gate();
        assert!(gate.require_clinic_access(&as_subject("sub_mgr"), "X").await.is_ok());
        assert!(matches!(
            gate.require_clinic_access(&as_subject("sub_mgr"), "Y").await,
            Err(AuthError::Forbidden { .. })
        ));
        assert!(gate.require_clinic_access(&as_subject("sub_root"), "Y").await.is_ok());
        assert!(gate.require_clinic_access(&as_subject("sub_orphan"), "X").await.is_err());
    }

    #[tokio::test]
    async fn test_ownership() {
        let gate = gate();
        let parent = as_subject("sub_parent");

        assert!(gate.require_ownership(&parent, "child", "ch1", "parent_id").await.is_ok());
        assert!(matches!(
            gate.require_ownership(&parent, "child", "ch2", "parent_id").await,
            Err(AuthError::Forbidden { .. })
        ));
        assert!(matches!(
            gate.require_ownership(&parent, "child", "ch3", "parent_id").await,
            Err(AuthError::Forbidden { .. })
        ));
        assert!(matches!(
            gate.require_ownership(&parent, "child", "missing", "parent_id").await,
            Err(AuthError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_super_admin_skips_resource_lookup() {
        let gate = gate();
        let root = as_subject("sub_root");
        assert!(gate.require_ownership(&root, "child", "missing", "parent_id").await.is_ok());
    }

    #[tokio::test]
    async fn test_numeric_owner_ids_compare_as_strings() {
        let store = MemoryUserStore::new();
        store.insert_user("sub", user("42", Role::Parent, Some("X")));
        store.insert_resource("child", "c", serde_json::json!({ "parent_id": 42 }));
        let gate = AuthGate::new(Arc::new(HeaderIdentity), Arc::new(store), Duration::from_secs(1));

        assert!(gate
            .require_ownership(&as_subject("sub"), "child", "c", "parent_id")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_store_failure_is_internal() {
        let gate = AuthGate::new(
            Arc::new(HeaderIdentity),
            Arc::new(FailingStore),
            Duration::from_secs(1),
        );
        let err = gate.require_auth(&as_subject("sub")).await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::Internal {
                operation: "user lookup",
                source: CollaboratorError::Unavailable(_)
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_store_times_out() {
        let gate = AuthGate::new(
            Arc::new(HeaderIdentity),
            Arc::new(HangingStore),
            Duration::from_millis(50),
        );
        let err = gate.require_auth(&as_subject("sub")).await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::Internal {
                source: CollaboratorError::Timeout(_),
                ..
            }
        ));
    }
}
