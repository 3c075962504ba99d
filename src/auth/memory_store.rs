//! In-process user store, seeded from config or by tests.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::auth::provider::{CollaboratorError, UserRecord, UserStore};
use crate::config::StoreConfig;

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    /// subject -> user
    users: DashMap<String, UserRecord>,
    /// (resource type, id) -> resource fields
    resources: DashMap<(String, String), serde_json::Value>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        let store = Self::new();
        for user in &config.users {
            store.insert_user(
                user.subject.clone(),
                UserRecord {
                    id: user.id.clone(),
                    email: user.email.clone(),
                    role: user.role,
                    clinic_id: user.clinic_id.clone(),
                },
            );
        }
        for resource in &config.resources {
            store.insert_resource(
                resource.kind.clone(),
                resource.id.clone(),
                serde_json::Value::Object(resource.fields.clone()),
            );
        }
        tracing::info!(
            users = store.users.len(),
            resources = store.resources.len(),
            "User store seeded"
        );
        store
    }

    pub fn insert_user(&self, subject: impl Into<String>, record: UserRecord) {
        self.users.insert(subject.into(), record);
    }

    pub fn insert_resource(
        &self,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        fields: serde_json::Value,
    ) {
        self.resources
            .insert((resource_type.into(), resource_id.into()), fields);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_user_by_subject(
        &self,
        subject: &str,
    ) -> Result<Option<UserRecord>, CollaboratorError> {
        Ok(self.users.get(subject).map(|r| r.value().clone()))
    }

    async fn find_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<Option<serde_json::Value>, CollaboratorError> {
        let key = (resource_type.to_string(), resource_id.to_string());
        Ok(self.resources.get(&key).map(|r| r.value().clone()))
    }
}
