//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{encode, EncodingKey, Header};
use request_shield::auth::{Role, SessionClaims};
use request_shield::config::{ResourceSeed, ShieldConfig, UserSeed};
use request_shield::{HttpServer, Shutdown};
use tokio::net::TcpListener;

pub const SECRET: &str = "integration-test-secret";
pub const ORIGIN: &str = "https://a.com";

/// A running shield bound to an ephemeral port.
pub struct TestShield {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestShield {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestShield {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Config with one clinic manager per clinic, two parents, a super admin and
/// one child owned by the first parent.
pub fn test_config() -> ShieldConfig {
    let mut config = ShieldConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.cors.allowed_origins = vec![ORIGIN.to_string()];
    config.auth.session_secret = SECRET.to_string();
    config.rate_limit.cleanup_probability = 0.0;

    let user = |subject: &str, id: &str, role: Role, clinic: Option<&str>| UserSeed {
        subject: subject.to_string(),
        id: id.to_string(),
        email: format!("{id}@example.com"),
        role,
        clinic_id: clinic.map(str::to_string),
    };
    config.store.users = vec![
        user("sub_root", "u_root", Role::SuperAdmin, None),
        user("sub_mgr_x", "u_mgr_x", Role::ClinicManager, Some("X")),
        user("sub_admin_x", "u_admin_x", Role::Admin, Some("X")),
        user("sub_parent_1", "u_parent_1", Role::Parent, Some("X")),
        user("sub_parent_2", "u_parent_2", Role::Parent, Some("X")),
    ];

    let mut fields = serde_json::Map::new();
    fields.insert("parent_id".to_string(), "u_parent_1".into());
    fields.insert("name".to_string(), "Sam".into());
    config.store.resources = vec![ResourceSeed {
        kind: "child".to_string(),
        id: "c1".to_string(),
        fields,
    }];
    config
}

pub async fn start_shield(config: ShieldConfig) -> TestShield {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestShield { addr, shutdown }
}

/// Mint a session token for `subject`, valid for an hour.
pub fn token(subject: &str) -> String {
    token_signed_with(subject, SECRET)
}

pub fn token_signed_with(subject: &str, secret: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let claims = SessionClaims {
        sub: subject.to_string(),
        exp: now + 3600,
        iat: Some(now),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
