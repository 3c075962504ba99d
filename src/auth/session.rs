//! Session-token identity provider.
//!
//! Reads an HS256 JWT from `Authorization: Bearer …`, falling back to the
//! session cookie. Expired, malformed or badly signed tokens count as no
//! identity; they never surface as errors.

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::provider::{CollaboratorError, IdentityProvider};

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (identity-provider user id)
    pub sub: String,
    /// Expiration timestamp (Unix)
    pub exp: u64,
    /// Issued at timestamp (Unix)
    #[serde(default)]
    pub iat: Option<u64>,
}

pub struct SessionTokenProvider {
    decoding_key: DecodingKey,
    validation: Validation,
    cookie_name: String,
}

impl SessionTokenProvider {
    pub fn with_hs256(secret: &[u8], cookie_name: impl Into<String>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 30; // 30 second clock skew tolerance

        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            cookie_name: cookie_name.into(),
        }
    }

    fn token<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty());

        bearer.or_else(|| {
            headers
                .get_all(header::COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .flat_map(|v| v.split(';'))
                .filter_map(|pair| pair.trim().split_once('='))
                .find(|(name, value)| *name == self.cookie_name && !value.is_empty())
                .map(|(_, value)| value)
        })
    }
}

#[async_trait]
impl IdentityProvider for SessionTokenProvider {
    async fn subject(&self, headers: &HeaderMap) -> Result<Option<String>, CollaboratorError> {
        let Some(token) = self.token(headers) else {
            return Ok(None);
        };

        match decode::<SessionClaims>(token, &self.decoding_key, &self.validation) {
            Ok(data) if !data.claims.sub.is_empty() => Ok(Some(data.claims.sub)),
            Ok(_) => Ok(None),
            Err(e) => {
                tracing::debug!(error = %e, "Session token rejected");
                Ok(None)
            }
        }
    }
}
