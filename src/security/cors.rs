//! Origin-allowlist CORS policy.
//!
//! Origins are compared by exact, case-sensitive string equality: no
//! trailing-slash, case, scheme or port normalization. An allowed origin is
//! reflected literally, never answered with `*`, so credentialed requests work.
//!
//! A request without `Origin` is same-origin and passes untouched. A
//! disallowed origin gets no CORS headers; non-preflight requests from it are
//! also refused with 403 before reaching the handler.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use thiserror::Error;

use crate::config::CorsConfig;
use crate::http::request::RequestIdExt;
use crate::http::response::{error_response, DenialKind};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum CorsConfigError {
    #[error("invalid origin '{0}'")]
    Origin(String),

    #[error("invalid method '{0}'")]
    Method(String),

    #[error("invalid header name '{0}'")]
    HeaderName(String),

    #[error("wildcard origin cannot be combined with credentials")]
    WildcardWithCredentials,
}

/// Compiled CORS policy. Header values are rendered once at construction.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_origins: HashSet<String>,
    allow_credentials: bool,
    allow_methods: HeaderValue,
    allow_headers: Option<HeaderValue>,
    expose_headers: Option<HeaderValue>,
    max_age: HeaderValue,
}

impl CorsPolicy {
    pub fn new(config: &CorsConfig) -> Result<Self, CorsConfigError> {
        for origin in &config.allowed_origins {
            if origin == "*" && config.allow_credentials {
                return Err(CorsConfigError::WildcardWithCredentials);
            }
            HeaderValue::from_str(origin).map_err(|_| CorsConfigError::Origin(origin.clone()))?;
        }

        let methods = config
            .allowed_methods
            .iter()
            .map(|m| {
                m.parse::<Method>()
                    .map(|m| m.to_string())
                    .map_err(|_| CorsConfigError::Method(m.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            allowed_origins: config.allowed_origins.iter().cloned().collect(),
            allow_credentials: config.allow_credentials,
            allow_methods: join_value(&methods)?,
            allow_headers: header_list(&config.allowed_headers)?,
            expose_headers: header_list(&config.exposed_headers)?,
            max_age: HeaderValue::from(config.max_age_secs),
        })
    }

    /// Headers granting (or silently withholding) cross-origin access.
    pub fn resolve_headers(&self, request_headers: &HeaderMap) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let Some(origin) = request_headers.get(header::ORIGIN) else {
            return headers;
        };

        if !self.origin_allowed(origin) {
            tracing::warn!(
                request_id = %request_headers.request_id(),
                origin = ?origin,
                "Rejected cross-origin request"
            );
            return headers;
        }

        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        if self.allow_credentials {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        if let Some(value) = &self.allow_headers {
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, value.clone());
        }
        if let Some(value) = &self.expose_headers {
            headers.insert(header::ACCESS_CONTROL_EXPOSE_HEADERS, value.clone());
        }
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, self.max_age.clone());
        headers
    }

    /// 204 answer to an `OPTIONS` preflight. A disallowed origin still gets
    /// the 204, without grants, and counts as a rejection.
    pub fn handle_preflight(&self, request_headers: &HeaderMap) -> Response {
        if !self.is_allowed_origin(request_headers) {
            metrics::record_cors_rejected();
        }
        let mut response = StatusCode::NO_CONTENT.into_response();
        merge_headers(response.headers_mut(), self.resolve_headers(request_headers));
        response
    }

    /// True for same-origin requests and allowlisted origins.
    pub fn is_allowed_origin(&self, request_headers: &HeaderMap) -> bool {
        request_headers
            .get(header::ORIGIN)
            .is_none_or(|origin| self.origin_allowed(origin))
    }

    fn origin_allowed(&self, origin: &HeaderValue) -> bool {
        origin
            .to_str()
            .is_ok_and(|origin| self.allowed_origins.contains(origin))
    }
}

fn join_value(items: &[String]) -> Result<HeaderValue, CorsConfigError> {
    let joined = items.join(", ");
    HeaderValue::from_str(&joined).map_err(|_| CorsConfigError::HeaderName(joined))
}

fn header_list(names: &[String]) -> Result<Option<HeaderValue>, CorsConfigError> {
    if names.is_empty() {
        return Ok(None);
    }
    for name in names {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| CorsConfigError::HeaderName(name.clone()))?;
    }
    join_value(names).map(Some)
}

fn merge_headers(target: &mut HeaderMap, source: HeaderMap) {
    let reflected = source.contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN);
    for (name, value) in source.iter() {
        target.insert(name.clone(), value.clone());
    }
    if reflected {
        target.append(header::VARY, HeaderValue::from_static("Origin"));
    }
}

/// Middleware enforcing the policy in front of a handler.
pub async fn cors_middleware(
    State(policy): State<Arc<CorsPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        return policy.handle_preflight(request.headers());
    }

    if !policy.is_allowed_origin(request.headers()) {
        tracing::warn!(
            request_id = %request.request_id(),
            origin = ?request.headers().get(header::ORIGIN),
            method = %request.method(),
            path = %request.uri().path(),
            "Cross-origin request refused"
        );
        metrics::record_cors_rejected();
        return error_response(DenialKind::CorsRejected, "Origin not allowed");
    }

    let cors_headers = policy.resolve_headers(request.headers());
    let mut response = next.run(request).await;
    merge_headers(response.headers_mut(), cors_headers);
    response
}

/// Put `router` behind the CORS policy.
pub fn with_cors<S>(router: Router<S>, policy: Arc<CorsPolicy>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(policy, cors_middleware))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::metrics::testing::CaptureRecorder;

    fn policy(origins: &[&str]) -> CorsPolicy {
        CorsPolicy::new(&CorsConfig {
            allowed_origins: origins.iter().map(|o| o.to_string()).collect(),
            ..CorsConfig::default()
        })
        .unwrap()
    }

    fn with_origin(origin: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, HeaderValue::from_static(origin));
        headers
    }

    #[test]
    fn test_allowed_origin_is_reflected() {
        let policy = policy(&["https://a.com"]);
        let headers = policy.resolve_headers(&with_origin("https://a.com"));

        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://a.com");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_METHODS],
            "GET, POST, PUT, PATCH, DELETE, OPTIONS"
        );
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
            "Content-Type, Authorization, X-Requested-With"
        );
        assert_eq!(
            headers[header::ACCESS_CONTROL_EXPOSE_HEADERS],
            "X-RateLimit-Limit, X-RateLimit-Remaining, X-RateLimit-Reset"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "86400");
    }

    #[test]
    fn test_near_miss_origins_get_nothing() {
        let policy = policy(&["https://a.com"]);
        for origin in [
            "https://A.com",
            "http://a.com",
            "https://a.com:8443",
            "https://app.a.com",
            "https://a.com/",
        ] {
            let headers = policy.resolve_headers(&with_origin(origin));
            assert!(headers.is_empty(), "{origin} should not be allowed");
            assert!(!policy.is_allowed_origin(&with_origin(origin)));
        }
    }

    #[test]
    fn test_missing_origin_is_same_origin() {
        let policy = policy(&["https://a.com"]);
        assert!(policy.resolve_headers(&HeaderMap::new()).is_empty());
        assert!(policy.is_allowed_origin(&HeaderMap::new()));
    }

    #[test]
    fn test_credentials_flag_off() {
        let policy = CorsPolicy::new(&CorsConfig {
            allowed_origins: vec!["https://a.com".into()],
            allow_credentials: false,
            exposed_headers: vec![],
            ..CorsConfig::default()
        })
        .unwrap();
        let headers = policy.resolve_headers(&with_origin("https://a.com"));
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());
        assert!(headers.get(header::ACCESS_CONTROL_EXPOSE_HEADERS).is_none());
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://a.com");
    }

    #[test]
    fn test_preflight_is_204_with_headers() {
        let policy = policy(&["https://a.com"]);
        let response = policy.handle_preflight(&with_origin("https://a.com"));
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://a.com"
        );
        assert_eq!(response.headers()[header::VARY], "Origin");
    }

    #[test]
    fn test_rejects_wildcard_with_credentials() {
        let err = CorsPolicy::new(&CorsConfig {
            allowed_origins: vec!["*".into()],
            ..CorsConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, CorsConfigError::WildcardWithCredentials));
    }

    #[test]
    fn test_rejects_bad_header_name() {
        let err = CorsPolicy::new(&CorsConfig {
            allowed_headers: vec!["X Bad".into()],
            ..CorsConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, CorsConfigError::HeaderName(name) if name == "X Bad"));
    }

    #[test]
    fn test_refused_preflight_is_counted() {
        let recorder = CaptureRecorder::default();
        let policy = policy(&["https://a.com"]);

        let response = ::metrics::with_local_recorder(&recorder, || {
            policy.handle_preflight(&with_origin("https://a.com"));
            policy.handle_preflight(&HeaderMap::new());
            policy.handle_preflight(&with_origin("https://evil.com"))
        });

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(!response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
        assert_eq!(recorder.counter("shield_cors_rejected_total"), 1);
    }
}
