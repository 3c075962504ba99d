//! Client identification from proxy headers.
//!
//! The first hop of `X-Forwarded-For` wins, then `X-Real-IP`. Proxy headers
//! are trusted as-is; there is no trusted-proxy list.

use axum::http::{HeaderMap, HeaderName};

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");

/// Partition key used when no proxy header identifies the client.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Derive the rate-limit partition key for a request.
pub fn client_id(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get(&X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    let real_ip = || {
        headers
            .get(&X_REAL_IP)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&HeaderName, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert((*name).clone(), HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_first_forwarded_hop_trimmed() {
        let map = headers(&[(&X_FORWARDED_FOR, " 1.2.3.4 , 10.0.0.1, 10.0.0.2")]);
        assert_eq!(client_id(&map), "1.2.3.4");
    }

    #[test]
    fn test_forwarded_takes_precedence_over_real_ip() {
        let map = headers(&[(&X_FORWARDED_FOR, "1.2.3.4"), (&X_REAL_IP, "5.6.7.8")]);
        assert_eq!(client_id(&map), "1.2.3.4");
    }

    #[test]
    fn test_falls_back_to_real_ip() {
        let map = headers(&[(&X_REAL_IP, "5.6.7.8")]);
        assert_eq!(client_id(&map), "5.6.7.8");
    }

    #[test]
    fn test_empty_forwarded_falls_back() {
        let map = headers(&[(&X_FORWARDED_FOR, " , 10.0.0.1"), (&X_REAL_IP, "5.6.7.8")]);
        assert_eq!(client_id(&map), "5.6.7.8");
    }

    #[test]
    fn test_unknown_when_no_headers() {
        assert_eq!(client_id(&HeaderMap::new()), UNKNOWN_CLIENT);
    }
}
