//! Fixed-window rate limiting with a cooldown block.
//!
//! Each client gets `max_requests` per window. The request that exceeds the
//! limit is denied and starts a block of `block_duration_ms`; while blocked,
//! checks are denied without touching the counter.
//!
//! Counters live behind [`RateLimitStore`], which runs each update under the
//! key's lock. State is process-local: separate instances count separately.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::{self, Next},
    response::Response,
    Router,
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::config::RateLimitConfig;
use crate::http::request::RequestIdExt;
use crate::http::response::rate_limited_response;
use crate::observability::metrics;
use crate::security::headers::client_id;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Per-client counter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    /// Requests seen in the current window.
    pub count: u32,
    /// Unix ms at which the window rolls over.
    pub window_reset_at: u64,
    /// Unix ms until which the client is denied.
    pub blocked_until: Option<u64>,
}

impl RateLimitEntry {
    fn is_blocked(&self, now: u64) -> bool {
        self.blocked_until.is_some_and(|until| until > now)
    }

    /// Window elapsed and no block in force.
    fn is_expired(&self, now: u64) -> bool {
        self.window_reset_at <= now && !self.is_blocked(now)
    }
}

/// Storage for rate-limit entries.
pub trait RateLimitStore: Send + Sync {
    /// Run `f` exactly once on the slot for `client_id` while holding that
    /// key's lock. Leaving `None` in the slot removes the entry. A store that
    /// skips `f` gets the request denied.
    fn update(&self, client_id: &str, f: &mut dyn FnMut(&mut Option<RateLimitEntry>));

    fn get(&self, client_id: &str) -> Option<RateLimitEntry>;

    fn remove(&self, client_id: &str) -> Option<RateLimitEntry>;

    /// Keep only the entries for which `keep` returns true.
    fn retain(&self, keep: &mut dyn FnMut(&RateLimitEntry) -> bool);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process store on a sharded concurrent map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, RateLimitEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimitStore for MemoryStore {
    fn update(&self, client_id: &str, f: &mut dyn FnMut(&mut Option<RateLimitEntry>)) {
        match self.entries.entry(client_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                let mut slot = Some(*occupied.get());
                f(&mut slot);
                match slot {
                    Some(entry) => *occupied.get_mut() = entry,
                    None => {
                        occupied.remove();
                    }
                }
            }
            Entry::Vacant(vacant) => {
                let mut slot = None;
                f(&mut slot);
                if let Some(entry) = slot {
                    vacant.insert(entry);
                }
            }
        }
    }

    fn get(&self, client_id: &str) -> Option<RateLimitEntry> {
        self.entries.get(client_id).map(|r| *r.value())
    }

    fn remove(&self, client_id: &str) -> Option<RateLimitEntry> {
        self.entries.remove(client_id).map(|(_, entry)| entry)
    }

    fn retain(&self, keep: &mut dyn FnMut(&RateLimitEntry) -> bool) {
        self.entries.retain(|_, entry| keep(entry));
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// Unix ms of the window reset, or of the block end when denied.
    pub reset_time: u64,
    /// Seconds until the client may retry; set only when denied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

/// Read-only view of a client's counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStatus {
    pub count: u32,
    pub remaining: u32,
    pub reset_time: Option<u64>,
    pub blocked: bool,
    pub blocked_until: Option<u64>,
}

/// Fixed-window limiter over an injected store.
pub struct RateLimiter {
    config: RateLimitConfig,
    store: Arc<dyn RateLimitStore>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    /// Share `store` with other limiters, e.g. a stricter per-route one.
    pub fn with_store(config: RateLimitConfig, store: Arc<dyn RateLimitStore>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn RateLimitStore> {
        &self.store
    }

    pub fn check_limit(&self, client_id: &str) -> RateLimitDecision {
        self.check_limit_at(client_id, now_millis())
    }

    /// Count one request from `client_id` at `now` (unix ms).
    pub fn check_limit_at(&self, client_id: &str, now: u64) -> RateLimitDecision {
        let max = self.config.max_requests;
        let mut decision = None;
        let mut inserted = false;

        self.store.update(client_id, &mut |slot| {
            if let Some(entry) = slot.as_ref() {
                if let Some(until) = entry.blocked_until.filter(|&until| until > now) {
                    decision = Some(RateLimitDecision {
                        allowed: false,
                        remaining: 0,
                        reset_time: until,
                        retry_after: Some((until - now).div_ceil(1000)),
                    });
                    return;
                }
            }

            if !slot.is_some_and(|entry| entry.window_reset_at > now) {
                inserted = slot.is_none();
                *slot = Some(RateLimitEntry {
                    count: 0,
                    window_reset_at: now + self.config.window_ms,
                    blocked_until: None,
                });
            }
            let Some(entry) = slot.as_mut() else {
                return;
            };

            entry.count = entry.count.saturating_add(1);

            if entry.count > max {
                let until = now + self.config.block_duration_ms;
                entry.blocked_until = Some(until);
                decision = Some(RateLimitDecision {
                    allowed: false,
                    remaining: 0,
                    reset_time: until,
                    retry_after: Some(self.config.block_duration_ms.div_ceil(1000)),
                });
            } else {
                decision = Some(RateLimitDecision {
                    allowed: true,
                    remaining: max - entry.count,
                    reset_time: entry.window_reset_at,
                    retry_after: None,
                });
            }
        });

        if self.config.cleanup_probability > 0.0 && fastrand::f64() < self.config.cleanup_probability
        {
            self.sweep_expired(now);
        } else if inserted {
            metrics::record_tracked_clients(self.store.len());
        }

        decision.unwrap_or_else(|| {
            tracing::error!(client_id = %client_id, "Rate-limit store skipped the update; denying");
            RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_time: now + 1000,
                retry_after: Some(1),
            }
        })
    }

    /// Drop an entry unconditionally. Returns whether one existed.
    pub fn clear_limit(&self, client_id: &str) -> bool {
        let removed = self.store.remove(client_id).is_some();
        if removed {
            metrics::record_tracked_clients(self.store.len());
        }
        removed
    }

    /// Entries currently held, also published as the tracked-clients gauge.
    pub fn tracked_clients(&self) -> usize {
        let count = self.store.len();
        metrics::record_tracked_clients(count);
        count
    }

    pub fn get_status(&self, client_id: &str) -> RateLimitStatus {
        self.status_at(client_id, now_millis())
    }

    pub fn status_at(&self, client_id: &str, now: u64) -> RateLimitStatus {
        let max = self.config.max_requests;
        match self.store.get(client_id) {
            Some(entry) if !entry.is_expired(now) => {
                let blocked = entry.is_blocked(now);
                RateLimitStatus {
                    count: entry.count,
                    remaining: if blocked { 0 } else { max.saturating_sub(entry.count) },
                    reset_time: Some(entry.window_reset_at),
                    blocked,
                    blocked_until: entry.blocked_until.filter(|_| blocked),
                }
            }
            _ => RateLimitStatus {
                count: 0,
                remaining: max,
                reset_time: None,
                blocked: false,
                blocked_until: None,
            },
        }
    }

    /// Remove expired, unblocked entries. Returns how many were removed.
    pub fn sweep_expired(&self, now: u64) -> usize {
        let before = self.store.len();
        self.store.retain(&mut |entry| !entry.is_expired(now));
        let remaining = self.store.len();
        metrics::record_tracked_clients(remaining);

        let removed = before.saturating_sub(remaining);
        if removed > 0 {
            tracing::debug!(removed, remaining, "Swept expired rate-limit entries");
        }
        removed
    }

    /// Periodic sweeper; runs until `shutdown` fires.
    pub async fn run_sweeper(self: Arc<Self>, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_expired(now_millis());
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Rate-limit sweeper stopping");
                    break;
                }
            }
        }
    }
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn apply_headers(headers: &mut HeaderMap, limit: u32, decision: &RateLimitDecision) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(
        X_RATELIMIT_RESET,
        HeaderValue::from(decision.reset_time.div_ceil(1000)),
    );
}

/// Middleware counting each request against its client's window.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    if !limiter.config.enabled {
        return next.run(request).await;
    }

    let client = client_id(request.headers());
    let decision = limiter.check_limit(&client);
    let limit = limiter.config.max_requests;

    if !decision.allowed {
        let retry_after = decision.retry_after.unwrap_or(0);
        tracing::warn!(
            request_id = %request.request_id(),
            client_id = %client,
            retry_after,
            "Rate limit exceeded"
        );
        metrics::record_rate_limited();
        let mut response = rate_limited_response(retry_after);
        apply_headers(response.headers_mut(), limit, &decision);
        return response;
    }

    let mut response = next.run(request).await;
    apply_headers(response.headers_mut(), limit, &decision);
    response
}

/// Put `router` behind the rate limiter.
pub fn with_rate_limit<S>(router: Router<S>, limiter: Arc<RateLimiter>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
}
