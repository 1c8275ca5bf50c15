//! Fixed-window rate limiting keyed by caller identity

use crate::{config::RateLimitConfig, error::ContactError, middleware::client_identity::ClientIdentity};
use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Counter for one identity within its current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    pub count: u32,
    pub reset_at: Instant,
}

/// Outcome of a single rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub limited: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the identity's window resets, never negative.
    pub reset: Duration,
}

impl RateLimitStatus {
    pub fn reset_ms(&self) -> u64 {
        u64::try_from(self.reset.as_millis()).unwrap_or(u64::MAX)
    }

    /// Whole seconds until the window resets, rounded up.
    pub fn reset_seconds(&self) -> u64 {
        self.reset_ms().div_ceil(1000)
    }

    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(X_RATELIMIT_RESET, HeaderValue::from(self.reset_seconds()));
    }
}

/// Process-wide fixed-window counter.
///
/// Each identity gets at most `max_requests` admissions per window, where the
/// window opens on the identity's first request and lasts `window`. Bursts that
/// straddle a window boundary may admit up to `2 * max_requests - 1` requests in
/// a short span.
#[derive(Clone)]
pub struct RateLimiter {
    records: Arc<Mutex<HashMap<String, RateLimitRecord>>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_limits(config.max_requests, Duration::from_millis(config.window_ms))
    }

    pub fn with_limits(max_requests: u32, window: Duration) -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window,
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn check(&self, identity: &str) -> RateLimitStatus {
        self.check_at(identity, Instant::now())
    }

    /// Checks and counts a request observed at `now`.
    ///
    /// Lookup and increment happen under a single lock acquisition, so two
    /// concurrent requests for the same identity can never both take the last slot.
    pub fn check_at(&self, identity: &str, now: Instant) -> RateLimitStatus {
        let mut records = self.records.lock();

        if let Some(record) = records.get_mut(identity) {
            if now < record.reset_at {
                let reset = record.reset_at.saturating_duration_since(now);

                if record.count >= self.max_requests {
                    return self.status(true, 0, reset);
                }

                record.count += 1;
                return self.status(false, self.max_requests - record.count, reset);
            }
        }

        records.insert(
            identity.to_owned(),
            RateLimitRecord {
                count: 1,
                reset_at: now + self.window,
            },
        );

        self.status(false, self.max_requests.saturating_sub(1), self.window)
    }

    pub fn record(&self, identity: &str) -> Option<RateLimitRecord> {
        self.records.lock().get(identity).copied()
    }

    pub fn tracked_identities(&self) -> usize {
        self.records.lock().len()
    }

    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    /// Drops records whose window has closed. A dropped identity starts a fresh
    /// window on its next request, exactly as an expired record would.
    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|_, record| now < record.reset_at);
        before - records.len()
    }

    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let limiter = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let purged = limiter.purge_expired();
                if purged > 0 {
                    tracing::debug!(
                        purged,
                        remaining = limiter.tracked_identities(),
                        "purged expired rate-limit records"
                    );
                }
            }
        })
    }

    fn status(&self, limited: bool, remaining: u32, reset: Duration) -> RateLimitStatus {
        RateLimitStatus {
            limited,
            limit: self.max_requests,
            remaining,
            reset,
        }
    }
}

/// Gates the wrapped route on the caller's identity.
///
/// Limited callers get a 429 before the body is read. Successful responses carry
/// the `X-RateLimit-*` headers.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    ClientIdentity(identity): ClientIdentity,
    request: Request,
    next: Next,
) -> Result<Response, ContactError> {
    let status = limiter.check(&identity);

    if status.limited {
        tracing::warn!(
            identity = %identity,
            retry_after_seconds = status.reset_seconds(),
            "contact submission rate limited"
        );
        return Err(ContactError::RateLimited(status));
    }

    let mut response = next.run(request).await;

    if response.status().is_success() {
        status.apply_headers(response.headers_mut());
    }

    Ok(response)
}
