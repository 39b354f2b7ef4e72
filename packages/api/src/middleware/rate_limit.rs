//! Per-client-IP token bucket rate limiting.
//!
//! Buckets live in a `moka` cache with a time-to-idle of three minutes, so
//! inactive clients evict themselves. Rejection is immediate — a denied
//! request never waits.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::http::HeaderValue;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::request_client_ip;
use crate::error::ApiError;
use crate::state::AppState;

/// The resolved client IP, attached as a request extension.
#[derive(Clone, Debug)]
pub struct ClientIp(pub String);

const DEFAULT_RATE: f64 = 100.0;
const DEFAULT_BURST: f64 = 200.0;
const BUCKET_IDLE_EVICTION: Duration = Duration::from_secs(3 * 60);

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

/// Shared bucket store, safe for many concurrent callers.
pub struct RateLimiter {
    buckets: moka::sync::Cache<String, Arc<Mutex<TokenBucket>>>,
    rate: f64,
    burst: f64,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_RATE, DEFAULT_BURST)
    }
}

impl RateLimiter {
    /// `rate` is requests per second, `burst` the bucket capacity.
    pub fn new(rate: f64, burst: f64) -> Self {
        Self {
            buckets: moka::sync::Cache::builder()
                .max_capacity(100_000)
                .time_to_idle(BUCKET_IDLE_EVICTION)
                .build(),
            rate,
            burst,
        }
    }

    /// Whether a request from `ip` may proceed right now.
    pub fn allow(&self, ip: &str) -> bool {
        let bucket = self.buckets.get_with(ip.to_string(), || {
            Arc::new(Mutex::new(TokenBucket {
                tokens: self.burst,
                last_refill: Instant::now(),
            }))
        });

        let mut bucket = bucket.lock().expect("rate limit bucket poisoned");
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.burst);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let ip = request_client_ip(&request);
    if !state.limiter.allow(&ip) {
        tracing::warn!(%ip, "rate limit exceeded");
        let mut response = ApiError::too_many_requests("too many requests").into_response();
        response
            .headers_mut()
            .insert("Retry-After", HeaderValue::from_static("1"));
        return response;
    }

    // Downstream handlers use the resolved IP for audit rows.
    request.extensions_mut().insert(ClientIp(ip));
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_is_honored_then_exhausted() {
        let limiter = RateLimiter::new(100.0, 5.0);
        for _ in 0..5 {
            assert!(limiter.allow("10.0.0.1"));
        }
        assert!(!limiter.allow("10.0.0.1"));
    }

    #[test]
    fn buckets_are_per_ip() {
        let limiter = RateLimiter::new(100.0, 1.0);
        assert!(limiter.allow("10.0.0.1"));
        assert!(!limiter.allow("10.0.0.1"));
        assert!(limiter.allow("10.0.0.2"));
    }

    #[test]
    fn tokens_refill_over_time() {
        let limiter = RateLimiter::new(1000.0, 1.0);
        assert!(limiter.allow("10.0.0.1"));
        assert!(!limiter.allow("10.0.0.1"));
        std::thread::sleep(Duration::from_millis(5));
        assert!(limiter.allow("10.0.0.1"));
    }
}
