//! Rate limiting middleware using Governor.
//!
//! Implements token bucket rate limiting keyed on the peer address. Clients
//! behind one address may split its allowance with the `X-Client-Id` header,
//! but every request also draws from the address-wide bucket, so rotating ids
//! never buys more than `CLIENTS_PER_PEER` times the per-client quota.

use axum::{
    Json,
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use serde_json::json;
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
    time::Duration,
};

/// Header carrying the caller's identity for rate limiting.
pub const CLIENT_ID_HEADER: &str = "X-Client-Id";

/// Per-client quotas an address may use in aggregate.
pub const CLIENTS_PER_PEER: u32 = 8;

/// Default bound on tracked `(address, client)` buckets.
pub const MAX_TRACKED_CLIENTS: usize = 10_000;

const MAX_CLIENT_ID_LEN: usize = 64;

/// Requests served without a socket address (in-process tests) share this peer.
const UNKNOWN_PEER: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// A client bucket; `None` is the shared bucket of an address.
type ClientKey = (IpAddr, Option<String>);

/// Rate limiter state shared across requests.
pub struct RateLimiterState {
    /// Aggregate allowance per peer address
    peers: DefaultKeyedRateLimiter<IpAddr>,
    /// Per-client allowance within an address
    clients: DefaultKeyedRateLimiter<ClientKey>,
    max_tracked: usize,
    period: Duration,
}

impl Default for RateLimiterState {
    fn default() -> Self {
        Self::new(100, Duration::from_secs(60))
    }
}

fn quota(burst: NonZeroU32, period: Duration) -> Quota {
    Quota::with_period(period / burst.get())
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}

impl RateLimiterState {
    /// Creates a new rate limiter state.
    ///
    /// # Arguments
    /// * `requests` - Number of requests allowed per client per period (at least 1)
    /// * `period` - Time period over which the quota replenishes
    pub fn new(requests: u32, period: Duration) -> Self {
        let burst = NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN);
        let peer_burst =
            burst.saturating_mul(NonZeroU32::new(CLIENTS_PER_PEER).unwrap_or(NonZeroU32::MIN));

        Self {
            peers: RateLimiter::keyed(quota(peer_burst, period)),
            clients: RateLimiter::keyed(quota(burst, period)),
            max_tracked: MAX_TRACKED_CLIENTS,
            period,
        }
    }

    /// Caps the number of distinct client buckets kept in memory.
    pub fn with_max_tracked(mut self, max_tracked: usize) -> Self {
        self.max_tracked = max_tracked.max(1);
        self
    }

    /// Returns true if the request is allowed, false if rate limited.
    ///
    /// Once `max_tracked` buckets exist and none can be pruned, unseen client
    /// ids fall back to the shared bucket of their address.
    pub fn check(&self, peer: IpAddr, client: Option<&str>) -> bool {
        if self.peers.check_key(&peer).is_err() {
            return false;
        }

        let mut key: ClientKey = (peer, client.map(str::to_string));
        if key.1.is_some() && self.clients.len() >= self.max_tracked {
            self.prune();
            if self.clients.len() >= self.max_tracked {
                key.1 = None;
            }
        }
        self.clients.check_key(&key).is_ok()
    }

    /// Number of client buckets currently held.
    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }

    /// Drops buckets that have fully replenished.
    pub fn prune(&self) {
        self.clients.retain_recent();
        self.peers.retain_recent();
    }

    pub fn retry_after_seconds(&self) -> u64 {
        self.period.as_secs().max(1)
    }
}

fn client_id(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(CLIENT_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.len() <= MAX_CLIENT_ID_LEN)
}

/// Rate limiting middleware. `/health` is never limited.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(UNKNOWN_PEER);
    let client = client_id(&request);

    if !limiter.check(peer, client) {
        tracing::warn!(%peer, client = client.unwrap_or("-"), "rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": "Rate limit exceeded. Please try again later.",
                "code": StatusCode::TOO_MANY_REQUESTS.as_u16(),
                "retry_after_seconds": limiter.retry_after_seconds()
            })),
        )
            .into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn test_quota_exhausts_per_client() {
        let limiter = RateLimiterState::new(2, Duration::from_secs(60));

        assert!(limiter.check(peer(1), Some("a")));
        assert!(limiter.check(peer(1), Some("a")));
        assert!(!limiter.check(peer(1), Some("a")));
        assert!(limiter.check(peer(1), Some("b")));
    }

    #[test]
    fn test_zero_quota_allows_one_request() {
        let limiter = RateLimiterState::new(0, Duration::from_secs(60));

        assert!(limiter.check(peer(1), None));
        assert!(!limiter.check(peer(1), None));
    }

    #[test]
    fn test_rotating_client_ids_hit_the_address_limit() {
        let limiter = RateLimiterState::new(1, Duration::from_secs(60));

        let allowed = (0..10_000)
            .filter(|i| limiter.check(peer(1), Some(&format!("client-{i}"))))
            .count();

        assert_eq!(allowed, CLIENTS_PER_PEER as usize);
        assert!(limiter.tracked_clients() <= CLIENTS_PER_PEER as usize);
        assert!(limiter.check(peer(2), Some("client-0")), "other addresses keep their quota");
    }

    #[test]
    fn test_tracked_clients_are_capped() {
        let limiter = RateLimiterState::new(1, Duration::from_secs(60)).with_max_tracked(4);

        let allowed = (0..100)
            .filter(|i| limiter.check(peer(1), Some(&format!("client-{i}"))))
            .count();

        // Four named buckets, then the address's shared bucket
        assert_eq!(allowed, 5);
        assert_eq!(limiter.tracked_clients(), 5);
    }
}
