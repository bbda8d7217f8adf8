use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};

use crate::state::SharedState;

pub type IpRateLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

/// One token bucket per client IP, per spec §6's "no more than N requests
/// per second per caller" admission rule.
pub fn build_limiter(requests_per_second: u32, burst: u32) -> IpRateLimiter {
    let rps = NonZeroU32::new(requests_per_second.max(1)).expect("non-zero rps");
    let burst = NonZeroU32::new(burst.max(1)).expect("non-zero burst");
    RateLimiter::keyed(Quota::per_second(rps).allow_burst(burst))
}

/// Keyed on the peer's socket address; behind a real load balancer this
/// would key on a forwarded-for header instead, but the engine has no
/// such boundary to trust here.
pub async fn rate_limit(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    match state.rate_limiter.check_key(&addr.ip()) {
        Ok(_) => next.run(request).await,
        Err(_) => (StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded").into_response(),
    }
}
