use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::time::{Duration, Instant};

static RATE_LIMITER: Lazy<DashMap<String, (u32, Instant)>> = Lazy::new(DashMap::new);

fn requests_per_second() -> u32 {
    std::env::var("RATE_LIMIT_PER_SEC")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(25)
}

/// Per-IP fixed-window rate limiter. The window is one second.
pub async fn global_rate_limiter(request: Request, next: Next) -> Result<Response, StatusCode> {
    let ip = request
        .extensions()
        .get::<std::net::SocketAddr>()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let now = Instant::now();
    let mut entry = RATE_LIMITER.entry(ip).or_insert((0, now));

    if now.duration_since(entry.1) > Duration::from_secs(1) {
        *entry = (1, now);
    } else {
        entry.0 += 1;
    }

    if entry.0 > requests_per_second() {
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    Ok(next.run(request).await)
}
