use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use axum::{
    extract::ConnectInfo,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::warn;

/// Requests counted against one client in the current one-second window.
#[derive(Debug, Clone)]
struct Window {
    started: Instant,
    count: u32,
}

/// Per-IP fixed-window rate limiter.  A limit of zero disables limiting,
/// which deployments set through `RATE_LIMIT_PER_SEC`.
#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<IpAddr, Window>>>,
    limit: u32,
}

impl RateLimiter {
    pub fn new(limit: u32) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            limit,
        }
    }

    /// Record one request from `ip`; returns false when its budget for the
    /// current window is spent.
    pub async fn check(&self, ip: IpAddr) -> bool {
        if self.limit == 0 {
            return true;
        }

        let mut windows = self.windows.lock().await;
        let now = Instant::now();
        let window = windows.entry(ip).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(window.started).as_secs_f64() >= 1.0 {
            window.started = now;
            window.count = 0;
        }

        window.count += 1;
        window.count <= self.limit
    }

    /// Drop windows idle for longer than `max_idle_secs`.
    pub async fn purge_stale(&self, max_idle_secs: f64) {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();
        windows.retain(|_, window| {
            now.duration_since(window.started).as_secs_f64() < max_idle_secs
        });
    }
}

pub async fn rate_limit_middleware(
    axum::extract::State(limiter): axum::extract::State<RateLimiter>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let ip = extract_client_ip(&req);

    if let Some(ip) = ip {
        if !limiter.check(ip).await {
            warn!(ip = %ip, "Rate limit exceeded");
            return Err(StatusCode::TOO_MANY_REQUESTS);
        }
    }

    Ok(next.run(req).await)
}

/// Try ConnectInfo first, then X-Forwarded-For, then X-Real-IP.
fn extract_client_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    if let Some(connect_info) = req.extensions().get::<ConnectInfo<std::net::SocketAddr>>() {
        return Some(connect_info.0.ip());
    }

    if let Some(forwarded) = req.headers().get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(first) = value.split(',').next() {
                if let Ok(ip) = first.trim().parse::<IpAddr>() {
                    return Some(ip);
                }
            }
        }
    }

    if let Some(real_ip) = req.headers().get("x-real-ip") {
        if let Ok(value) = real_ip.to_str() {
            if let Ok(ip) = value.trim().parse::<IpAddr>() {
                return Some(ip);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn window_budget_is_enforced() {
        let limiter = RateLimiter::new(3);
        let ip: IpAddr = "127.0.0.1".parse().unwrap();

        for _ in 0..3 {
            assert!(limiter.check(ip).await);
        }
        assert!(!limiter.check(ip).await);
    }

    #[tokio::test(start_paused = true)]
    async fn window_resets_after_a_second() {
        let limiter = RateLimiter::new(2);
        let ip: IpAddr = "127.0.0.1".parse().unwrap();

        assert!(limiter.check(ip).await);
        assert!(limiter.check(ip).await);
        assert!(!limiter.check(ip).await);

        tokio::time::advance(std::time::Duration::from_millis(1100)).await;
        assert!(limiter.check(ip).await);
    }

    #[tokio::test]
    async fn ips_are_limited_independently() {
        let limiter = RateLimiter::new(1);
        let ip1: IpAddr = "10.0.0.1".parse().unwrap();
        let ip2: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(limiter.check(ip1).await);
        assert!(!limiter.check(ip1).await);
        assert!(limiter.check(ip2).await);
    }

    #[tokio::test]
    async fn zero_limit_disables_limiting() {
        let limiter = RateLimiter::new(0);
        let ip: IpAddr = "127.0.0.1".parse().unwrap();

        for _ in 0..100 {
            assert!(limiter.check(ip).await);
        }
    }

    #[tokio::test]
    async fn purge_drops_stale_windows() {
        let limiter = RateLimiter::new(5);
        let ip: IpAddr = "192.168.1.1".parse().unwrap();
        assert!(limiter.check(ip).await);

        limiter.purge_stale(0.0).await;

        let windows = limiter.windows.lock().await;
        assert!(windows.is_empty());
    }
}
