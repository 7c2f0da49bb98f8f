use axum::{Json, http::StatusCode};
use serde_json::Value;
use std::{
    collections::HashMap,
    net::IpAddr,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

#[derive(Clone)]
struct RateLimitEntry {
    count: u32,
    last_reset: Instant,
}

/// Fixed-window limit on WebSocket upgrade attempts per peer IP
pub struct ConnectionRateLimiter {
    entries: RwLock<HashMap<IpAddr, RateLimitEntry>>,
    max_count: u32,
    window: Duration,
}

impl ConnectionRateLimiter {
    pub fn new(max_count: u32, window: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_count,
            window,
        }
    }

    pub async fn check(&self, ip: IpAddr) -> Result<(), (StatusCode, Json<Value>)> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        let entry = entries.entry(ip).or_insert(RateLimitEntry {
            count: 0,
            last_reset: now,
        });

        if now.duration_since(entry.last_reset) > self.window {
            entry.count = 0;
            entry.last_reset = now;
        }

        if entry.count >= self.max_count {
            tracing::warn!(ip = %ip, "connection rate limit exceeded");
            return Err((
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({ "error": "TOO_MANY_REQUESTS" })),
            ));
        }

        entry.count += 1;
        Ok(())
    }

    /// Drops windows that have already expired.
    pub async fn prune(&self) {
        let now = Instant::now();
        self.entries
            .write()
            .await
            .retain(|_, entry| now.duration_since(entry.last_reset) <= self.window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_limit_per_ip() {
        let limiter = ConnectionRateLimiter::new(2, Duration::from_secs(60));
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(limiter.check(a).await.is_ok());
        assert!(limiter.check(a).await.is_ok());
        let (status, _) = limiter.check(a).await.unwrap_err();
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

        assert!(limiter.check(b).await.is_ok());
    }

    #[tokio::test]
    async fn test_window_resets() {
        let limiter = ConnectionRateLimiter::new(1, Duration::from_millis(20));
        let ip: IpAddr = "10.0.0.1".parse().unwrap();

        assert!(limiter.check(ip).await.is_ok());
        assert!(limiter.check(ip).await.is_err());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(limiter.check(ip).await.is_ok());
    }

    #[tokio::test]
    async fn test_prune_drops_expired_windows() {
        let limiter = ConnectionRateLimiter::new(1, Duration::from_millis(10));
        limiter.check("10.0.0.1".parse().unwrap()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        limiter.prune().await;
        assert!(limiter.entries.read().await.is_empty());
    }
}
