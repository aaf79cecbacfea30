use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Rate limit exceeded. Please wait before making more requests.")]
pub struct RateLimitExceeded {
    pub retry_after: Duration,
}

/// Sliding-window request counter per client identifier. Process-local.
#[derive(Clone)]
pub struct RateLimiter {
    limits: Arc<Mutex<HashMap<String, Vec<Instant>>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            limits: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window,
        }
    }

    pub async fn check_rate_limit(&self, key: &str) -> Result<(), RateLimitExceeded> {
        let mut limits = self.limits.lock().await;
        let now = Instant::now();

        let requests = limits.entry(key.to_string()).or_default();

        // Remove old requests outside window
        requests.retain(|&time| now.duration_since(time) < self.window);

        if requests.len() >= self.max_requests {
            let oldest = requests.first().copied().unwrap_or(now);
            return Err(RateLimitExceeded {
                retry_after: self.window.saturating_sub(now.duration_since(oldest)),
            });
        }

        requests.push(now);
        Ok(())
    }

    /// Drops clients whose every request has left the window.
    pub async fn cleanup(&self) -> usize {
        let mut limits = self.limits.lock().await;
        let now = Instant::now();
        let before = limits.len();

        limits.retain(|_, requests| {
            requests.retain(|&time| now.duration_since(time) < self.window);
            !requests.is_empty()
        });

        before - limits.len()
    }

    pub async fn tracked_clients(&self) -> usize {
        self.limits.lock().await.len()
    }

    pub fn spawn_cleanup(&self, every: Duration) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every.max(Duration::from_millis(1)));
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let purged = limiter.cleanup().await;
                if purged > 0 {
                    debug!(purged, "Purged stale rate limit entries");
                }
            }
        })
    }
}
