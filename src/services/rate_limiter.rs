//! Rate limiter for session joins
//!
//! Codes are short, so a client guessing them produces a stream of failed
//! joins. Failed joins are counted per client within a sliding window; a
//! client over the limit is refused before the code is even looked up.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use chrono::{DateTime, Utc, Duration};

use crate::config::RateLimitConfig;

/// Failed-join rate limiter keyed by client address
pub struct JoinRateLimiter {
    failures: Arc<RwLock<HashMap<String, Vec<DateTime<Utc>>>>>,
    max_failures: usize,
    window: Duration,
}

impl JoinRateLimiter {
    /// Create a new rate limiter
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            failures: Arc::new(RwLock::new(HashMap::new())),
            max_failures: config.join_failures_per_window,
            window: Duration::minutes(config.window_minutes),
        }
    }

    /// Check if the client has used up its failed joins for the window
    pub async fn is_limited(&self, client: &str) -> bool {
        let mut failures = self.failures.write().await;
        let cutoff = Utc::now() - self.window;

        let client_failures = failures.entry(client.to_string()).or_insert_with(Vec::new);
        client_failures.retain(|time| *time > cutoff);

        client_failures.len() >= self.max_failures
    }

    /// Record a join that named no active session
    pub async fn record_failure(&self, client: &str) {
        let mut failures = self.failures.write().await;
        failures
            .entry(client.to_string())
            .or_insert_with(Vec::new)
            .push(Utc::now());
    }

    /// Forget a client's failures after a successful join
    pub async fn clear(&self, client: &str) {
        self.failures.write().await.remove(client);
    }

    /// Clean up old entries (called periodically from a background task)
    pub async fn cleanup(&self) {
        let cutoff = Utc::now() - self.window;
        let mut failures = self.failures.write().await;
        failures.retain(|_, times| {
            times.retain(|time| *time > cutoff);
            !times.is_empty()
        });
    }

    /// Number of clients with failures still inside the window
    pub async fn tracked_clients(&self) -> usize {
        self.failures.read().await.len()
    }
}

impl Default for JoinRateLimiter {
    fn default() -> Self {
        Self::new(&RateLimitConfig::default())
    }
}
