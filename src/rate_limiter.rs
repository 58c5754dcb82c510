use crate::config::RateLimits;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::debug;

/// Key under which language model calls are limited
pub const LLM: &str = "llm";

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Sliding-window limiter for outbound calls, keyed by service
#[derive(Clone)]
pub struct RateLimiter {
    limits: HashMap<String, RateLimit>,
    state: Arc<Mutex<HashMap<String, Vec<Instant>>>>,
}

#[derive(Debug, Clone, Copy)]
struct RateLimit {
    requests: usize,
    window: Duration,
}

impl RateLimiter {
    /// Creates a limiter with the configured per-minute budgets
    pub fn new(config: &RateLimits) -> Self {
        let mut limiter = Self {
            limits: HashMap::new(),
            state: Arc::new(Mutex::new(HashMap::new())),
        };
        limiter.add_limit(LLM, config.llm_per_minute, Duration::from_secs(60));
        limiter
    }

    /// Sets the budget for `key`; a zero budget disables limiting for it
    pub fn add_limit(&mut self, key: &str, requests: usize, window: Duration) {
        if requests == 0 {
            self.limits.remove(key);
        } else {
            self.limits.insert(key.to_string(), RateLimit { requests, window });
        }
    }

    /// Waits until a call for `key` fits in its window, then records it
    ///
    /// Keys without a configured budget pass through immediately.
    pub async fn acquire(&self, key: &str) {
        let Some(limit) = self.limits.get(key).copied() else {
            return;
        };

        let mut waited = false;
        loop {
            {
                let mut state = self.state.lock().await;
                let calls = state.entry(key.to_string()).or_default();
                let now = Instant::now();
                calls.retain(|&t| now.duration_since(t) < limit.window);

                if calls.len() < limit.requests {
                    calls.push(now);
                    if waited {
                        debug!(key, "rate limit permit granted after waiting");
                    }
                    return;
                }
            }

            waited = true;
            sleep(POLL_INTERVAL).await;
        }
    }
}
