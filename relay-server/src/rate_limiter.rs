// relay-server/src/rate_limiter.rs
use actix_web::HttpRequest;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Session creation limits
pub const SESSION_CREATE_WINDOW_MS: i64 = 60_000;
pub const SESSION_CREATE_MAX_REQUESTS: usize = 10;

/// One fixed window for one key.
#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    count: usize,
    reset_at: i64,
}

/// Live counters reported alongside a throttled response.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitInfo {
    pub remaining: usize,
    /// Epoch milliseconds at which the window resets.
    pub reset_at: i64,
}

/// Fixed-window counter per opaque key.
///
/// Checked explicitly by the session-create handler (capacity is checked
/// first, so this cannot be route middleware). Entries whose window has
/// passed are dropped by the periodic sweep to bound memory.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    window_ms: i64,
    max_requests: usize,
    store: Arc<Mutex<HashMap<String, WindowEntry>>>,
}

impl RateLimiter {
    pub fn new(window_ms: i64, max_requests: usize) -> Self {
        Self {
            window_ms,
            max_requests,
            store: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The instance guarding `POST /session`: 10 requests/minute/IP.
    pub fn session_create() -> Self {
        Self::new(SESSION_CREATE_WINDOW_MS, SESSION_CREATE_MAX_REQUESTS)
    }

    /// Record an attempt for `key`. Returns false when the key has exhausted
    /// the current window.
    pub fn check(&self, key: &str) -> bool {
        let mut store = self.store.lock().unwrap();
        let now = Utc::now().timestamp_millis();

        match store.get_mut(key) {
            Some(entry) if now <= entry.reset_at => {
                if entry.count >= self.max_requests {
                    false
                } else {
                    entry.count += 1;
                    true
                }
            }
            _ => {
                // No entry, or the stored window has passed: start fresh.
                store.insert(
                    key.to_string(),
                    WindowEntry {
                        count: 1,
                        reset_at: now + self.window_ms,
                    },
                );
                true
            }
        }
    }

    /// Live counters for `key`; a fresh or expired window reports a full
    /// allowance.
    pub fn info(&self, key: &str) -> RateLimitInfo {
        let store = self.store.lock().unwrap();
        let now = Utc::now().timestamp_millis();

        match store.get(key) {
            Some(entry) if now <= entry.reset_at => RateLimitInfo {
                remaining: self.max_requests.saturating_sub(entry.count),
                reset_at: entry.reset_at,
            },
            _ => RateLimitInfo {
                remaining: self.max_requests,
                reset_at: now + self.window_ms,
            },
        }
    }

    /// Drop entries whose window has passed. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let mut store = self.store.lock().unwrap();
        let now = Utc::now().timestamp_millis();
        let before = store.len();
        store.retain(|_, entry| now <= entry.reset_at);
        before - store.len()
    }
}

/// Client IP for rate-limit keying: first `X-Forwarded-For` hop, then
/// `X-Real-IP`, then a shared bucket.
pub fn client_ip(req: &HttpRequest) -> String {
    if let Some(forwarded) = req.headers().get("X-Forwarded-For") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(first) = value.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return first.to_string();
                }
            }
        }
    }

    if let Some(real_ip) = req.headers().get("X-Real-IP") {
        if let Ok(value) = real_ip.to_str() {
            return value.to_string();
        }
    }

    "unknown".to_string()
}
