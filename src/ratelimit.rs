//! Per-client rate limiting in front of the pipeline
//!
//! Sliding-window limiter with two backing stores: an in-process
//! window log (default) and a REST key-value store speaking the
//! two-window weighted-count protocol. The limiter fails open: when
//! the REST store errors it disables itself process-wide with a single
//! warning instead of blocking traffic.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use hyper::HeaderMap;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::RateLimitDecision;

/// Bucket for requests with no identifying header.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Headers consulted for the client identity, most trusted first.
const CLIENT_ID_HEADERS: [&str; 3] = ["x-forwarded-for", "x-real-ip", "cf-connecting-ip"];

/// Derive the rate-limit key from request headers. `x-forwarded-for`
/// may carry a proxy chain; only the first hop identifies the client.
pub fn client_key(headers: &HeaderMap) -> String {
    for name in CLIENT_ID_HEADERS {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
            if let Some(first) = value.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return first.to_string();
                }
            }
        }
    }
    UNKNOWN_CLIENT.to_string()
}

/// Client for a REST key-value store with an Upstash-style command
/// pipeline endpoint.
struct RestWindow {
    http: Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct PipelineEntry {
    result: Option<Value>,
}

impl RestWindow {
    fn new(base_url: &str, token: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    /// One round of the two-window weighted count: INCR the current
    /// window key, refresh its TTL, read the previous window key. The
    /// previous count is weighted by the unexpired fraction of its
    /// window.
    async fn increment(
        &self,
        client: &str,
        max_requests: u32,
        window_secs: u64,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision> {
        // The divisions below need a non-zero window.
        let window_ms = (window_secs.max(1) as i64) * 1000;
        let now_ms = now.timestamp_millis();
        let window_id = now_ms.div_euclid(window_ms);
        let current_key = format!("poliscope:rl:{}:{}", client, window_id);
        let previous_key = format!("poliscope:rl:{}:{}", client, window_id - 1);

        let commands = json!([
            ["INCR", current_key],
            ["PEXPIRE", current_key, (2 * window_ms).to_string()],
            ["GET", previous_key],
        ]);

        let mut request = self
            .http
            .post(format!("{}/pipeline", self.base_url))
            .json(&commands);
        if !self.token.is_empty() {
            request = request.bearer_auth(&self.token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Error::RateLimitError(format!(
                "rate limit store returned {}",
                response.status()
            )));
        }

        let entries: Vec<PipelineEntry> = response.json().await?;
        if entries.len() < 3 {
            return Err(Error::RateLimitError(
                "short pipeline response from rate limit store".to_string(),
            ));
        }

        let current = count_from(entries[0].result.as_ref());
        let previous = count_from(entries[2].result.as_ref());

        let elapsed_fraction = (now_ms.rem_euclid(window_ms)) as f64 / window_ms as f64;
        let weighted = previous as f64 * (1.0 - elapsed_fraction) + current as f64;

        let reset_at = DateTime::from_timestamp_millis((window_id + 1) * window_ms)
            .unwrap_or_else(|| now + Duration::seconds(window_secs as i64));

        Ok(RateLimitDecision {
            allowed: weighted <= max_requests as f64,
            remaining: (max_requests as f64 - weighted).floor().max(0.0) as u32,
            reset_at,
        })
    }
}

/// INCR returns an integer, GET a string or null.
fn count_from(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

enum LimiterBackend {
    Memory(Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>),
    Rest(RestWindow),
}

/// Sliding-window rate limiter.
pub struct RateLimiter {
    backend: LimiterBackend,
    max_requests: u32,
    window_secs: u64,
    disabled: AtomicBool,
}

impl RateLimiter {
    /// Limiter over the in-process window log. `max_requests` of zero
    /// turns limiting off.
    pub fn new_memory(max_requests: u32, window_secs: u64) -> Self {
        Self {
            backend: LimiterBackend::Memory(Mutex::new(HashMap::new())),
            max_requests,
            window_secs,
            disabled: AtomicBool::new(max_requests == 0),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let backend = if config.rate_limit_rest_configured() {
            LimiterBackend::Rest(RestWindow::new(
                &config.rate_limit_rest_url,
                &config.rate_limit_rest_token,
            ))
        } else {
            LimiterBackend::Memory(Mutex::new(HashMap::new()))
        };

        let limiter = Self {
            backend,
            max_requests: config.rate_limit_max,
            window_secs: config.rate_limit_window_secs,
            disabled: AtomicBool::new(config.rate_limit_max == 0),
        };
        if limiter.disabled.load(Ordering::Relaxed) {
            info!("Rate limiting disabled by configuration");
        }
        limiter
    }

    /// Gate one request from `client`.
    pub async fn limit(&self, client: &str) -> RateLimitDecision {
        self.limit_at(client, Utc::now()).await
    }

    /// Same as [`limit`](Self::limit) with an explicit clock.
    pub async fn limit_at(&self, client: &str, now: DateTime<Utc>) -> RateLimitDecision {
        if self.disabled.load(Ordering::Relaxed) {
            return self.open_decision(now);
        }

        match &self.backend {
            LimiterBackend::Memory(log) => self.check_log(log, client, now),
            LimiterBackend::Rest(rest) => {
                match rest
                    .increment(client, self.max_requests, self.window_secs, now)
                    .await
                {
                    Ok(decision) => decision,
                    Err(err) => {
                        self.disable(&err.to_string());
                        self.open_decision(now)
                    }
                }
            }
        }
    }

    fn check_log(
        &self,
        log: &Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>,
        client: &str,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        let window = Duration::seconds(self.window_secs as i64);
        let floor = now - window;

        let mut log = match log.lock() {
            Ok(guard) => guard,
            Err(_) => return self.open_decision(now),
        };

        // Prune expired stamps and drop clients with none left in the
        // window, so the log tracks only currently active clients.
        log.retain(|_, stamps| {
            while stamps.front().map(|t| *t <= floor).unwrap_or(false) {
                stamps.pop_front();
            }
            !stamps.is_empty()
        });

        let entries = log.entry(client.to_string()).or_default();
        if entries.len() as u32 >= self.max_requests {
            let reset_at = entries.front().map(|t| *t + window).unwrap_or(now);
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at,
            };
        }

        entries.push_back(now);
        RateLimitDecision {
            allowed: true,
            remaining: self.max_requests - entries.len() as u32,
            reset_at: now + window,
        }
    }

    fn open_decision(&self, now: DateTime<Utc>) -> RateLimitDecision {
        RateLimitDecision {
            allowed: true,
            remaining: self.max_requests,
            reset_at: now,
        }
    }

    fn disable(&self, reason: &str) {
        if !self.disabled.swap(true, Ordering::Relaxed) {
            warn!("Rate limiting disabled, failing open: {}", reason);
        }
    }
}
