//! Sliding-window rate limiting keyed by `(client, operation)`.
//!
//! Each key owns an independent history of request timestamps. A request
//! is admitted when fewer than the operation's ceiling fall within the
//! window ending now; admitted requests append their own timestamp.
//! Histories are pruned on access, so an idle key costs nothing.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use shared::clock::Clock;

use crate::config::RateLimitConfig;
use crate::error::EngineError;

/// Operation class a ceiling applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitOperation {
    Create,
    Update,
    Delete,
    List,
    /// Bulk runs; metered under the fallback ceiling.
    Bulk,
}

impl RateLimitOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::List => "list",
            Self::Bulk => "bulk",
        }
    }
}

/// Rejection from the limiter. The retry hint is always the full window
/// length, never a computed remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitExceeded {
    pub retry_after_secs: u64,
}

impl From<RateLimitExceeded> for EngineError {
    fn from(err: RateLimitExceeded) -> Self {
        Self::RateLimited {
            retry_after_secs: err.retry_after_secs,
        }
    }
}

type WindowKey = (String, RateLimitOperation);
type Window = Arc<Mutex<Vec<DateTime<Utc>>>>;

/// In-process sliding-window limiter.
pub struct SlidingWindowLimiter {
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
    windows: RwLock<HashMap<WindowKey, Window>>,
}

impl SlidingWindowLimiter {
    pub fn new(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            windows: RwLock::new(HashMap::new()),
        }
    }

    fn limit_for(&self, operation: RateLimitOperation) -> u32 {
        match operation {
            RateLimitOperation::Create => self.config.create,
            RateLimitOperation::Update => self.config.update,
            RateLimitOperation::Delete => self.config.delete,
            RateLimitOperation::List => self.config.list,
            RateLimitOperation::Bulk => self.config.fallback,
        }
    }

    // Double-checked get-or-create so the common path takes only the
    // read lock.
    fn window(&self, client: &str, operation: RateLimitOperation) -> Window {
        let key = (client.to_string(), operation);
        if let Some(window) = self.windows.read().unwrap().get(&key) {
            return Arc::clone(window);
        }
        let mut windows = self.windows.write().unwrap();
        Arc::clone(windows.entry(key).or_default())
    }

    /// Admits or rejects one request for `client` performing `operation`.
    pub fn check(
        &self,
        client: &str,
        operation: RateLimitOperation,
    ) -> Result<(), RateLimitExceeded> {
        let limit = self.limit_for(operation) as usize;
        let now = self.clock.now();
        let cutoff = now - Duration::seconds(self.config.window_secs as i64);

        let window = self.window(client, operation);
        let mut stamps = window.lock().unwrap();
        stamps.retain(|stamp| *stamp > cutoff);
        if stamps.len() >= limit {
            tracing::warn!(
                client,
                operation = operation.as_str(),
                limit,
                "rate limit exceeded"
            );
            return Err(RateLimitExceeded {
                retry_after_secs: self.config.window_secs,
            });
        }
        stamps.push(now);
        Ok(())
    }
}
