//! The grant engine: bulk mutations, matrix assembly, and tool lifecycle
//! over an abstract store.

mod assignments;
mod bulk;
mod matrix;
mod tools;

pub use assignments::ToolMetrics;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use uuid::Uuid;

use domain::models::CreateActivityInput;
use persistence::{ActivitySink, GrantStore, StoreError};
use shared::clock::{Clock, SystemClock};

use crate::cache::MatrixCache;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::rate_limit::{RateLimitOperation, SlidingWindowLimiter};

/// Orchestrates every assignment and tool operation.
///
/// All time-dependent behavior (rate windows, cache TTL, expiry checks)
/// reads the injected clock, so the whole engine is testable without
/// sleeping.
pub struct GrantEngine {
    store: Arc<dyn GrantStore>,
    activity: Arc<dyn ActivitySink>,
    limiter: SlidingWindowLimiter,
    cache: MatrixCache,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
}

impl GrantEngine {
    pub fn new(
        store: Arc<dyn GrantStore>,
        activity: Arc<dyn ActivitySink>,
        config: EngineConfig,
    ) -> Self {
        Self::with_clock(store, activity, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn GrantStore>,
        activity: Arc<dyn ActivitySink>,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let limiter = SlidingWindowLimiter::new(config.rate_limit.clone(), Arc::clone(&clock));
        let cache = MatrixCache::new(config.cache.clone(), Arc::clone(&clock));
        Self {
            store,
            activity,
            limiter,
            cache,
            config,
            clock,
        }
    }

    /// The result cache, exposed for coordinated invalidation by callers
    /// that mutate grants outside this engine.
    pub fn cache(&self) -> &MatrixCache {
        &self.cache
    }

    pub(crate) fn check_rate(
        &self,
        actor: Uuid,
        operation: RateLimitOperation,
    ) -> Result<(), EngineError> {
        self.limiter
            .check(&actor.to_string(), operation)
            .map_err(Into::into)
    }

    /// Records an activity without letting sink failures surface into the
    /// business operation.
    pub(crate) async fn record_activity(&self, input: CreateActivityInput) {
        if let Err(err) = self.activity.record(&input).await {
            tracing::warn!(error = %err, target_id = %input.target_id, "activity record failed");
        }
    }

    /// Drops cached matrices showing the mutated grant rows. Every cached
    /// page lists every active tool, so a tool absent from some entry's
    /// entity set must be inactive; its grants can still reshape filtered
    /// pages that never displayed them, and the remainder is flushed.
    pub(crate) fn invalidate_grants(&self, tool_id: Uuid, account_ids: &[Uuid]) {
        let before = self.cache.len();
        let tool_hits = self.cache.invalidate_entity(tool_id);
        for account_id in account_ids {
            self.cache.invalidate_entity(*account_id);
        }
        if tool_hits < before {
            self.cache.invalidate_all();
        }
    }

    /// Drops cached matrices showing either side of an assignment pair.
    pub(crate) fn invalidate_pair(&self, account_id: Uuid, tool_id: Uuid) {
        self.invalidate_grants(tool_id, &[account_id]);
    }

    /// Runs a store call under the configured deadline. Used on the
    /// per-item path of bulk operations so one stuck call cannot stall a
    /// whole batch.
    pub(crate) async fn timed<T>(
        &self,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, EngineError> {
        let deadline = StdDuration::from_secs(self.config.store_timeout_secs);
        match tokio::time::timeout(deadline, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(EngineError::Timeout),
        }
    }
}
