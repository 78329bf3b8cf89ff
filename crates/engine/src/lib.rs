//! Bulk assignment and matrix engine.
//!
//! Coordinates the account × tool grant matrix: single and bulk mutations
//! with partial-failure isolation, sliding-window rate limiting per
//! `(actor, operation)`, and an entity-indexed result cache for matrix
//! queries. Storage and audit logging sit behind the traits in the
//! `persistence` crate.

pub mod cache;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod service;

pub use cache::{matrix_cache_key, MatrixCache};
pub use config::EngineConfig;
pub use error::EngineError;
pub use rate_limit::{RateLimitOperation, SlidingWindowLimiter};
pub use service::{GrantEngine, ToolMetrics};
