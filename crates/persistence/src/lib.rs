//! Persistence layer for the admin platform backend.
//!
//! This crate contains:
//! - Database connection management
//! - The `GrantStore` adapter trait and its Postgres and in-memory
//!   implementations
//! - Entity definitions (database row mappings)
//! - The `ActivitySink` audit-log boundary

pub mod activity;
pub mod db;
pub mod entities;
pub mod memory;
pub mod postgres;
pub mod store;

pub use activity::{ActivitySink, NoopActivitySink, RecordingActivitySink};
pub use memory::InMemoryGrantStore;
pub use postgres::{PgActivitySink, PgGrantStore};
pub use store::{GrantStore, StoreError};
