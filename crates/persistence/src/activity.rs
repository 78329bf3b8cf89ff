//! Activity-log sink boundary.
//!
//! The sink is consumed fire-and-forget: the engine calls `record` and
//! swallows any error after logging it, so a broken audit path never
//! blocks a business mutation.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::store::StoreError;
use domain::models::CreateActivityInput;

/// One-way recorder of structured activity events.
#[async_trait]
pub trait ActivitySink: Send + Sync {
    async fn record(&self, input: &CreateActivityInput) -> Result<(), StoreError>;
}

/// Sink that discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopActivitySink;

#[async_trait]
impl ActivitySink for NoopActivitySink {
    async fn record(&self, _input: &CreateActivityInput) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Sink that keeps every record in memory, for assertions in tests.
#[derive(Debug, Default)]
pub struct RecordingActivitySink {
    records: Mutex<Vec<CreateActivityInput>>,
}

impl RecordingActivitySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn records(&self) -> Vec<CreateActivityInput> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActivitySink for RecordingActivitySink {
    async fn record(&self, input: &CreateActivityInput) -> Result<(), StoreError> {
        self.records.lock().unwrap().push(input.clone());
        Ok(())
    }
}
