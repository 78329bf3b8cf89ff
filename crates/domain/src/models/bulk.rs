//! Bulk operation request and result types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{AssignmentInput, AssignmentPatch};

/// Maximum items accepted in one bulk request.
pub const MAX_BULK_ITEMS: usize = 200;

/// Kind of bulk mutation being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkOperationKind {
    /// Create grants; an existing pair is routed to the update path.
    Assign,
    /// Patch existing grants.
    Update,
    /// Assign-or-update reconcile toward the requested state.
    Sync,
    /// Read-only check that each grant exists and is active.
    Verify,
}

impl BulkOperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assign => "assign",
            Self::Update => "update",
            Self::Sync => "sync",
            Self::Verify => "verify",
        }
    }
}

impl std::fmt::Display for BulkOperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bulk assign/sync/verify request: one grant payload per item.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BulkAssignRequest {
    #[validate(length(min = 1, max = 200, message = "items must contain 1-200 entries"))]
    pub items: Vec<AssignmentInput>,
}

/// Bulk update request: one patch applied to many accounts for one tool.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BulkUpdateRequest {
    #[validate(length(min = 1, max = 200, message = "accountIds must contain 1-200 entries"))]
    pub account_ids: Vec<Uuid>,
    pub tool_id: Uuid,
    pub changes: AssignmentPatch,
}

/// Error captured for a single failed bulk item. Tagged with the item's
/// identifiers so callers can correlate regardless of completion order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkItemError {
    pub account_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_id: Option<Uuid>,
    pub error: String,
}

/// Aggregated outcome of a bulk operation. A result with `failed > 0` is a
/// partial failure, not an error: successes are never rolled back.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOperationResult {
    pub success: bool,
    pub processed: u32,
    pub failed: u32,
    pub errors: Vec<BulkItemError>,
    pub operation_id: Uuid,
}

impl BulkOperationResult {
    /// Builds the final result from per-item outcomes.
    pub fn from_outcomes(
        operation_id: Uuid,
        outcomes: Vec<Result<(), BulkItemError>>,
    ) -> Self {
        let mut processed = 0u32;
        let mut errors = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(()) => processed += 1,
                Err(err) => errors.push(err),
            }
        }
        let failed = errors.len() as u32;
        Self {
            success: failed == 0,
            processed,
            failed,
            errors,
            operation_id,
        }
    }
}
