//! Activity-log input types.
//!
//! The audit sink is fire-and-forget: the engine builds one of these
//! records, hands it to the sink, and never lets a sink failure surface
//! into the business operation.

use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

/// Category of a recorded activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    AdminAction,
    BulkOperation,
    SystemAction,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AdminAction => "admin_action",
            Self::BulkOperation => "bulk_operation",
            Self::SystemAction => "system_action",
        }
    }
}

/// Type of entity an activity targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Tool,
    Account,
    Grant,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tool => "tool",
            Self::Account => "account",
            Self::Grant => "grant",
        }
    }
}

/// Input for one activity-log record.
///
/// `account_id` is the record's subject. Bulk operations attach the record
/// to the first item's account because the sink schema requires a single
/// subject; this is a known constraint of the audit collaborator.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActivityInput {
    pub account_id: Option<Uuid>,
    pub activity_type: ActivityType,
    pub target_type: TargetType,
    pub target_id: String,
    pub description: String,
    pub metadata: serde_json::Value,
}

impl CreateActivityInput {
    /// Creates a record for an admin action on a specific account.
    pub fn admin_action(
        account_id: Uuid,
        target_type: TargetType,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            account_id: Some(account_id),
            activity_type: ActivityType::AdminAction,
            target_type,
            target_id: target_id.into(),
            description: String::new(),
            metadata: json!({}),
        }
    }

    /// Creates a record for a system action with no subject account.
    pub fn system_action(target_type: TargetType, target_id: impl Into<String>) -> Self {
        Self {
            account_id: None,
            activity_type: ActivityType::SystemAction,
            target_type,
            target_id: target_id.into(),
            description: String::new(),
            metadata: json!({}),
        }
    }

    /// Creates a record summarizing a whole bulk operation.
    pub fn bulk_operation(subject_account: Option<Uuid>, operation_id: Uuid) -> Self {
        Self {
            account_id: subject_account,
            activity_type: ActivityType::BulkOperation,
            target_type: TargetType::Grant,
            target_id: operation_id.to_string(),
            description: String::new(),
            metadata: json!({}),
        }
    }

    /// Sets the human-readable description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the structured metadata payload.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}
