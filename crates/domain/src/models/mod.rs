//! Domain model definitions.

pub mod account;
pub mod activity;
pub mod bulk;
pub mod grant;
pub mod matrix;
pub mod tool;

pub use account::{Account, AccountStatus, AccountType};
pub use activity::{ActivityType, CreateActivityInput, TargetType};
pub use bulk::{
    BulkAssignRequest, BulkItemError, BulkOperationKind, BulkOperationResult, BulkUpdateRequest,
    MAX_BULK_ITEMS,
};
pub use grant::{
    AccessLevel, AssignmentInput, AssignmentPatch, FieldChange, Grant, GrantStatus, RenewalPeriod,
    SubscriptionLevel, TRIAL_MAX_DAYS,
};
pub use matrix::{
    AccountSortField, AssignmentMatrix, ExpirationStatus, ExpirationWindow, GrantPredicate,
    MatrixFilters, SortDir,
};
pub use tool::{
    NewTool, PricingTier, Tool, ToolFeature, ToolPatch, ToolPricing, ToolStatus,
};
