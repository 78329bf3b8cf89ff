//! Grant store adapter boundary.
//!
//! Row-level CRUD over accounts, tools, and grants. The adapter carries no
//! business logic: it does not enforce the `(account_id, tool_id)`
//! uniqueness invariant, which belongs to the engine.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use domain::models::{Account, Grant, GrantPredicate, Tool, ToolStatus};

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("resource not found")]
    NotFound,

    #[error("duplicate key")]
    Conflict,

    #[error("failed to decode row: {0}")]
    Decode(String),

    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict,
                Some("23503") => StoreError::NotFound,
                _ => StoreError::Database(db_err.to_string()),
            },
            other => StoreError::Database(other.to_string()),
        }
    }
}

/// Data access boundary for the assignment engine.
#[async_trait]
pub trait GrantStore: Send + Sync {
    // Accounts (read-only to this core)

    async fn find_account(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    /// Loads exactly the accounts with the given ids. Missing ids are
    /// silently absent from the result.
    async fn list_accounts_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Account>, StoreError>;

    // Tools

    async fn find_tool(&self, id: Uuid) -> Result<Option<Tool>, StoreError>;

    async fn find_tool_by_slug(&self, slug: &str) -> Result<Option<Tool>, StoreError>;

    /// Lists tools, optionally restricted to one status, ordered by name.
    async fn list_tools(&self, status: Option<ToolStatus>) -> Result<Vec<Tool>, StoreError>;

    async fn list_tools_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Tool>, StoreError>;

    async fn insert_tool(&self, tool: &Tool) -> Result<(), StoreError>;

    async fn update_tool(&self, tool: &Tool) -> Result<(), StoreError>;

    async fn delete_tool(&self, id: Uuid) -> Result<(), StoreError>;

    // Grants

    async fn find_grant(
        &self,
        account_id: Uuid,
        tool_id: Uuid,
    ) -> Result<Option<Grant>, StoreError>;

    /// Lists grants matching every populated predicate field.
    async fn list_grants(&self, predicate: &GrantPredicate) -> Result<Vec<Grant>, StoreError>;

    async fn insert_grant(&self, grant: &Grant) -> Result<(), StoreError>;

    /// Rewrites the grant row identified by the grant's pair. Errors with
    /// `NotFound` when no such row exists.
    async fn update_grant(&self, grant: &Grant) -> Result<(), StoreError>;

    async fn delete_grant(&self, account_id: Uuid, tool_id: Uuid) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_from_row_not_found() {
        let err: StoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn test_store_error_display() {
        assert_eq!(StoreError::NotFound.to_string(), "resource not found");
        assert_eq!(StoreError::Conflict.to_string(), "duplicate key");
        assert_eq!(
            StoreError::Database("broken".into()).to_string(),
            "database error: broken"
        );
    }
}
