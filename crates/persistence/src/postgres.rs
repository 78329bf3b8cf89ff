//! Postgres implementations of the store and activity-sink boundaries.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::activity::ActivitySink;
use crate::entities::{AccountEntity, GrantEntity, ToolEntity};
use crate::store::{GrantStore, StoreError};
use domain::models::{
    Account, CreateActivityInput, ExpirationStatus, Grant, GrantPredicate, Tool, ToolStatus,
};

const GRANT_COLUMNS: &str = "account_id, tool_id, access_level, subscription_level, status, \
     expires_at, granted_at, notes, features_enabled, usage_limits, auto_renewal, \
     renewal_period, notification_settings, created_by, updated_by, updated_at";

const TOOL_COLUMNS: &str =
    "id, name, slug, category, description, status, version, features, pricing, created_at, updated_at";

/// Grant store backed by PostgreSQL.
#[derive(Clone)]
pub struct PgGrantStore {
    pool: PgPool,
}

impl PgGrantStore {
    /// Creates a new store with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl GrantStore for PgGrantStore {
    async fn find_account(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query_as::<_, AccountEntity>(
            r#"
            SELECT id, name, account_type, status, created_at, updated_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Account::try_from).transpose()
    }

    async fn list_accounts_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Account>, StoreError> {
        let rows = sqlx::query_as::<_, AccountEntity>(
            r#"
            SELECT id, name, account_type, status, created_at, updated_at
            FROM accounts
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Account::try_from).collect()
    }

    async fn find_tool(&self, id: Uuid) -> Result<Option<Tool>, StoreError> {
        let row = sqlx::query_as::<_, ToolEntity>(&format!(
            "SELECT {TOOL_COLUMNS} FROM tools WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Tool::try_from).transpose()
    }

    async fn find_tool_by_slug(&self, slug: &str) -> Result<Option<Tool>, StoreError> {
        let row = sqlx::query_as::<_, ToolEntity>(&format!(
            "SELECT {TOOL_COLUMNS} FROM tools WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Tool::try_from).transpose()
    }

    async fn list_tools(&self, status: Option<ToolStatus>) -> Result<Vec<Tool>, StoreError> {
        let rows = sqlx::query_as::<_, ToolEntity>(&format!(
            r#"
            SELECT {TOOL_COLUMNS} FROM tools
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY name, id
            "#
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Tool::try_from).collect()
    }

    async fn list_tools_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Tool>, StoreError> {
        let rows = sqlx::query_as::<_, ToolEntity>(&format!(
            "SELECT {TOOL_COLUMNS} FROM tools WHERE id = ANY($1) ORDER BY name, id"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Tool::try_from).collect()
    }

    async fn insert_tool(&self, tool: &Tool) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO tools (id, name, slug, category, description, status, version,
                               features, pricing, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(tool.id)
        .bind(&tool.name)
        .bind(&tool.slug)
        .bind(&tool.category)
        .bind(&tool.description)
        .bind(tool.status.as_str())
        .bind(&tool.version)
        .bind(json!(tool.features))
        .bind(json!(tool.pricing))
        .bind(tool.created_at)
        .bind(tool.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_tool(&self, tool: &Tool) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE tools
            SET name = $2, category = $3, description = $4, status = $5, version = $6,
                features = $7, pricing = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(tool.id)
        .bind(&tool.name)
        .bind(&tool.category)
        .bind(&tool.description)
        .bind(tool.status.as_str())
        .bind(&tool.version)
        .bind(json!(tool.features))
        .bind(json!(tool.pricing))
        .bind(tool.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_tool(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM tools WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn find_grant(
        &self,
        account_id: Uuid,
        tool_id: Uuid,
    ) -> Result<Option<Grant>, StoreError> {
        let row = sqlx::query_as::<_, GrantEntity>(&format!(
            "SELECT {GRANT_COLUMNS} FROM account_tool_access WHERE account_id = $1 AND tool_id = $2"
        ))
        .bind(account_id)
        .bind(tool_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Grant::try_from).transpose()
    }

    async fn list_grants(&self, predicate: &GrantPredicate) -> Result<Vec<Grant>, StoreError> {
        // Optional filters use the `$n IS NULL OR col = $n` pattern; the
        // expiration bucket appends a static fragment per variant.
        let mut sql = format!(
            r#"
            SELECT {GRANT_COLUMNS} FROM account_tool_access
            WHERE ($1::text IS NULL OR subscription_level = $1)
              AND ($2::text IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR tool_id = $3)
              AND ($4::uuid IS NULL OR account_id = $4)
            "#
        );
        if let Some(window) = &predicate.expiration {
            match window.bucket {
                ExpirationStatus::Active => {
                    sql.push_str(" AND (expires_at IS NULL OR expires_at >= $5)");
                }
                ExpirationStatus::ExpiresSoon => {
                    sql.push_str(
                        " AND expires_at IS NOT NULL AND expires_at >= $5 AND expires_at <= $6",
                    );
                }
                ExpirationStatus::Expired => {
                    sql.push_str(" AND expires_at IS NOT NULL AND expires_at < $5");
                }
            }
        }

        let mut query = sqlx::query_as::<_, GrantEntity>(&sql)
            .bind(predicate.subscription_level.map(|l| l.as_str()))
            .bind(predicate.status.map(|s| s.as_str()))
            .bind(predicate.tool_id)
            .bind(predicate.account_id);
        if let Some(window) = &predicate.expiration {
            query = query.bind(window.now);
            if window.bucket == ExpirationStatus::ExpiresSoon {
                query = query.bind(window.now + window.horizon);
            }
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Grant::try_from).collect()
    }

    async fn insert_grant(&self, grant: &Grant) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO account_tool_access
                (account_id, tool_id, access_level, subscription_level, status, expires_at,
                 granted_at, notes, features_enabled, usage_limits, auto_renewal,
                 renewal_period, notification_settings, created_by, updated_by, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(grant.account_id)
        .bind(grant.tool_id)
        .bind(grant.access_level.as_str())
        .bind(grant.subscription_level.as_str())
        .bind(grant.status.as_str())
        .bind(grant.expires_at)
        .bind(grant.granted_at)
        .bind(&grant.notes)
        .bind(json!(grant.features_enabled))
        .bind(json!(grant.usage_limits))
        .bind(grant.auto_renewal)
        .bind(grant.renewal_period.map(|p| p.as_str()))
        .bind(json!(grant.notification_settings))
        .bind(grant.created_by)
        .bind(grant.updated_by)
        .bind(grant.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_grant(&self, grant: &Grant) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE account_tool_access
            SET access_level = $3, subscription_level = $4, status = $5, expires_at = $6,
                notes = $7, features_enabled = $8, usage_limits = $9, auto_renewal = $10,
                renewal_period = $11, notification_settings = $12, updated_by = $13,
                updated_at = $14
            WHERE account_id = $1 AND tool_id = $2
            "#,
        )
        .bind(grant.account_id)
        .bind(grant.tool_id)
        .bind(grant.access_level.as_str())
        .bind(grant.subscription_level.as_str())
        .bind(grant.status.as_str())
        .bind(grant.expires_at)
        .bind(&grant.notes)
        .bind(json!(grant.features_enabled))
        .bind(json!(grant.usage_limits))
        .bind(grant.auto_renewal)
        .bind(grant.renewal_period.map(|p| p.as_str()))
        .bind(json!(grant.notification_settings))
        .bind(grant.updated_by)
        .bind(grant.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_grant(&self, account_id: Uuid, tool_id: Uuid) -> Result<(), StoreError> {
        let result =
            sqlx::query("DELETE FROM account_tool_access WHERE account_id = $1 AND tool_id = $2")
                .bind(account_id)
                .bind(tool_id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

/// Activity sink backed by the `account_activities` table.
#[derive(Clone)]
pub struct PgActivitySink {
    pool: PgPool,
}

impl PgActivitySink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivitySink for PgActivitySink {
    async fn record(&self, input: &CreateActivityInput) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO account_activities
                (id, account_id, activity_type, target_type, target_id, description, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.account_id)
        .bind(input.activity_type.as_str())
        .bind(input.target_type.as_str())
        .bind(&input.target_id)
        .bind(&input.description)
        .bind(&input.metadata)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
