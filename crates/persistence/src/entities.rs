//! Entity definitions: database row mappings for the Postgres store.
//!
//! Enum-typed columns are stored as text and parsed on the way out; a row
//! carrying an unknown value surfaces as `StoreError::Decode` rather than
//! silently passing through.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::collections::HashMap;
use uuid::Uuid;

use crate::store::StoreError;
use domain::models::{Account, Grant, Tool};

/// Row of the `accounts` table.
#[derive(Debug, Clone, FromRow)]
pub struct AccountEntity {
    pub id: Uuid,
    pub name: String,
    pub account_type: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AccountEntity> for Account {
    type Error = StoreError;

    fn try_from(row: AccountEntity) -> Result<Self, Self::Error> {
        Ok(Account {
            id: row.id,
            name: row.name,
            account_type: row.account_type.parse().map_err(StoreError::Decode)?,
            status: row.status.parse().map_err(StoreError::Decode)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Row of the `tools` table. Features and pricing are JSONB columns.
#[derive(Debug, Clone, FromRow)]
pub struct ToolEntity {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub category: String,
    pub description: String,
    pub status: String,
    pub version: String,
    pub features: serde_json::Value,
    pub pricing: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ToolEntity> for Tool {
    type Error = StoreError;

    fn try_from(row: ToolEntity) -> Result<Self, Self::Error> {
        Ok(Tool {
            id: row.id,
            name: row.name,
            slug: row.slug,
            category: row.category,
            description: row.description,
            status: row.status.parse().map_err(StoreError::Decode)?,
            version: row.version,
            features: serde_json::from_value(row.features)
                .map_err(|e| StoreError::Decode(e.to_string()))?,
            pricing: serde_json::from_value(row.pricing)
                .map_err(|e| StoreError::Decode(e.to_string()))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Row of the `account_tool_access` table.
#[derive(Debug, Clone, FromRow)]
pub struct GrantEntity {
    pub account_id: Uuid,
    pub tool_id: Uuid,
    pub access_level: String,
    pub subscription_level: String,
    pub status: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub granted_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub features_enabled: serde_json::Value,
    pub usage_limits: serde_json::Value,
    pub auto_renewal: bool,
    pub renewal_period: Option<String>,
    pub notification_settings: serde_json::Value,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

fn decode_map<T: serde::de::DeserializeOwned>(
    value: serde_json::Value,
) -> Result<HashMap<String, T>, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Decode(e.to_string()))
}

impl TryFrom<GrantEntity> for Grant {
    type Error = StoreError;

    fn try_from(row: GrantEntity) -> Result<Self, Self::Error> {
        Ok(Grant {
            account_id: row.account_id,
            tool_id: row.tool_id,
            access_level: row.access_level.parse().map_err(StoreError::Decode)?,
            subscription_level: row
                .subscription_level
                .parse()
                .map_err(StoreError::Decode)?,
            status: row.status.parse().map_err(StoreError::Decode)?,
            expires_at: row.expires_at,
            granted_at: row.granted_at,
            notes: row.notes,
            features_enabled: decode_map(row.features_enabled)?,
            usage_limits: decode_map(row.usage_limits)?,
            auto_renewal: row.auto_renewal,
            renewal_period: row
                .renewal_period
                .map(|p| p.parse().map_err(StoreError::Decode))
                .transpose()?,
            notification_settings: decode_map(row.notification_settings)?,
            created_by: row.created_by,
            updated_by: row.updated_by,
            updated_at: row.updated_at,
        })
    }
}
