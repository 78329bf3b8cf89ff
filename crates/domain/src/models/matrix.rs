//! Assignment matrix query types.
//!
//! The matrix is the account × tool view of all grants: tools form the
//! complete column set (never paginated), accounts are paginated rows, and
//! grants are the cells. Only accounts with at least one qualifying grant
//! appear.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::pagination::{PageInfo, PageParams, DEFAULT_PAGE_SIZE};

use super::{Account, AccountType, Grant, GrantStatus, SubscriptionLevel, Tool};

/// Validated filter set for a matrix query. Unknown fields are rejected.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MatrixFilters {
    /// Free-text search over account name and type (applied post-load).
    #[serde(default)]
    pub search: Option<String>,
    /// Account-type filter (applied post-load).
    #[serde(default)]
    pub account_type: Option<AccountType>,
    /// Grant-level filter, pushed to the store.
    #[serde(default)]
    pub subscription_level: Option<SubscriptionLevel>,
    /// Grant-level filter, pushed to the store.
    #[serde(default)]
    pub status: Option<GrantStatus>,
    /// Grant-level expiration bucket, pushed to the store.
    #[serde(default)]
    pub expiration_status: Option<ExpirationStatus>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub sort_by: AccountSortField,
    #[serde(default)]
    pub sort_order: SortDir,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for MatrixFilters {
    fn default() -> Self {
        Self {
            search: None,
            account_type: None,
            subscription_level: None,
            status: None,
            expiration_status: None,
            page: default_page(),
            limit: default_limit(),
            sort_by: AccountSortField::default(),
            sort_order: SortDir::default(),
        }
    }
}

impl MatrixFilters {
    /// Normalized pagination parameters for this query.
    pub fn page_params(&self) -> PageParams {
        PageParams::new(self.page, self.limit)
    }

    /// The grant-level part of the filters, for the store query.
    pub fn grant_predicate(&self, now: DateTime<Utc>, horizon: Duration) -> GrantPredicate {
        GrantPredicate {
            subscription_level: self.subscription_level,
            status: self.status,
            tool_id: None,
            account_id: None,
            expiration: self
                .expiration_status
                .map(|bucket| ExpirationWindow { bucket, now, horizon }),
        }
    }
}

/// Expiration bucket a grant falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpirationStatus {
    /// Not yet expired (including grants without an expiry).
    Active,
    /// Expires within the configured horizon and not yet expired.
    ExpiresSoon,
    /// Expiry lies in the past.
    Expired,
}

impl ExpirationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::ExpiresSoon => "expires_soon",
            Self::Expired => "expired",
        }
    }
}

/// Expiration bucket evaluated against a fixed instant, so every grant in
/// one query is classified consistently.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpirationWindow {
    pub bucket: ExpirationStatus,
    pub now: DateTime<Utc>,
    pub horizon: Duration,
}

impl ExpirationWindow {
    pub fn matches(&self, grant: &Grant) -> bool {
        match self.bucket {
            ExpirationStatus::Active => !grant.is_expired(self.now),
            ExpirationStatus::ExpiresSoon => grant.expires_soon(self.now, self.horizon),
            ExpirationStatus::Expired => grant.is_expired(self.now),
        }
    }
}

/// Row-level predicate for grant queries against the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrantPredicate {
    pub subscription_level: Option<SubscriptionLevel>,
    pub status: Option<GrantStatus>,
    pub tool_id: Option<Uuid>,
    pub account_id: Option<Uuid>,
    pub expiration: Option<ExpirationWindow>,
}

impl GrantPredicate {
    /// Whether a grant satisfies every populated field.
    pub fn matches(&self, grant: &Grant) -> bool {
        if let Some(level) = self.subscription_level {
            if grant.subscription_level != level {
                return false;
            }
        }
        if let Some(status) = self.status {
            if grant.status != status {
                return false;
            }
        }
        if let Some(tool_id) = self.tool_id {
            if grant.tool_id != tool_id {
                return false;
            }
        }
        if let Some(account_id) = self.account_id {
            if grant.account_id != account_id {
                return false;
            }
        }
        if let Some(ref window) = self.expiration {
            if !window.matches(grant) {
                return false;
            }
        }
        true
    }
}

/// Account sort field for the matrix rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountSortField {
    #[default]
    Name,
    Type,
    CreatedAt,
    UpdatedAt,
}

impl AccountSortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Type => "type",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl SortDir {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Paginated matrix view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentMatrix {
    pub assignments: Vec<Grant>,
    pub accounts: Vec<Account>,
    pub tools: Vec<Tool>,
    pub pagination: PageInfo,
    /// True when served from the result cache.
    pub from_cache: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AccessLevel;
    use std::collections::HashMap;

    fn sample_grant(level: SubscriptionLevel, status: GrantStatus) -> Grant {
        Grant {
            account_id: Uuid::new_v4(),
            tool_id: Uuid::new_v4(),
            access_level: AccessLevel::Read,
            subscription_level: level,
            status,
            expires_at: None,
            granted_at: Utc::now(),
            notes: None,
            features_enabled: HashMap::new(),
            usage_limits: HashMap::new(),
            auto_renewal: false,
            renewal_period: None,
            notification_settings: HashMap::new(),
            created_by: None,
            updated_by: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_filters_deserialize_defaults() {
        let filters: MatrixFilters = serde_json::from_str("{}").unwrap();
        assert_eq!(filters.page, 1);
        assert_eq!(filters.limit, 100);
        assert_eq!(filters.sort_by, AccountSortField::Name);
        assert_eq!(filters.sort_order, SortDir::Asc);
    }

    #[test]
    fn test_filters_reject_unknown_field() {
        let result: Result<MatrixFilters, _> =
            serde_json::from_str(r#"{"toolCategory":"tax"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_predicate_matches_level_and_status() {
        let predicate = GrantPredicate {
            subscription_level: Some(SubscriptionLevel::Premium),
            status: Some(GrantStatus::Active),
            ..Default::default()
        };
        assert!(predicate.matches(&sample_grant(
            SubscriptionLevel::Premium,
            GrantStatus::Active
        )));
        assert!(!predicate.matches(&sample_grant(
            SubscriptionLevel::Basic,
            GrantStatus::Active
        )));
        assert!(!predicate.matches(&sample_grant(
            SubscriptionLevel::Premium,
            GrantStatus::Suspended
        )));
    }

    #[test]
    fn test_expiration_window_buckets() {
        let now = Utc::now();
        let mut grant = sample_grant(SubscriptionLevel::Basic, GrantStatus::Active);
        grant.expires_at = Some(now + Duration::days(3));

        let soon = ExpirationWindow {
            bucket: ExpirationStatus::ExpiresSoon,
            now,
            horizon: Duration::days(7),
        };
        let expired = ExpirationWindow {
            bucket: ExpirationStatus::Expired,
            now,
            horizon: Duration::days(7),
        };
        let active = ExpirationWindow {
            bucket: ExpirationStatus::Active,
            now,
            horizon: Duration::days(7),
        };

        assert!(soon.matches(&grant));
        assert!(!expired.matches(&grant));
        assert!(active.matches(&grant));

        grant.expires_at = Some(now - Duration::days(1));
        assert!(!soon.matches(&grant));
        assert!(expired.matches(&grant));
        assert!(!active.matches(&grant));
    }

    #[test]
    fn test_grant_without_expiry_is_active_bucket() {
        let now = Utc::now();
        let grant = sample_grant(SubscriptionLevel::Basic, GrantStatus::Active);
        let active = ExpirationWindow {
            bucket: ExpirationStatus::Active,
            now,
            horizon: Duration::days(7),
        };
        assert!(active.matches(&grant));
    }
}
