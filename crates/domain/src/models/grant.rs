//! Grant model: the account-tool assignment record.
//!
//! A grant is identified by its `(account_id, tool_id)` pair and there is
//! at most one grant per pair. The uniqueness invariant is enforced by the
//! engine, not assumed from the store.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;
use validator::ValidationError;

/// Maximum trial length in days. A trial subscription must carry an expiry
/// no further out than this.
pub const TRIAL_MAX_DAYS: i64 = 30;

/// Account-tool assignment record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    pub account_id: Uuid,
    pub tool_id: Uuid,
    pub access_level: AccessLevel,
    pub subscription_level: SubscriptionLevel,
    pub status: GrantStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub granted_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub features_enabled: HashMap<String, bool>,
    pub usage_limits: HashMap<String, i64>,
    pub auto_renewal: bool,
    pub renewal_period: Option<RenewalPeriod>,
    pub notification_settings: HashMap<String, bool>,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl Grant {
    /// Whether the grant's expiry lies in the past. Grants without an
    /// expiry never expire.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at < now)
    }

    /// Whether the grant expires within `horizon` from `now` and has not
    /// already expired.
    pub fn expires_soon(&self, now: DateTime<Utc>, horizon: Duration) -> bool {
        match self.expires_at {
            Some(at) => at >= now && at <= now + horizon,
            None => false,
        }
    }

    /// Validates the trial window against the grant's current state.
    /// Patches can change the subscription level and the expiry
    /// independently, so the rule is re-checked after the merge.
    pub fn validate_trial(&self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        check_trial_window(self.subscription_level, self.expires_at, now)
    }

    /// Applies a patch in place, returning the list of field-level changes
    /// `(field, from, to)` for audit metadata. Fields absent from the patch
    /// are untouched.
    pub fn apply_patch(&mut self, patch: &AssignmentPatch) -> Vec<FieldChange> {
        let mut changes = Vec::new();

        if let Some(level) = patch.subscription_level {
            if level != self.subscription_level {
                changes.push(FieldChange::new(
                    "subscription_level",
                    json!(self.subscription_level),
                    json!(level),
                ));
                self.subscription_level = level;
            }
        }
        if let Some(level) = patch.access_level {
            if level != self.access_level {
                changes.push(FieldChange::new(
                    "access_level",
                    json!(self.access_level),
                    json!(level),
                ));
                self.access_level = level;
            }
        }
        if let Some(status) = patch.status {
            if status != self.status {
                changes.push(FieldChange::new("status", json!(self.status), json!(status)));
                self.status = status;
            }
        }
        if patch.clear_expires_at {
            if self.expires_at.is_some() {
                changes.push(FieldChange::new(
                    "expires_at",
                    json!(self.expires_at),
                    json!(null),
                ));
                self.expires_at = None;
            }
        } else if let Some(at) = patch.expires_at {
            if self.expires_at != Some(at) {
                changes.push(FieldChange::new(
                    "expires_at",
                    json!(self.expires_at),
                    json!(at),
                ));
                self.expires_at = Some(at);
            }
        }
        if let Some(ref notes) = patch.notes {
            if self.notes.as_deref() != Some(notes.as_str()) {
                changes.push(FieldChange::new("notes", json!(self.notes), json!(notes)));
                self.notes = Some(notes.clone());
            }
        }
        if let Some(ref features) = patch.features_enabled {
            if &self.features_enabled != features {
                changes.push(FieldChange::new(
                    "features_enabled",
                    json!(self.features_enabled),
                    json!(features),
                ));
                self.features_enabled = features.clone();
            }
        }
        if let Some(ref limits) = patch.usage_limits {
            if &self.usage_limits != limits {
                changes.push(FieldChange::new(
                    "usage_limits",
                    json!(self.usage_limits),
                    json!(limits),
                ));
                self.usage_limits = limits.clone();
            }
        }
        if let Some(ref settings) = patch.notification_settings {
            if &self.notification_settings != settings {
                changes.push(FieldChange::new(
                    "notification_settings",
                    json!(self.notification_settings),
                    json!(settings),
                ));
                self.notification_settings = settings.clone();
            }
        }
        if let Some(auto) = patch.auto_renewal {
            if auto != self.auto_renewal {
                changes.push(FieldChange::new(
                    "auto_renewal",
                    json!(self.auto_renewal),
                    json!(auto),
                ));
                self.auto_renewal = auto;
            }
        }
        if let Some(period) = patch.renewal_period {
            if self.renewal_period != Some(period) {
                changes.push(FieldChange::new(
                    "renewal_period",
                    json!(self.renewal_period),
                    json!(period),
                ));
                self.renewal_period = Some(period);
            }
        }

        changes
    }
}

/// A single field change captured for audit metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub field: String,
    pub from: serde_json::Value,
    pub to: serde_json::Value,
}

impl FieldChange {
    pub fn new(field: &str, from: serde_json::Value, to: serde_json::Value) -> Self {
        Self {
            field: field.to_string(),
            from,
            to,
        }
    }
}

/// Access granted on a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Read,
    Write,
    Admin,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Admin => "admin",
        }
    }
}

impl std::str::FromStr for AccessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown access level: {other}")),
        }
    }
}

/// Subscription tier attached to a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionLevel {
    Basic,
    Premium,
    Enterprise,
    Trial,
    Custom,
}

impl SubscriptionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Premium => "premium",
            Self::Enterprise => "enterprise",
            Self::Trial => "trial",
            Self::Custom => "custom",
        }
    }

    /// Tiers counted as paid in the metrics rollup.
    pub fn is_premium_tier(&self) -> bool {
        matches!(self, Self::Premium | Self::Enterprise | Self::Custom)
    }
}

impl std::str::FromStr for SubscriptionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Self::Basic),
            "premium" => Ok(Self::Premium),
            "enterprise" => Ok(Self::Enterprise),
            "trial" => Ok(Self::Trial),
            "custom" => Ok(Self::Custom),
            other => Err(format!("unknown subscription level: {other}")),
        }
    }
}

/// Grant lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantStatus {
    Active,
    Inactive,
    Expired,
    Suspended,
}

impl GrantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Expired => "expired",
            Self::Suspended => "suspended",
        }
    }
}

impl std::str::FromStr for GrantStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "expired" => Ok(Self::Expired),
            "suspended" => Ok(Self::Suspended),
            other => Err(format!("unknown grant status: {other}")),
        }
    }
}

/// Auto-renewal cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenewalPeriod {
    Monthly,
    Quarterly,
    Yearly,
}

impl RenewalPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        }
    }
}

impl std::str::FromStr for RenewalPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "yearly" => Ok(Self::Yearly),
            other => Err(format!("unknown renewal period: {other}")),
        }
    }
}

/// Payload for creating a grant (single or bulk assign).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssignmentInput {
    pub account_id: Uuid,
    pub tool_id: Uuid,
    pub subscription_level: SubscriptionLevel,
    pub access_level: AccessLevel,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub features_enabled: HashMap<String, bool>,
    #[serde(default)]
    pub usage_limits: HashMap<String, i64>,
    #[serde(default)]
    pub notification_settings: HashMap<String, bool>,
    #[serde(default)]
    pub auto_renewal: bool,
    #[serde(default)]
    pub renewal_period: Option<RenewalPeriod>,
}

/// The trial rule spans two fields, so both creation payloads and merged
/// grants check it through the same function.
fn check_trial_window(
    level: SubscriptionLevel,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(), ValidationError> {
    if level != SubscriptionLevel::Trial {
        return Ok(());
    }
    match expires_at {
        None => {
            let mut err = ValidationError::new("trial_expiry_required");
            err.message = Some("trial subscriptions require an expiresAt date".into());
            Err(err)
        }
        Some(at) if at > now + Duration::days(TRIAL_MAX_DAYS) => {
            let mut err = ValidationError::new("trial_expiry_too_far");
            err.message = Some(
                format!("trial subscriptions may last at most {TRIAL_MAX_DAYS} days").into(),
            );
            Err(err)
        }
        _ => Ok(()),
    }
}

impl AssignmentInput {
    /// Validates the expiry rules against the given current time.
    ///
    /// - `expires_at`, when present, must be strictly in the future.
    /// - a trial subscription requires an expiry at most `TRIAL_MAX_DAYS` out.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if let Some(at) = self.expires_at {
            if at <= now {
                let mut err = ValidationError::new("expiry_past");
                err.message = Some("expiresAt must be in the future".into());
                return Err(err);
            }
        }
        check_trial_window(self.subscription_level, self.expires_at, now)
    }

    /// Materializes a new grant from this input.
    pub fn into_grant(self, now: DateTime<Utc>, actor: Option<Uuid>) -> Grant {
        Grant {
            account_id: self.account_id,
            tool_id: self.tool_id,
            access_level: self.access_level,
            subscription_level: self.subscription_level,
            status: GrantStatus::Active,
            expires_at: self.expires_at,
            granted_at: now,
            notes: self.notes,
            features_enabled: self.features_enabled,
            usage_limits: self.usage_limits,
            auto_renewal: self.auto_renewal,
            renewal_period: self.renewal_period,
            notification_settings: self.notification_settings,
            created_by: actor,
            updated_by: actor,
            updated_at: now,
        }
    }
}

/// Partial update for an existing grant. Fields left as `None` are not
/// changed; `clear_expires_at` removes the expiry outright.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssignmentPatch {
    #[serde(default)]
    pub subscription_level: Option<SubscriptionLevel>,
    #[serde(default)]
    pub access_level: Option<AccessLevel>,
    #[serde(default)]
    pub status: Option<GrantStatus>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub clear_expires_at: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub features_enabled: Option<HashMap<String, bool>>,
    #[serde(default)]
    pub usage_limits: Option<HashMap<String, i64>>,
    #[serde(default)]
    pub notification_settings: Option<HashMap<String, bool>>,
    #[serde(default)]
    pub auto_renewal: Option<bool>,
    #[serde(default)]
    pub renewal_period: Option<RenewalPeriod>,
}

impl AssignmentPatch {
    /// True when the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.subscription_level.is_none()
            && self.access_level.is_none()
            && self.status.is_none()
            && self.expires_at.is_none()
            && !self.clear_expires_at
            && self.notes.is_none()
            && self.features_enabled.is_none()
            && self.usage_limits.is_none()
            && self.notification_settings.is_none()
            && self.auto_renewal.is_none()
            && self.renewal_period.is_none()
    }

    /// Validates patch-level expiry rules. The trial rule is checked by the
    /// engine against the merged grant, since it needs the current state.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if self.clear_expires_at && self.expires_at.is_some() {
            let mut err = ValidationError::new("expiry_conflict");
            err.message =
                Some("expiresAt and clearExpiresAt cannot be combined".into());
            return Err(err);
        }
        if let Some(at) = self.expires_at {
            if at <= now {
                let mut err = ValidationError::new("expiry_past");
                err.message = Some("expiresAt must be in the future".into());
                return Err(err);
            }
        }
        Ok(())
    }
}
