//! Single-assignment operations and assignment reports.

use chrono::Duration;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

use domain::models::{
    AssignmentInput, AssignmentPatch, CreateActivityInput, ExpirationStatus, ExpirationWindow,
    Grant, GrantPredicate, TargetType,
};

use crate::error::EngineError;
use crate::rate_limit::RateLimitOperation;

use super::GrantEngine;

/// Usage summary for one tool across all accounts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolMetrics {
    pub tool_id: Uuid,
    pub total_assignments: u64,
    pub active: u64,
    pub expired: u64,
    pub expiring_soon: u64,
    /// Premium, enterprise, and custom subscriptions combined.
    pub premium_plus: u64,
    pub by_subscription_level: HashMap<String, u64>,
    pub by_access_level: HashMap<String, u64>,
}

impl GrantEngine {
    /// Grants an account access to a tool.
    ///
    /// An existing `(account, tool)` pair is overwritten with the new
    /// payload instead of producing a duplicate, so repeated assigns are
    /// idempotent. The original `granted_at` and `created_by` survive the
    /// overwrite.
    pub async fn assign_tool(
        &self,
        actor: Uuid,
        input: AssignmentInput,
    ) -> Result<Grant, EngineError> {
        self.check_rate(actor, RateLimitOperation::Create)?;
        let now = self.clock.now();
        input.validate(now)?;

        let account = self
            .store
            .find_account(input.account_id)
            .await?
            .ok_or_else(|| EngineError::not_found("account"))?;
        let tool = self
            .store
            .find_tool(input.tool_id)
            .await?
            .ok_or_else(|| EngineError::not_found("tool"))?;

        let existing = self.store.find_grant(input.account_id, input.tool_id).await?;
        let mut grant = input.into_grant(now, Some(actor));
        let grant = match existing {
            Some(previous) => {
                grant.granted_at = previous.granted_at;
                grant.created_by = previous.created_by;
                self.store.update_grant(&grant).await?;
                grant
            }
            None => {
                self.store.insert_grant(&grant).await?;
                grant
            }
        };

        tracing::info!(
            account_id = %grant.account_id,
            tool_id = %grant.tool_id,
            subscription_level = grant.subscription_level.as_str(),
            "tool assigned"
        );
        self.record_activity(
            CreateActivityInput::admin_action(
                grant.account_id,
                TargetType::Tool,
                grant.tool_id.to_string(),
            )
            .with_description(format!("Tool access granted: {}", tool.name))
            .with_metadata(json!({
                "action": "assign_tool",
                "actor": actor,
                "account": account.name,
                "subscriptionLevel": grant.subscription_level.as_str(),
                "accessLevel": grant.access_level.as_str(),
            })),
        )
        .await;
        self.invalidate_pair(grant.account_id, grant.tool_id);
        Ok(grant)
    }

    /// Applies a partial update to an existing assignment.
    pub async fn update_assignment(
        &self,
        actor: Uuid,
        account_id: Uuid,
        tool_id: Uuid,
        patch: AssignmentPatch,
    ) -> Result<Grant, EngineError> {
        self.check_rate(actor, RateLimitOperation::Update)?;
        if patch.is_empty() {
            return Err(EngineError::validation("no changes supplied"));
        }
        let now = self.clock.now();
        patch.validate(now)?;

        let mut grant = self
            .store
            .find_grant(account_id, tool_id)
            .await?
            .ok_or_else(|| EngineError::not_found("assignment"))?;
        let changes = grant.apply_patch(&patch);
        if changes.is_empty() {
            // nothing actually differed; skip the write and the audit noise
            return Ok(grant);
        }
        grant.validate_trial(now)?;
        grant.updated_by = Some(actor);
        grant.updated_at = now;
        self.store.update_grant(&grant).await?;

        self.record_activity(
            CreateActivityInput::admin_action(account_id, TargetType::Grant, tool_id.to_string())
                .with_description("Tool assignment updated".to_string())
                .with_metadata(json!({
                    "action": "update_assignment",
                    "actor": actor,
                    "changes": changes,
                })),
        )
        .await;
        self.invalidate_pair(account_id, tool_id);
        Ok(grant)
    }

    /// Revokes an assignment.
    pub async fn unassign_tool(
        &self,
        actor: Uuid,
        account_id: Uuid,
        tool_id: Uuid,
    ) -> Result<(), EngineError> {
        self.check_rate(actor, RateLimitOperation::Delete)?;
        match self.store.delete_grant(account_id, tool_id).await {
            Ok(()) => {}
            Err(persistence::StoreError::NotFound) => {
                return Err(EngineError::not_found("assignment"))
            }
            Err(err) => return Err(err.into()),
        }

        tracing::info!(%account_id, %tool_id, "tool unassigned");
        self.record_activity(
            CreateActivityInput::admin_action(account_id, TargetType::Tool, tool_id.to_string())
                .with_description("Tool access revoked".to_string())
                .with_metadata(json!({ "action": "unassign_tool", "actor": actor })),
        )
        .await;
        self.invalidate_pair(account_id, tool_id);
        Ok(())
    }

    /// Lists grants whose expiry falls within the given horizon (defaults
    /// to the configured one). Already-expired grants are excluded.
    pub async fn get_expiring_assignments(
        &self,
        actor: Uuid,
        within_days: Option<u32>,
    ) -> Result<Vec<Grant>, EngineError> {
        self.check_rate(actor, RateLimitOperation::List)?;
        let now = self.clock.now();
        let horizon = within_days
            .map(|days| Duration::days(days as i64))
            .unwrap_or_else(|| self.config.expiring_horizon());

        let predicate = GrantPredicate {
            expiration: Some(ExpirationWindow {
                bucket: ExpirationStatus::ExpiresSoon,
                now,
                horizon,
            }),
            ..Default::default()
        };
        let mut grants = self.store.list_grants(&predicate).await?;
        grants.sort_by_key(|grant| grant.expires_at);
        Ok(grants)
    }

    /// Aggregates assignment counts for one tool.
    pub async fn get_tool_metrics(
        &self,
        actor: Uuid,
        tool_id: Uuid,
    ) -> Result<ToolMetrics, EngineError> {
        self.check_rate(actor, RateLimitOperation::List)?;
        self.store
            .find_tool(tool_id)
            .await?
            .ok_or_else(|| EngineError::not_found("tool"))?;

        let now = self.clock.now();
        let horizon = self.config.expiring_horizon();
        let predicate = GrantPredicate {
            tool_id: Some(tool_id),
            ..Default::default()
        };
        let grants = self.store.list_grants(&predicate).await?;

        let mut metrics = ToolMetrics {
            tool_id,
            total_assignments: grants.len() as u64,
            active: 0,
            expired: 0,
            expiring_soon: 0,
            premium_plus: 0,
            by_subscription_level: HashMap::new(),
            by_access_level: HashMap::new(),
        };
        for grant in &grants {
            if grant.is_expired(now) {
                metrics.expired += 1;
            } else {
                metrics.active += 1;
                if grant.expires_soon(now, horizon) {
                    metrics.expiring_soon += 1;
                }
            }
            if grant.subscription_level.is_premium_tier() {
                metrics.premium_plus += 1;
            }
            *metrics
                .by_subscription_level
                .entry(grant.subscription_level.as_str().to_string())
                .or_insert(0) += 1;
            *metrics
                .by_access_level
                .entry(grant.access_level.as_str().to_string())
                .or_insert(0) += 1;
        }
        Ok(metrics)
    }
}
