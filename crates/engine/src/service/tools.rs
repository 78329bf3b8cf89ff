//! Tool lifecycle: create, update, delete, deactivate, duplicate.
//!
//! Lifecycle changes reshape the tool axis of every cached matrix, so they
//! flush the whole result cache instead of invalidating per entity.

use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use domain::models::{
    CreateActivityInput, GrantPredicate, GrantStatus, NewTool, TargetType, Tool, ToolPatch,
    ToolStatus,
};
use shared::validation::{validate_non_blank, validate_slug};

use crate::error::EngineError;
use crate::rate_limit::RateLimitOperation;

use super::GrantEngine;

impl GrantEngine {
    /// Registers a new tool. The slug must be unique across all tools.
    pub async fn create_tool(&self, actor: Uuid, input: NewTool) -> Result<Tool, EngineError> {
        self.check_rate(actor, RateLimitOperation::Create)?;
        input.validate()?;
        if self.store.find_tool_by_slug(&input.slug).await?.is_some() {
            return Err(EngineError::conflict(format!(
                "tool slug '{}' is already in use",
                input.slug
            )));
        }

        let now = self.clock.now();
        let tool = input.into_tool(Uuid::new_v4(), now);
        self.store.insert_tool(&tool).await?;

        tracing::info!(tool_id = %tool.id, slug = %tool.slug, "tool created");
        self.record_activity(
            CreateActivityInput::system_action(TargetType::Tool, tool.id.to_string())
                .with_description(format!("Tool created: {}", tool.name))
                .with_metadata(json!({ "action": "create_tool", "actor": actor, "slug": tool.slug })),
        )
        .await;
        self.cache.invalidate_all();
        Ok(tool)
    }

    /// Applies a partial update to a tool. The slug is immutable.
    pub async fn update_tool(
        &self,
        actor: Uuid,
        tool_id: Uuid,
        patch: ToolPatch,
    ) -> Result<Tool, EngineError> {
        self.check_rate(actor, RateLimitOperation::Update)?;
        patch.validate()?;

        let mut tool = self
            .store
            .find_tool(tool_id)
            .await?
            .ok_or_else(|| EngineError::not_found("tool"))?;
        let changed = patch.apply_to(&mut tool);
        if changed.is_empty() {
            return Err(EngineError::validation("no changes supplied"));
        }
        tool.updated_at = self.clock.now();
        self.store.update_tool(&tool).await?;

        tracing::info!(%tool_id, fields = ?changed, "tool updated");
        self.record_activity(
            CreateActivityInput::system_action(TargetType::Tool, tool_id.to_string())
                .with_description(format!("Tool updated: {}", tool.name))
                .with_metadata(json!({ "action": "update_tool", "actor": actor, "fields": changed })),
        )
        .await;
        self.cache.invalidate_all();
        Ok(tool)
    }

    /// Permanently removes a tool. Refused while active assignments exist;
    /// deactivate instead to keep history.
    pub async fn delete_tool(&self, actor: Uuid, tool_id: Uuid) -> Result<(), EngineError> {
        self.check_rate(actor, RateLimitOperation::Delete)?;
        let tool = self
            .store
            .find_tool(tool_id)
            .await?
            .ok_or_else(|| EngineError::not_found("tool"))?;

        let active = self
            .store
            .list_grants(&GrantPredicate {
                tool_id: Some(tool_id),
                status: Some(GrantStatus::Active),
                ..Default::default()
            })
            .await?;
        if !active.is_empty() {
            return Err(EngineError::conflict(format!(
                "tool has {} active assignments; deactivate it instead",
                active.len()
            )));
        }
        self.store.delete_tool(tool_id).await?;

        tracing::info!(%tool_id, slug = %tool.slug, "tool deleted");
        self.record_activity(
            CreateActivityInput::system_action(TargetType::Tool, tool_id.to_string())
                .with_description(format!("Tool deleted: {}", tool.name))
                .with_metadata(json!({ "action": "delete_tool", "actor": actor })),
        )
        .await;
        self.cache.invalidate_all();
        Ok(())
    }

    /// Deactivates a tool and cascades to its active assignments. Calling
    /// this on an already-inactive tool is a no-op.
    pub async fn deactivate_tool(&self, actor: Uuid, tool_id: Uuid) -> Result<Tool, EngineError> {
        self.check_rate(actor, RateLimitOperation::Update)?;
        let mut tool = self
            .store
            .find_tool(tool_id)
            .await?
            .ok_or_else(|| EngineError::not_found("tool"))?;
        if tool.status == ToolStatus::Inactive {
            return Ok(tool);
        }

        let now = self.clock.now();
        tool.status = ToolStatus::Inactive;
        tool.updated_at = now;
        self.store.update_tool(&tool).await?;

        let active = self
            .store
            .list_grants(&GrantPredicate {
                tool_id: Some(tool_id),
                status: Some(GrantStatus::Active),
                ..Default::default()
            })
            .await?;
        let cascaded = active.len();
        for mut grant in active {
            grant.status = GrantStatus::Inactive;
            grant.updated_by = Some(actor);
            grant.updated_at = now;
            self.store.update_grant(&grant).await?;
        }

        tracing::info!(%tool_id, cascaded, "tool deactivated");
        self.record_activity(
            CreateActivityInput::system_action(TargetType::Tool, tool_id.to_string())
                .with_description(format!("Tool deactivated: {}", tool.name))
                .with_metadata(
                    json!({ "action": "deactivate_tool", "actor": actor, "cascaded": cascaded }),
                ),
        )
        .await;
        self.cache.invalidate_all();
        Ok(tool)
    }

    /// Creates a copy of a tool under a new name and slug. The copy starts
    /// inactive and carries no assignments.
    pub async fn duplicate_tool(
        &self,
        actor: Uuid,
        tool_id: Uuid,
        name: String,
        slug: String,
    ) -> Result<Tool, EngineError> {
        self.check_rate(actor, RateLimitOperation::Create)?;
        validate_non_blank(&name)?;
        validate_slug(&slug)?;

        let source = self
            .store
            .find_tool(tool_id)
            .await?
            .ok_or_else(|| EngineError::not_found("tool"))?;
        if self.store.find_tool_by_slug(&slug).await?.is_some() {
            return Err(EngineError::conflict(format!(
                "tool slug '{slug}' is already in use"
            )));
        }

        let now = self.clock.now();
        let mut copy = source.clone();
        copy.id = Uuid::new_v4();
        copy.name = name;
        copy.slug = slug;
        copy.status = ToolStatus::Inactive;
        copy.created_at = now;
        copy.updated_at = now;
        self.store.insert_tool(&copy).await?;

        tracing::info!(source = %tool_id, copy = %copy.id, "tool duplicated");
        self.record_activity(
            CreateActivityInput::system_action(TargetType::Tool, copy.id.to_string())
                .with_description(format!("Tool duplicated from {}", source.name))
                .with_metadata(json!({ "action": "duplicate_tool", "actor": actor, "source": tool_id })),
        )
        .await;
        Ok(copy)
    }
}
