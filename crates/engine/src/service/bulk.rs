//! Bulk operations with per-item failure isolation.
//!
//! Items run in fixed-size concurrent batches; batch N+1 starts only after
//! every item of batch N has settled. One item's failure never aborts its
//! siblings, and there is no rollback: the aggregated result reports
//! exactly which items failed and why.

use futures::future::join_all;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use domain::models::{
    AssignmentInput, AssignmentPatch, BulkAssignRequest, BulkItemError, BulkOperationKind,
    BulkOperationResult, BulkUpdateRequest, CreateActivityInput, GrantStatus,
};

use crate::error::EngineError;
use crate::rate_limit::RateLimitOperation;

use super::GrantEngine;

impl GrantEngine {
    /// Runs a bulk assign, sync, or verify over per-item grant payloads.
    ///
    /// Only a malformed top-level request (wrong item count, kind
    /// `Update`) fails the whole call; everything per-item, including
    /// payload validation, is captured as that item's error entry.
    pub async fn bulk_assign(
        &self,
        actor: Uuid,
        kind: BulkOperationKind,
        request: BulkAssignRequest,
    ) -> Result<BulkOperationResult, EngineError> {
        self.check_rate(actor, RateLimitOperation::Bulk)?;
        if kind == BulkOperationKind::Update {
            return Err(EngineError::validation(
                "bulk update takes account ids and a patch, not grant payloads",
            ));
        }
        request.validate()?;

        let operation_id = Uuid::new_v4();
        tracing::info!(
            %operation_id,
            kind = kind.as_str(),
            items = request.items.len(),
            "bulk operation started"
        );

        let mut outcomes = Vec::with_capacity(request.items.len());
        for batch in request.items.chunks(self.config.bulk.batch_size) {
            let settled = join_all(
                batch
                    .iter()
                    .map(|item| self.run_bulk_item(actor, kind, item)),
            )
            .await;
            outcomes.extend(settled);
        }
        let result = BulkOperationResult::from_outcomes(operation_id, outcomes);

        tracing::info!(
            %operation_id,
            processed = result.processed,
            failed = result.failed,
            "bulk operation finished"
        );
        // the sink schema takes one subject, so the record attaches to the
        // first item's account
        let subject = request.items.first().map(|item| item.account_id);
        self.record_activity(
            CreateActivityInput::bulk_operation(subject, operation_id)
                .with_description(format!(
                    "Bulk {} of {} tool assignments",
                    kind,
                    request.items.len()
                ))
                .with_metadata(json!({
                    "actor": actor,
                    "kind": kind.as_str(),
                    "processed": result.processed,
                    "failed": result.failed,
                })),
        )
        .await;

        if kind != BulkOperationKind::Verify {
            // every touched entity leaves the cache, failed items included;
            // a failed item may still have observed partial sibling state
            for item in &request.items {
                self.invalidate_pair(item.account_id, item.tool_id);
            }
        }
        Ok(result)
    }

    /// Applies one patch to many `(account, tool)` pairs for a single tool.
    pub async fn bulk_update(
        &self,
        actor: Uuid,
        request: BulkUpdateRequest,
    ) -> Result<BulkOperationResult, EngineError> {
        self.check_rate(actor, RateLimitOperation::Bulk)?;
        request.validate()?;
        if request.changes.is_empty() {
            return Err(EngineError::validation("no changes supplied"));
        }
        let now = self.clock.now();
        request.changes.validate(now)?;
        // a missing tool fails the whole call before any item runs
        self.store
            .find_tool(request.tool_id)
            .await?
            .ok_or_else(|| EngineError::not_found("tool"))?;

        let operation_id = Uuid::new_v4();
        tracing::info!(
            %operation_id,
            tool_id = %request.tool_id,
            accounts = request.account_ids.len(),
            "bulk update started"
        );

        let mut outcomes = Vec::with_capacity(request.account_ids.len());
        for batch in request.account_ids.chunks(self.config.bulk.batch_size) {
            let settled = join_all(batch.iter().map(|account_id| {
                self.run_bulk_patch(actor, *account_id, request.tool_id, &request.changes)
            }))
            .await;
            outcomes.extend(settled);
        }
        let result = BulkOperationResult::from_outcomes(operation_id, outcomes);

        tracing::info!(
            %operation_id,
            processed = result.processed,
            failed = result.failed,
            "bulk update finished"
        );
        let subject = request.account_ids.first().copied();
        self.record_activity(
            CreateActivityInput::bulk_operation(subject, operation_id)
                .with_description(format!(
                    "Bulk update of {} assignments",
                    request.account_ids.len()
                ))
                .with_metadata(json!({
                    "actor": actor,
                    "toolId": request.tool_id,
                    "processed": result.processed,
                    "failed": result.failed,
                })),
        )
        .await;

        self.invalidate_grants(request.tool_id, &request.account_ids);
        Ok(result)
    }

    async fn run_bulk_item(
        &self,
        actor: Uuid,
        kind: BulkOperationKind,
        item: &AssignmentInput,
    ) -> Result<(), BulkItemError> {
        self.apply_bulk_item(actor, kind, item)
            .await
            .map_err(|err| BulkItemError {
                account_id: item.account_id,
                tool_id: Some(item.tool_id),
                error: err.to_string(),
            })
    }

    async fn apply_bulk_item(
        &self,
        actor: Uuid,
        kind: BulkOperationKind,
        item: &AssignmentInput,
    ) -> Result<(), EngineError> {
        let now = self.clock.now();
        item.validate(now)?;

        match kind {
            BulkOperationKind::Assign | BulkOperationKind::Sync => {
                self.timed(self.store.find_account(item.account_id))
                    .await?
                    .ok_or_else(|| EngineError::not_found("account"))?;
                self.timed(self.store.find_tool(item.tool_id))
                    .await?
                    .ok_or_else(|| EngineError::not_found("tool"))?;

                let existing = self
                    .timed(self.store.find_grant(item.account_id, item.tool_id))
                    .await?;
                let mut grant = item.clone().into_grant(now, Some(actor));
                match existing {
                    Some(previous) => {
                        grant.granted_at = previous.granted_at;
                        grant.created_by = previous.created_by;
                        self.timed(self.store.update_grant(&grant)).await?;
                    }
                    None => {
                        self.timed(self.store.insert_grant(&grant)).await?;
                    }
                }
            }
            BulkOperationKind::Verify => {
                let grant = self
                    .timed(self.store.find_grant(item.account_id, item.tool_id))
                    .await?
                    .ok_or_else(|| EngineError::not_found("assignment"))?;
                if grant.status != GrantStatus::Active {
                    return Err(EngineError::conflict(format!(
                        "assignment is {}",
                        grant.status.as_str()
                    )));
                }
                if grant.is_expired(now) {
                    return Err(EngineError::conflict("assignment is expired"));
                }
            }
            BulkOperationKind::Update => {
                // rejected at the top of bulk_assign
                return Err(EngineError::validation("unsupported bulk kind"));
            }
        }
        Ok(())
    }

    async fn run_bulk_patch(
        &self,
        actor: Uuid,
        account_id: Uuid,
        tool_id: Uuid,
        patch: &AssignmentPatch,
    ) -> Result<(), BulkItemError> {
        self.apply_bulk_patch(actor, account_id, tool_id, patch)
            .await
            .map_err(|err| BulkItemError {
                account_id,
                tool_id: Some(tool_id),
                error: err.to_string(),
            })
    }

    async fn apply_bulk_patch(
        &self,
        actor: Uuid,
        account_id: Uuid,
        tool_id: Uuid,
        patch: &AssignmentPatch,
    ) -> Result<(), EngineError> {
        let now = self.clock.now();
        let mut grant = self
            .timed(self.store.find_grant(account_id, tool_id))
            .await?
            .ok_or_else(|| EngineError::not_found("assignment"))?;
        grant.apply_patch(patch);
        grant.validate_trial(now)?;
        grant.updated_by = Some(actor);
        grant.updated_at = now;
        self.timed(self.store.update_grant(&grant)).await?;
        Ok(())
    }
}
