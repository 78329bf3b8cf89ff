mod common;

use chrono::Duration;
use domain::models::{AccessLevel, AssignmentPatch, SubscriptionLevel};
use engine::EngineError;
use persistence::GrantStore;
use shared::clock::Clock;

use common::{assignment, client_account, harness, tool};

#[tokio::test]
async fn test_assign_creates_grant() {
    let h = harness();
    let account = client_account();
    let tool = tool("Credit Calculator", "credit-calculator");
    h.store.put_account(account.clone());
    h.store.put_tool(tool.clone());

    let grant = h
        .engine
        .assign_tool(h.actor, assignment(account.id, tool.id))
        .await
        .unwrap();

    assert_eq!(grant.account_id, account.id);
    assert_eq!(grant.tool_id, tool.id);
    assert_eq!(grant.created_by, Some(h.actor));
    assert_eq!(h.store.grant_count(), 1);
}

#[tokio::test]
async fn test_repeated_assign_is_idempotent_on_pair() {
    let h = harness();
    let account = client_account();
    let tool = tool("Credit Calculator", "credit-calculator");
    h.store.put_account(account.clone());
    h.store.put_tool(tool.clone());

    let first = h
        .engine
        .assign_tool(h.actor, assignment(account.id, tool.id))
        .await
        .unwrap();

    let mut second_input = assignment(account.id, tool.id);
    second_input.subscription_level = SubscriptionLevel::Premium;
    let second = h.engine.assign_tool(h.actor, second_input).await.unwrap();

    // still one grant for the pair; the payload was overwritten but the
    // original grant timestamp survives
    assert_eq!(h.store.grant_count(), 1);
    assert_eq!(second.subscription_level, SubscriptionLevel::Premium);
    assert_eq!(second.granted_at, first.granted_at);
}

#[tokio::test]
async fn test_assign_trial_without_expiry_is_rejected() {
    let h = harness();
    let account = client_account();
    let tool = tool("Credit Calculator", "credit-calculator");
    h.store.put_account(account.clone());
    h.store.put_tool(tool.clone());

    let mut input = assignment(account.id, tool.id);
    input.subscription_level = SubscriptionLevel::Trial;

    let err = h.engine.assign_tool(h.actor, input).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    // nothing was written
    assert_eq!(h.store.grant_count(), 0);
}

#[tokio::test]
async fn test_assign_past_expiry_is_rejected() {
    let h = harness();
    let account = client_account();
    let tool = tool("Credit Calculator", "credit-calculator");
    h.store.put_account(account.clone());
    h.store.put_tool(tool.clone());

    let mut input = assignment(account.id, tool.id);
    input.expires_at = Some(h.clock.now() - Duration::hours(1));

    let err = h.engine.assign_tool(h.actor, input).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn test_assign_unknown_account_is_not_found() {
    let h = harness();
    let tool = tool("Credit Calculator", "credit-calculator");
    h.store.put_tool(tool.clone());

    let err = h
        .engine
        .assign_tool(h.actor, assignment(uuid::Uuid::new_v4(), tool.id))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn test_update_patches_fields_and_records_audit() {
    let h = harness();
    let account = client_account();
    let tool = tool("Credit Calculator", "credit-calculator");
    h.store.put_account(account.clone());
    h.store.put_tool(tool.clone());
    h.engine
        .assign_tool(h.actor, assignment(account.id, tool.id))
        .await
        .unwrap();

    let patch = AssignmentPatch {
        access_level: Some(AccessLevel::Write),
        subscription_level: Some(SubscriptionLevel::Premium),
        ..Default::default()
    };
    let updated = h
        .engine
        .update_assignment(h.actor, account.id, tool.id, patch)
        .await
        .unwrap();

    assert_eq!(updated.access_level, AccessLevel::Write);
    assert_eq!(updated.subscription_level, SubscriptionLevel::Premium);
    assert_eq!(updated.updated_by, Some(h.actor));

    let records = h.sink.records();
    assert!(records
        .iter()
        .any(|r| r.metadata["action"] == "update_assignment"));
}

#[tokio::test]
async fn test_update_to_trial_requires_expiry_on_merged_grant() {
    let h = harness();
    let account = client_account();
    let tool = tool("Credit Calculator", "credit-calculator");
    h.store.put_account(account.clone());
    h.store.put_tool(tool.clone());
    h.engine
        .assign_tool(h.actor, assignment(account.id, tool.id))
        .await
        .unwrap();

    // the patch is valid in isolation; the merged grant is a trial with
    // no expiry
    let patch = AssignmentPatch {
        subscription_level: Some(SubscriptionLevel::Trial),
        ..Default::default()
    };
    let err = h
        .engine
        .update_assignment(h.actor, account.id, tool.id, patch)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let stored = h
        .store
        .find_grant(account.id, tool.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.subscription_level, SubscriptionLevel::Basic);
}

#[tokio::test]
async fn test_update_to_trial_with_expiry_in_window_succeeds() {
    let h = harness();
    let account = client_account();
    let tool = tool("Credit Calculator", "credit-calculator");
    h.store.put_account(account.clone());
    h.store.put_tool(tool.clone());
    h.engine
        .assign_tool(h.actor, assignment(account.id, tool.id))
        .await
        .unwrap();

    let patch = AssignmentPatch {
        subscription_level: Some(SubscriptionLevel::Trial),
        expires_at: Some(h.clock.now() + Duration::days(14)),
        ..Default::default()
    };
    let updated = h
        .engine
        .update_assignment(h.actor, account.id, tool.id, patch)
        .await
        .unwrap();
    assert_eq!(updated.subscription_level, SubscriptionLevel::Trial);
}

#[tokio::test]
async fn test_update_empty_patch_is_rejected() {
    let h = harness();
    let account = client_account();
    let tool = tool("Credit Calculator", "credit-calculator");
    h.store.put_account(account.clone());
    h.store.put_tool(tool.clone());
    h.engine
        .assign_tool(h.actor, assignment(account.id, tool.id))
        .await
        .unwrap();

    let err = h
        .engine
        .update_assignment(h.actor, account.id, tool.id, AssignmentPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn test_unassign_removes_grant() {
    let h = harness();
    let account = client_account();
    let tool = tool("Credit Calculator", "credit-calculator");
    h.store.put_account(account.clone());
    h.store.put_tool(tool.clone());
    h.engine
        .assign_tool(h.actor, assignment(account.id, tool.id))
        .await
        .unwrap();

    h.engine
        .unassign_tool(h.actor, account.id, tool.id)
        .await
        .unwrap();
    assert_eq!(h.store.grant_count(), 0);

    let err = h
        .engine
        .unassign_tool(h.actor, account.id, tool.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn test_expiring_assignments_sorted_and_windowed() {
    let h = harness();
    let tool = tool("Credit Calculator", "credit-calculator");
    h.store.put_tool(tool.clone());
    let now = h.clock.now();

    let mut grants = Vec::new();
    for days in [3i64, 1, 20] {
        let account = client_account();
        h.store.put_account(account.clone());
        let mut input = assignment(account.id, tool.id);
        input.expires_at = Some(now + Duration::days(days));
        grants.push(h.engine.assign_tool(h.actor, input).await.unwrap());
    }

    // default horizon is 7 days: the 20-day grant stays out
    let expiring = h
        .engine
        .get_expiring_assignments(h.actor, None)
        .await
        .unwrap();
    assert_eq!(expiring.len(), 2);
    assert!(expiring[0].expires_at <= expiring[1].expires_at);

    let wide = h
        .engine
        .get_expiring_assignments(h.actor, Some(30))
        .await
        .unwrap();
    assert_eq!(wide.len(), 3);
}

#[tokio::test]
async fn test_tool_metrics_aggregates() {
    let h = harness();
    let tool = tool("Credit Calculator", "credit-calculator");
    h.store.put_tool(tool.clone());
    let now = h.clock.now();

    for (level, expiry_days) in [
        (SubscriptionLevel::Basic, None),
        (SubscriptionLevel::Premium, Some(3i64)),
        (SubscriptionLevel::Premium, Some(90)),
    ] {
        let account = client_account();
        h.store.put_account(account.clone());
        let mut input = assignment(account.id, tool.id);
        input.subscription_level = level;
        input.expires_at = expiry_days.map(|d| now + Duration::days(d));
        h.engine.assign_tool(h.actor, input).await.unwrap();
    }

    let metrics = h.engine.get_tool_metrics(h.actor, tool.id).await.unwrap();
    assert_eq!(metrics.total_assignments, 3);
    assert_eq!(metrics.active, 3);
    assert_eq!(metrics.expired, 0);
    assert_eq!(metrics.expiring_soon, 1);
    assert_eq!(metrics.premium_plus, 2);
    assert_eq!(metrics.by_subscription_level["premium"], 2);
    assert_eq!(metrics.by_subscription_level["basic"], 1);
}

#[tokio::test]
async fn test_audit_failure_never_blocks_assignment() {
    // engine wired with a sink that always fails
    use domain::models::CreateActivityInput;
    use persistence::{ActivitySink, StoreError};

    struct FailingSink;

    #[async_trait::async_trait]
    impl ActivitySink for FailingSink {
        async fn record(&self, _input: &CreateActivityInput) -> Result<(), StoreError> {
            Err(StoreError::Database("sink down".into()))
        }
    }

    let store = std::sync::Arc::new(persistence::InMemoryGrantStore::new());
    let engine = engine::GrantEngine::new(
        store.clone(),
        std::sync::Arc::new(FailingSink),
        engine::EngineConfig::default(),
    );

    let account = client_account();
    let tool = tool("Credit Calculator", "credit-calculator");
    store.put_account(account.clone());
    store.put_tool(tool.clone());

    let actor = uuid::Uuid::new_v4();
    let grant = engine
        .assign_tool(actor, assignment(account.id, tool.id))
        .await
        .unwrap();
    assert_eq!(grant.account_id, account.id);
}
