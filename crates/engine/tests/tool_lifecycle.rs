mod common;

use domain::models::{GrantStatus, MatrixFilters, NewTool, ToolPatch, ToolStatus};
use engine::EngineError;
use persistence::GrantStore;
use uuid::Uuid;

use common::{assignment, client_account, harness, pricing, tool};

fn new_tool(name: &str, slug: &str) -> NewTool {
    NewTool {
        name: name.to_string(),
        slug: slug.to_string(),
        category: "calculation".to_string(),
        description: format!("{name} for R&D credit work"),
        status: ToolStatus::Active,
        version: "1.0.0".to_string(),
        features: vec![],
        pricing: pricing(),
    }
}

#[tokio::test]
async fn test_create_tool_and_slug_conflict() {
    let h = harness();

    let created = h
        .engine
        .create_tool(h.actor, new_tool("Credit Calculator", "credit-calculator"))
        .await
        .unwrap();
    assert_eq!(created.slug, "credit-calculator");

    let err = h
        .engine
        .create_tool(h.actor, new_tool("Other Name", "credit-calculator"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[tokio::test]
async fn test_create_tool_rejects_bad_slug_and_version() {
    let h = harness();

    let mut input = new_tool("Credit Calculator", "Bad Slug");
    let err = h.engine.create_tool(h.actor, input).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    input = new_tool("Credit Calculator", "credit-calculator");
    input.version = "v1".to_string();
    let err = h.engine.create_tool(h.actor, input).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn test_update_tool_patches_fields() {
    let h = harness();
    let t = tool("Credit Calculator", "credit-calculator");
    h.store.put_tool(t.clone());

    let patch = ToolPatch {
        description: Some("Updated description".to_string()),
        version: Some("1.1.0".to_string()),
        ..Default::default()
    };
    let updated = h.engine.update_tool(h.actor, t.id, patch).await.unwrap();
    assert_eq!(updated.description, "Updated description");
    assert_eq!(updated.version, "1.1.0");
    // slug is immutable by construction
    assert_eq!(updated.slug, "credit-calculator");

    let err = h
        .engine
        .update_tool(h.actor, t.id, ToolPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn test_delete_tool_refused_with_active_grants() {
    let h = harness();
    let t = tool("Credit Calculator", "credit-calculator");
    h.store.put_tool(t.clone());
    let acct = client_account();
    h.store.put_account(acct.clone());
    h.engine
        .assign_tool(h.actor, assignment(acct.id, t.id))
        .await
        .unwrap();

    let err = h.engine.delete_tool(h.actor, t.id).await.unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    // once the grant is gone the delete goes through
    h.engine
        .unassign_tool(h.actor, acct.id, t.id)
        .await
        .unwrap();
    h.engine.delete_tool(h.actor, t.id).await.unwrap();
    assert!(h.store.find_tool(t.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_missing_tool_is_not_found() {
    let h = harness();
    let err = h
        .engine
        .delete_tool(h.actor, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn test_deactivate_cascades_to_grants() {
    let h = harness();
    let t = tool("Credit Calculator", "credit-calculator");
    h.store.put_tool(t.clone());
    let acct = client_account();
    h.store.put_account(acct.clone());
    h.engine
        .assign_tool(h.actor, assignment(acct.id, t.id))
        .await
        .unwrap();

    let deactivated = h.engine.deactivate_tool(h.actor, t.id).await.unwrap();
    assert_eq!(deactivated.status, ToolStatus::Inactive);

    let grant = h.store.find_grant(acct.id, t.id).await.unwrap().unwrap();
    assert_eq!(grant.status, GrantStatus::Inactive);
    assert_eq!(grant.updated_by, Some(h.actor));

    // repeat call is a no-op
    let again = h.engine.deactivate_tool(h.actor, t.id).await.unwrap();
    assert_eq!(again.status, ToolStatus::Inactive);
}

#[tokio::test]
async fn test_deactivated_tool_leaves_active_columns() {
    let h = harness();
    let keep = tool("Credit Calculator", "credit-calculator");
    let retired = tool("Legacy Tool", "legacy-tool");
    h.store.put_tool(keep.clone());
    h.store.put_tool(retired.clone());

    h.engine.deactivate_tool(h.actor, retired.id).await.unwrap();

    let matrix = h
        .engine
        .build_matrix(h.actor, MatrixFilters::default())
        .await
        .unwrap();
    // no grants reference the deactivated tool, so its column disappears
    assert_eq!(matrix.tools.len(), 1);
    assert_eq!(matrix.tools[0].id, keep.id);
}

#[tokio::test]
async fn test_duplicate_tool_copies_config_inactive() {
    let h = harness();
    let t = tool("Credit Calculator", "credit-calculator");
    h.store.put_tool(t.clone());

    let copy = h
        .engine
        .duplicate_tool(
            h.actor,
            t.id,
            "Credit Calculator EU".to_string(),
            "credit-calculator-eu".to_string(),
        )
        .await
        .unwrap();

    assert_ne!(copy.id, t.id);
    assert_eq!(copy.name, "Credit Calculator EU");
    assert_eq!(copy.slug, "credit-calculator-eu");
    assert_eq!(copy.status, ToolStatus::Inactive);
    assert_eq!(copy.pricing, t.pricing);
    assert_eq!(copy.category, t.category);

    let err = h
        .engine
        .duplicate_tool(
            h.actor,
            t.id,
            "Another".to_string(),
            "credit-calculator".to_string(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[tokio::test]
async fn test_tool_lifecycle_flushes_matrix_cache() {
    let h = harness();
    let t = tool("Credit Calculator", "credit-calculator");
    h.store.put_tool(t.clone());
    let acct = client_account();
    h.store.put_account(acct.clone());
    h.engine
        .assign_tool(h.actor, assignment(acct.id, t.id))
        .await
        .unwrap();

    h.engine
        .build_matrix(h.actor, MatrixFilters::default())
        .await
        .unwrap();

    // a new active tool reshapes the column set of every cached page
    h.engine
        .create_tool(h.actor, new_tool("Study Builder", "study-builder"))
        .await
        .unwrap();

    let fresh = h
        .engine
        .build_matrix(h.actor, MatrixFilters::default())
        .await
        .unwrap();
    assert!(!fresh.from_cache);
    assert_eq!(fresh.tools.len(), 2);
}
