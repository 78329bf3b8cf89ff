#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use fake::faker::company::en::CompanyName;
use fake::Fake;
use uuid::Uuid;

use domain::models::{
    AccessLevel, Account, AccountStatus, AccountType, AssignmentInput, PricingTier,
    SubscriptionLevel, Tool, ToolPricing, ToolStatus,
};
use engine::{EngineConfig, GrantEngine};
use persistence::{ActivitySink, GrantStore, InMemoryGrantStore, RecordingActivitySink};
use shared::clock::ManualClock;

pub struct Harness {
    pub engine: GrantEngine,
    pub store: Arc<InMemoryGrantStore>,
    pub sink: Arc<RecordingActivitySink>,
    pub clock: Arc<ManualClock>,
    pub actor: Uuid,
}

pub fn harness() -> Harness {
    harness_with(EngineConfig::default())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn harness_with(config: EngineConfig) -> Harness {
    init_tracing();
    let store = Arc::new(InMemoryGrantStore::new());
    let sink = Arc::new(RecordingActivitySink::new());
    let clock = Arc::new(ManualClock::from_system());
    let engine = GrantEngine::with_clock(
        Arc::clone(&store) as Arc<dyn GrantStore>,
        Arc::clone(&sink) as Arc<dyn ActivitySink>,
        config,
        clock.clone(),
    );
    Harness {
        engine,
        store,
        sink,
        clock,
        actor: Uuid::new_v4(),
    }
}

pub fn account(name: &str, account_type: AccountType) -> Account {
    Account {
        id: Uuid::new_v4(),
        name: name.to_string(),
        account_type,
        status: AccountStatus::Active,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn client_account() -> Account {
    let name: String = CompanyName().fake();
    account(&name, AccountType::Client)
}

pub fn pricing() -> ToolPricing {
    ToolPricing {
        basic: PricingTier {
            price: 49.0,
            features: vec!["reports".into()],
            limits: HashMap::from([("reports_per_month".into(), 10)]),
        },
        premium: PricingTier {
            price: 149.0,
            features: vec!["reports".into(), "exports".into()],
            limits: HashMap::from([("reports_per_month".into(), 100)]),
        },
        enterprise: PricingTier {
            price: 499.0,
            features: vec!["reports".into(), "exports".into(), "api".into()],
            limits: HashMap::new(),
        },
    }
}

pub fn tool(name: &str, slug: &str) -> Tool {
    Tool {
        id: Uuid::new_v4(),
        name: name.to_string(),
        slug: slug.to_string(),
        category: "calculation".to_string(),
        description: format!("{name} for R&D credit work"),
        status: ToolStatus::Active,
        version: "1.0.0".to_string(),
        features: vec![],
        pricing: pricing(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn assignment(account_id: Uuid, tool_id: Uuid) -> AssignmentInput {
    AssignmentInput {
        account_id,
        tool_id,
        subscription_level: SubscriptionLevel::Basic,
        access_level: AccessLevel::Read,
        expires_at: None,
        notes: None,
        features_enabled: HashMap::new(),
        usage_limits: HashMap::new(),
        notification_settings: HashMap::new(),
        auto_renewal: false,
        renewal_period: None,
    }
}
