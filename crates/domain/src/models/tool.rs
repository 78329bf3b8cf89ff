//! Tool model and tool CRUD payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use shared::validation::{validate_non_blank, validate_semver, validate_slug};

/// Assignable product module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub id: Uuid,
    pub name: String,
    /// Unique, immutable after creation.
    pub slug: String,
    pub category: String,
    pub description: String,
    pub status: ToolStatus,
    pub version: String,
    pub features: Vec<ToolFeature>,
    pub pricing: ToolPricing,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Tool lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Active,
    Inactive,
    Beta,
    Deprecated,
}

impl ToolStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Beta => "beta",
            Self::Deprecated => "deprecated",
        }
    }
}

impl std::str::FromStr for ToolStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "beta" => Ok(Self::Beta),
            "deprecated" => Ok(Self::Deprecated),
            other => Err(format!("unknown tool status: {other}")),
        }
    }
}

/// Feature toggle exposed by a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ToolFeature {
    #[validate(custom(function = "validate_non_blank"))]
    pub id: String,
    #[validate(custom(function = "validate_non_blank"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub subscription_levels: Vec<super::SubscriptionLevel>,
}

/// Pricing configuration. All three tiers are required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolPricing {
    pub basic: PricingTier,
    pub premium: PricingTier,
    pub enterprise: PricingTier,
}

/// Price point and limits of a single tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingTier {
    pub price: f64,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub limits: HashMap<String, i64>,
}

/// Payload for creating a tool.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewTool {
    #[validate(custom(function = "validate_non_blank"))]
    pub name: String,
    #[validate(custom(function = "validate_slug"))]
    pub slug: String,
    #[validate(custom(function = "validate_non_blank"))]
    pub category: String,
    #[validate(custom(function = "validate_non_blank"))]
    pub description: String,
    pub status: ToolStatus,
    #[validate(custom(function = "validate_semver"))]
    pub version: String,
    #[serde(default)]
    #[validate(nested)]
    pub features: Vec<ToolFeature>,
    pub pricing: ToolPricing,
}

impl NewTool {
    /// Materializes a tool from this payload.
    pub fn into_tool(self, id: Uuid, now: DateTime<Utc>) -> Tool {
        Tool {
            id,
            name: self.name,
            slug: self.slug,
            category: self.category,
            description: self.description,
            status: self.status,
            version: self.version,
            features: self.features,
            pricing: self.pricing,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for a tool. The slug is immutable and deliberately
/// absent here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ToolPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<ToolStatus>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub features: Option<Vec<ToolFeature>>,
    #[serde(default)]
    pub pricing: Option<ToolPricing>,
}

impl ToolPatch {
    /// Validates the populated fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(ref name) = self.name {
            validate_non_blank(name)?;
        }
        if let Some(ref category) = self.category {
            validate_non_blank(category)?;
        }
        if let Some(ref description) = self.description {
            validate_non_blank(description)?;
        }
        if let Some(ref version) = self.version {
            validate_semver(version)?;
        }
        Ok(())
    }

    /// Applies the patch in place, returning the names of changed fields.
    pub fn apply_to(&self, tool: &mut Tool) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if let Some(ref name) = self.name {
            if &tool.name != name {
                tool.name = name.clone();
                changed.push("name");
            }
        }
        if let Some(ref category) = self.category {
            if &tool.category != category {
                tool.category = category.clone();
                changed.push("category");
            }
        }
        if let Some(ref description) = self.description {
            if &tool.description != description {
                tool.description = description.clone();
                changed.push("description");
            }
        }
        if let Some(status) = self.status {
            if tool.status != status {
                tool.status = status;
                changed.push("status");
            }
        }
        if let Some(ref version) = self.version {
            if &tool.version != version {
                tool.version = version.clone();
                changed.push("version");
            }
        }
        if let Some(ref features) = self.features {
            if &tool.features != features {
                tool.features = features.clone();
                changed.push("features");
            }
        }
        if let Some(ref pricing) = self.pricing {
            if &tool.pricing != pricing {
                tool.pricing = pricing.clone();
                changed.push("pricing");
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_pricing() -> ToolPricing {
        ToolPricing {
            basic: PricingTier {
                price: 49.0,
                features: vec!["core".into()],
                limits: HashMap::from([("reports_per_month".into(), 10)]),
            },
            premium: PricingTier {
                price: 149.0,
                features: vec!["core".into(), "exports".into()],
                limits: HashMap::from([("reports_per_month".into(), 100)]),
            },
            enterprise: PricingTier {
                price: 499.0,
                features: vec!["core".into(), "exports".into(), "api".into()],
                limits: HashMap::new(),
            },
        }
    }

    fn sample_new_tool() -> NewTool {
        NewTool {
            name: "RD Tax Wizard".into(),
            slug: "rd-tax-wizard".into(),
            category: "tax".into(),
            description: "Guided R&D credit calculator".into(),
            status: ToolStatus::Active,
            version: "1.0.0".into(),
            features: vec![],
            pricing: sample_pricing(),
        }
    }

    #[test]
    fn test_new_tool_valid() {
        assert!(sample_new_tool().validate().is_ok());
    }

    #[test]
    fn test_new_tool_bad_slug() {
        let mut tool = sample_new_tool();
        tool.slug = "Bad Slug".into();
        assert!(tool.validate().is_err());
    }

    #[test]
    fn test_new_tool_bad_version() {
        let mut tool = sample_new_tool();
        tool.version = "1.0".into();
        assert!(tool.validate().is_err());
    }

    #[test]
    fn test_new_tool_feature_missing_name() {
        let mut tool = sample_new_tool();
        tool.features.push(ToolFeature {
            id: "f1".into(),
            name: "".into(),
            description: String::new(),
            enabled: true,
            subscription_levels: vec![],
        });
        assert!(tool.validate().is_err());
    }

    #[test]
    fn test_missing_pricing_tier_rejected_by_serde() {
        let result: Result<NewTool, _> = serde_json::from_value(serde_json::json!({
            "name": "X",
            "slug": "x",
            "category": "tax",
            "description": "d",
            "status": "active",
            "version": "1.0.0",
            "pricing": { "basic": { "price": 1.0 } }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_patch_apply_reports_changed_fields() {
        let mut tool = sample_new_tool().into_tool(Uuid::new_v4(), Utc::now());
        let patch = ToolPatch {
            name: Some("RD Wizard".into()),
            status: Some(ToolStatus::Beta),
            ..Default::default()
        };
        let changed = patch.apply_to(&mut tool);
        assert_eq!(changed, vec!["name", "status"]);
        assert_eq!(tool.status, ToolStatus::Beta);
    }

    #[test]
    fn test_patch_validate_rejects_blank_name() {
        let patch = ToolPatch {
            name: Some("   ".into()),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn test_tool_patch_has_no_slug_field() {
        let result: Result<ToolPatch, _> = serde_json::from_str(r#"{"slug":"new-slug"}"#);
        assert!(result.is_err());
    }
}
