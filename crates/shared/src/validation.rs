//! Common validation utilities.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

lazy_static! {
    /// Lowercase alphanumeric segments separated by single hyphens.
    static ref SLUG_RE: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
    /// Plain three-component semantic version, e.g. "1.0.0".
    static ref SEMVER_RE: Regex = Regex::new(r"^\d+\.\d+\.\d+$").unwrap();
}

/// Validates a URL-safe slug (lowercase, hyphen-separated, no spaces).
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if SLUG_RE.is_match(slug) {
        Ok(())
    } else {
        let mut err = ValidationError::new("slug_format");
        err.message =
            Some("Slug must be lowercase with hyphens (no spaces or special characters)".into());
        Err(err)
    }
}

/// Validates a semantic version string (e.g. "1.0.0").
pub fn validate_semver(version: &str) -> Result<(), ValidationError> {
    if SEMVER_RE.is_match(version) {
        Ok(())
    } else {
        let mut err = ValidationError::new("version_format");
        err.message = Some("Version must follow semantic versioning (e.g. 1.0.0)".into());
        Err(err)
    }
}

/// Validates that a free-text field is non-empty after trimming.
pub fn validate_non_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}
