//! Shared utilities and common types for the admin platform backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Offset-based pagination types
//! - Clock abstraction for testable time-dependent logic
//! - Common validation logic

pub mod clock;
pub mod pagination;
pub mod validation;
