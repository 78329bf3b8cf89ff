//! Domain layer for the admin platform backend.
//!
//! This crate contains:
//! - Domain models (Account, Tool, Grant)
//! - Matrix and bulk-operation request/result types
//! - Activity-log input types
//! - Validation rules for assignment and tool payloads

pub mod models;
