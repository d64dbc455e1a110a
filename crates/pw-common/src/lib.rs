//! Pest warning common types, IDs, and errors.
//!
//! This crate provides foundational types shared across the pw-* crates:
//! - Cell and batch identity types
//! - Schema versioning
//! - The unified CLI-facing error type with stable codes
//! - Output format selection

pub mod error;
pub mod id;
pub mod output;
pub mod schema;

pub use error::{Error, ErrorCategory, Result, StructuredError, SuggestedAction};
pub use id::{BatchId, CellId};
pub use output::OutputFormat;
pub use schema::SCHEMA_VERSION;
