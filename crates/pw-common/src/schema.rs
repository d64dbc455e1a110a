//! Schema versioning for JSON payloads.

/// Version of the batch request/report wire format.
///
/// Bumped on any breaking change to field names or semantics.
pub const SCHEMA_VERSION: &str = "1.0.0";
