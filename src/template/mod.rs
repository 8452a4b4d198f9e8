//! Template document model, data records and shared-link codec.

/// Data records bound to fields.
pub mod data;
/// Shared-link codec and slugs.
pub mod link;
/// Template schema, defaults and validation.
pub mod model;
