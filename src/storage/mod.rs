//! Persistence collaborators and the flows built on them.
//!
//! Templates are checkpointed to a [`KeyValueStore`] outside the undo stack and published to
//! an [`ObjectStore`] under `templates/<slug>.json`. Both traits have an in-memory and a
//! filesystem implementation.

/// Template bootstrap and publishing.
pub mod bootstrap;
/// Key-value checkpoint store.
pub mod kv;
/// Object store for published templates.
pub mod objects;
