//! Compositor: turns a template and a data record into a backend-agnostic draw plan.

/// Template to plan compilation.
pub mod compiler;
/// Draw plan types.
pub mod plan;
