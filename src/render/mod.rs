//! Raster backend and render entry points.

/// CPU backend executing a [`crate::CardPlan`].
pub mod cpu;
/// Settings, the card renderer and the latest-wins render slot.
pub mod session;
