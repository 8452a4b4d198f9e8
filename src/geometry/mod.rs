//! Pure image placement geometry.

/// Cover, contain and stretch placement with pan/zoom.
pub mod fit;
