//! Encoders turning a rendered [`crate::FrameRGBA`] into deliverable files.

/// Single-page PDF sized to the card.
pub mod pdf;
/// PNG.
pub mod png;
