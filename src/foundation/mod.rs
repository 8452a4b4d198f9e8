//! Shared primitives: geometry re-exports, colors, frames, errors and unit conversion.

/// Geometry re-exports, colors and frames.
pub mod core;
/// Crate error type.
pub mod error;
pub(crate) mod math;
/// Millimeter and pixel conversion.
pub mod units;
