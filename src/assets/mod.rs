//! Image source resolution, bitmap decoding and caching, and font shaping.

/// Bitmap and SVG decoding.
pub mod decode;
/// Font registration and text shaping.
pub mod fonts;
/// Image source parsing and resolution.
pub mod source;
/// Decoded bitmap cache.
pub mod store;
