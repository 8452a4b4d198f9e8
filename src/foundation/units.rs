/// Logical pixel density every template coordinate is expressed in.
pub const REFERENCE_DPI: f64 = 96.0;

const MM_PER_INCH: f64 = 25.4;

/// Convert physical millimeters into logical (96 DPI) pixels.
pub fn mm_to_px(mm: f64) -> f64 {
    mm * REFERENCE_DPI / MM_PER_INCH
}

/// Exact inverse of [`mm_to_px`].
pub fn px_to_mm(px: f64) -> f64 {
    px * MM_PER_INCH / REFERENCE_DPI
}

/// Device raster extent for a physical length at the given oversampling factor.
///
/// Rounded to the nearest whole pixel and never smaller than one.
pub fn device_px(mm: f64, scale: f64) -> u32 {
    let px = (mm_to_px(mm) * scale).round();
    if px.is_finite() && px >= 1.0 {
        px as u32
    } else {
        1
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/units.rs"]
mod tests;
