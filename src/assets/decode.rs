use std::sync::Arc;

use anyhow::Context;

use crate::foundation::error::{BadgeError, BadgeResult};

/// Oversampling applied when rasterizing SVG sources.
const SVG_RASTER_SCALE: f32 = 2.0;
const MAX_SVG_DIM: u32 = 8_192;

/// A decoded bitmap as premultiplied RGBA8.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Premultiplied RGBA8 pixels, row-major.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Decode encoded raster or SVG bytes into a premultiplied bitmap.
pub fn decode_bitmap(bytes: &[u8]) -> BadgeResult<PreparedImage> {
    if looks_like_svg(bytes) {
        rasterize_svg(bytes)
    } else {
        decode_image(bytes)
    }
}

/// Decode encoded image bytes and convert to premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> BadgeResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| BadgeError::image_load(format!("decode image: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

/// Parse SVG bytes and rasterize them at their natural size (oversampled).
pub fn rasterize_svg(bytes: &[u8]) -> BadgeResult<PreparedImage> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts)
        .map_err(|e| BadgeError::image_load(format!("parse svg: {e}")))?;

    let size = tree.size();
    let to_px = |v: f32| -> BadgeResult<u32> {
        let px = (v * SVG_RASTER_SCALE).ceil();
        if !px.is_finite() || px < 1.0 {
            return Err(BadgeError::image_load("svg has invalid width/height"));
        }
        Ok((px as u32).min(MAX_SVG_DIM))
    };
    let width = to_px(size.width())?;
    let height = to_px(size.height())?;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| BadgeError::image_load("failed to allocate svg pixmap"))?;
    let sx = (width as f32) / size.width();
    let sy = (height as f32) / size.height();
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(sx, sy),
        &mut pixmap.as_mut(),
    );

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(pixmap.data().to_vec()),
    })
}

/// Downscale an uploaded photo to at most `max_width` pixels wide, re-encoded as PNG.
///
/// Aspect ratio is preserved; images already narrow enough are re-encoded unchanged.
pub fn downscale_image(bytes: &[u8], max_width: u32) -> BadgeResult<Vec<u8>> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| BadgeError::image_load(format!("decode image: {e}")))?;
    let img = if max_width > 0 && img.width() > max_width {
        let h = ((u64::from(img.height()) * u64::from(max_width)) / u64::from(img.width())).max(1);
        img.resize_exact(max_width, h as u32, image::imageops::FilterType::Triangle)
    } else {
        img
    };
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .context("encode downscaled png")?;
    Ok(out.into_inner())
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let head = String::from_utf8_lossy(head);
    let head = head.trim_start_matches('\u{feff}').trim_start();
    head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg"))
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
