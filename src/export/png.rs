use std::io::Cursor;

use anyhow::Context;

use crate::foundation::core::FrameRGBA;
use crate::foundation::error::{BadgeError, BadgeResult};

/// Encode a frame as PNG bytes (straight alpha).
pub fn encode_png(frame: &FrameRGBA) -> BadgeResult<Vec<u8>> {
    let rgba = frame.to_straight_rgba();
    let img = image::RgbaImage::from_raw(frame.width, frame.height, rgba)
        .ok_or_else(|| BadgeError::render("frame buffer does not match its dimensions"))?;
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .context("encode png")?;
    Ok(buf)
}

#[cfg(test)]
#[path = "../../tests/unit/export/png.rs"]
mod tests;
