use crate::assets::store::BitmapKey;
use crate::foundation::core::{Point, Rect, Rgba8};
use crate::foundation::math::Fnv1a64;
use crate::geometry::fit::FitPlacement;
use crate::template::model::TextAlign;

/// Backend-agnostic draw list for one card.
///
/// All coordinates are logical (96 DPI) pixels; backends apply [`CardPlan::scale`] uniformly.
#[derive(Clone, Debug, PartialEq)]
pub struct CardPlan {
    /// Device raster width.
    pub width_px: u32,
    /// Device raster height.
    pub height_px: u32,
    /// Oversampling factor from logical to device pixels.
    pub scale: f64,
    /// Page rectangle in logical pixels.
    pub page: Rect,
    /// Draw operations in paint order.
    pub ops: Vec<DrawOp>,
}

/// Vertical anchor of a text op.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextBaseline {
    /// `origin.y` is the top of the line box.
    Top,
    /// `origin.y` is the vertical middle of the line box.
    Middle,
}

/// Clip applied to an image blit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ImageClip {
    /// No clipping beyond the destination rectangle.
    None,
    /// Rounded rectangle.
    RoundedRect {
        /// Clip bounds.
        rect: Rect,
        /// Corner radius.
        radius: f64,
    },
    /// Circle centered in `rect` with radius `min(w, h) / 2`.
    Circle {
        /// Box the circle is inscribed in.
        rect: Rect,
    },
}

/// Styled single line of text.
#[derive(Clone, Debug, PartialEq)]
pub struct TextRun {
    /// Text to draw.
    pub text: String,
    /// Anchor point; see `align` and `baseline`.
    pub origin: Point,
    /// Horizontal relation between `origin.x` and the line.
    pub align: TextAlign,
    /// Vertical relation between `origin.y` and the line.
    pub baseline: TextBaseline,
    /// Lines wider than this are condensed horizontally to fit.
    pub max_width: Option<f64>,
    /// Requested font family.
    pub family: String,
    /// Font size in logical pixels.
    pub size_px: f64,
    /// Bold weight.
    pub bold: bool,
    /// Fill color.
    pub color: Rgba8,
}

/// One draw operation.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    /// Solid rectangle.
    FillRect {
        /// Rectangle to fill.
        rect: Rect,
        /// Fill color.
        color: Rgba8,
    },
    /// Solid circle inscribed in `rect`.
    FillCircle {
        /// Box the circle is inscribed in.
        rect: Rect,
        /// Fill color.
        color: Rgba8,
    },
    /// Text line.
    Text(TextRun),
    /// Cached bitmap blit.
    Image {
        /// Bitmap in the [`crate::BitmapStore`].
        key: BitmapKey,
        /// Source and destination rectangles.
        placement: FitPlacement,
        /// Clip shape.
        clip: ImageClip,
    },
}

impl CardPlan {
    /// Text runs in paint order.
    pub fn texts(&self) -> impl Iterator<Item = &TextRun> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text(t) => Some(t),
            _ => None,
        })
    }

    /// Stable 64-bit fingerprint of the plan.
    ///
    /// Equal fingerprints mean the backend would produce identical pixels, given the same
    /// cached bitmaps and fonts.
    pub fn fingerprint(&self) -> u64 {
        let mut h = Fnv1a64::new_default();
        h.write_u64(u64::from(self.width_px));
        h.write_u64(u64::from(self.height_px));
        h.write_f64(self.scale);
        write_rect(&mut h, self.page);
        for op in &self.ops {
            match op {
                DrawOp::FillRect { rect, color } => {
                    h.write_bytes(b"R");
                    write_rect(&mut h, *rect);
                    write_color(&mut h, *color);
                }
                DrawOp::FillCircle { rect, color } => {
                    h.write_bytes(b"C");
                    write_rect(&mut h, *rect);
                    write_color(&mut h, *color);
                }
                DrawOp::Text(t) => {
                    h.write_bytes(b"T");
                    h.write_str(&t.text);
                    h.write_f64(t.origin.x);
                    h.write_f64(t.origin.y);
                    h.write_u64(t.align as u64);
                    h.write_u64(t.baseline as u64);
                    h.write_f64(t.max_width.unwrap_or(-1.0));
                    h.write_str(&t.family);
                    h.write_f64(t.size_px);
                    h.write_bytes(&[u8::from(t.bold)]);
                    write_color(&mut h, t.color);
                }
                DrawOp::Image {
                    key,
                    placement,
                    clip,
                } => {
                    h.write_bytes(b"I");
                    h.write_u64(key.0);
                    write_rect(&mut h, placement.src);
                    write_rect(&mut h, placement.dst);
                    match clip {
                        ImageClip::None => h.write_bytes(b"n"),
                        ImageClip::RoundedRect { rect, radius } => {
                            h.write_bytes(b"r");
                            write_rect(&mut h, *rect);
                            h.write_f64(*radius);
                        }
                        ImageClip::Circle { rect } => {
                            h.write_bytes(b"c");
                            write_rect(&mut h, *rect);
                        }
                    }
                }
            }
        }
        h.finish()
    }
}

fn write_rect(h: &mut Fnv1a64, r: Rect) {
    for v in [r.x0, r.y0, r.x1, r.y1] {
        h.write_f64(v);
    }
}

fn write_color(h: &mut Fnv1a64, c: Rgba8) {
    h.write_bytes(&[c.r, c.g, c.b, c.a]);
}

#[cfg(test)]
#[path = "../../tests/unit/compose/plan.rs"]
mod tests;
