use crate::foundation::core::{Rect, Size};
use crate::template::data::PanZoom;
use crate::template::model::FitMode;

/// Source overhang, in bitmap pixels, below which no clipping is applied.
const CLIP_EPSILON: f64 = 1e-9;

/// Source sub-rectangle of a bitmap and the destination it is blitted into.
///
/// `src` is in bitmap pixels, `dst` in logical pixels. Blitting maps `src` linearly onto `dst`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitPlacement {
    /// Region of the bitmap to sample.
    pub src: Rect,
    /// Region of the page to paint.
    pub dst: Rect,
}

impl FitPlacement {
    /// Horizontal and vertical scale from bitmap pixels to logical pixels.
    pub fn scale(&self) -> (f64, f64) {
        (
            self.dst.width() / self.src.width(),
            self.dst.height() / self.src.height(),
        )
    }

    /// Restrict `src` to the bitmap bounds, shrinking `dst` proportionally.
    ///
    /// Zooming out (`zoom < 1`) produces a source rectangle larger than the bitmap; only the
    /// part that exists is painted and the rest of the frame is left untouched. Returns `None`
    /// when nothing of the bitmap remains.
    pub fn clip_to_image(self, image: Size) -> Option<Self> {
        let bounds = Rect::new(0.0, 0.0, image.width, image.height);
        let src = self.src.intersect(bounds);
        if src.width() <= 0.0 || src.height() <= 0.0 {
            return None;
        }
        let overhang = [
            src.x0 - self.src.x0,
            src.y0 - self.src.y0,
            self.src.x1 - src.x1,
            self.src.y1 - src.y1,
        ];
        if overhang.iter().all(|v| v.abs() <= CLIP_EPSILON) {
            // Already inside the bitmap: `dst` stays the exact target.
            return Some(Self { src, dst: self.dst });
        }
        let (kx, ky) = self.scale();
        let dst = Rect::new(
            self.dst.x0 + (src.x0 - self.src.x0) * kx,
            self.dst.y0 + (src.y0 - self.src.y0) * ky,
            self.dst.x0 + (src.x1 - self.src.x0) * kx,
            self.dst.y0 + (src.y1 - self.src.y0) * ky,
        );
        Some(Self { src, dst })
    }
}

/// Compute where a bitmap of natural size `image` lands inside `target` under `mode`.
///
/// - `Cover` crops the bitmap to the target aspect ratio, positioned by the pan offsets.
/// - `Contain` keeps the whole bitmap and letterboxes it, centered, inside `target`.
/// - `Stretch` maps the whole bitmap onto the whole target and ignores pan/zoom.
///
/// Offsets are clamped into `[0, 1]`. For `Cover` and `Contain`, zoom then shrinks the source
/// rectangle around its own center. Returns `None` for degenerate sizes.
pub fn fit_image(image: Size, target: Rect, pan: PanZoom, mode: FitMode) -> Option<FitPlacement> {
    let (iw, ih) = (image.width, image.height);
    let (w, h) = (target.width(), target.height());
    if !(iw > 0.0 && ih > 0.0 && w > 0.0 && h > 0.0) {
        return None;
    }
    if [iw, ih, w, h].iter().any(|v| !v.is_finite()) {
        return None;
    }

    if mode == FitMode::Stretch {
        return Some(FitPlacement {
            src: Rect::new(0.0, 0.0, iw, ih),
            dst: target,
        });
    }

    let pan = pan.clamped();
    let (mut sx, mut sy, mut sw, mut sh, dst) = match mode {
        FitMode::Contain => {
            let k = (w / iw).min(h / ih);
            let (dw, dh) = (iw * k, ih * k);
            let x0 = target.x0 + (w - dw) / 2.0;
            let y0 = target.y0 + (h - dh) / 2.0;
            (0.0, 0.0, iw, ih, Rect::new(x0, y0, x0 + dw, y0 + dh))
        }
        _ => {
            let target_ratio = w / h;
            let img_ratio = iw / ih;
            if img_ratio > target_ratio {
                let sw = ih * target_ratio;
                ((iw - sw) * pan.x, 0.0, sw, ih, target)
            } else {
                let sh = iw / target_ratio;
                (0.0, (ih - sh) * pan.y, iw, sh, target)
            }
        }
    };

    let cx = sx + sw / 2.0;
    let cy = sy + sh / 2.0;
    sw /= pan.zoom;
    sh /= pan.zoom;
    sx = cx - sw / 2.0;
    sy = cy - sh / 2.0;

    Some(FitPlacement {
        src: Rect::new(sx, sy, sx + sw, sy + sh),
        dst,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/fit.rs"]
mod tests;
