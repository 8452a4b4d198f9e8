use std::collections::HashMap;
use std::sync::Arc;

use kurbo::Shape;

use crate::assets::decode::PreparedImage;
use crate::assets::fonts::{TextBrushRgba8, TextLayoutEngine};
use crate::assets::store::{BitmapKey, BitmapStore};
use crate::compose::plan::{CardPlan, DrawOp, ImageClip, TextBaseline, TextRun};
use crate::foundation::core::{Affine, BezPath, FrameRGBA, Rect, Rgba8};
use crate::foundation::error::{BadgeError, BadgeResult};
use crate::geometry::fit::FitPlacement;
use crate::template::model::TextAlign;

const PATH_TOLERANCE: f64 = 0.1;

/// CPU raster backend powered by `vello_cpu`.
///
/// Keeps its render context between cards and only reallocates it when the device size
/// changes. Bitmaps are looked up in a [`BitmapStore`]; this backend performs no IO.
pub struct CpuBackend {
    ctx: Option<vello_cpu::RenderContext>,
    text_engine: TextLayoutEngine,
    image_cache: HashMap<BitmapKey, vello_cpu::Image>,
    warned_no_fonts: bool,
}

impl std::fmt::Debug for CpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuBackend")
            .field("has_ctx", &self.ctx.is_some())
            .field("cached_images", &self.image_cache.len())
            .field("has_fonts", &self.text_engine.has_fonts())
            .finish()
    }
}

impl CpuBackend {
    /// Backend shaping text with `text_engine`.
    pub fn new(text_engine: TextLayoutEngine) -> Self {
        Self {
            ctx: None,
            text_engine,
            image_cache: HashMap::new(),
            warned_no_fonts: false,
        }
    }

    /// Mutable access to the text engine, e.g. to register more fonts.
    pub fn text_engine_mut(&mut self) -> &mut TextLayoutEngine {
        &mut self.text_engine
    }

    /// Execute `plan` into a premultiplied RGBA8 frame.
    ///
    /// A draw op that cannot be executed (missing bitmap, unshapeable text) is logged and
    /// skipped; only surface-level failures are errors.
    pub fn render(&mut self, plan: &CardPlan, store: &BitmapStore) -> BadgeResult<FrameRGBA> {
        let w: u16 = plan
            .width_px
            .try_into()
            .map_err(|_| BadgeError::render("card width exceeds u16"))?;
        let h: u16 = plan
            .height_px
            .try_into()
            .map_err(|_| BadgeError::render("card height exceeds u16"))?;

        self.with_ctx_mut(w, h, |this, ctx| {
            let base = Affine::scale(plan.scale);
            ctx.set_blend_mode(vello_cpu::peniko::BlendMode::default());
            ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
            for op in &plan.ops {
                if let Err(e) = this.draw_op(op, base, store, ctx) {
                    tracing::warn!(error = %e, "draw op skipped");
                }
            }

            ctx.flush();
            let mut pixmap = vello_cpu::Pixmap::new(w, h);
            ctx.render_to_pixmap(&mut pixmap);
            Ok(FrameRGBA {
                width: u32::from(w),
                height: u32::from(h),
                data: pixmap.data_as_u8_slice().to_vec(),
                premultiplied: true,
            })
        })
    }

    fn with_ctx_mut<R>(
        &mut self,
        width: u16,
        height: u16,
        f: impl FnOnce(&mut Self, &mut vello_cpu::RenderContext) -> BadgeResult<R>,
    ) -> BadgeResult<R> {
        let mut ctx = match self.ctx.take() {
            None => vello_cpu::RenderContext::new(width, height),
            Some(ctx) if ctx.width() == width && ctx.height() == height => ctx,
            Some(_) => {
                tracing::debug!(width, height, "resizing render surface");
                vello_cpu::RenderContext::new(width, height)
            }
        };
        ctx.reset();
        let out = f(self, &mut ctx)?;
        self.ctx = Some(ctx);
        Ok(out)
    }

    fn draw_op(
        &mut self,
        op: &DrawOp,
        base: Affine,
        store: &BitmapStore,
        ctx: &mut vello_cpu::RenderContext,
    ) -> BadgeResult<()> {
        match op {
            DrawOp::FillRect { rect, color } => {
                ctx.set_transform(affine_to_cpu(base));
                ctx.set_paint(cpu_color(*color));
                ctx.fill_rect(&rect_to_cpu(*rect));
                Ok(())
            }
            DrawOp::FillCircle { rect, color } => {
                ctx.set_transform(affine_to_cpu(base));
                ctx.set_paint(cpu_color(*color));
                ctx.fill_path(&bezpath_to_cpu(&inscribed_circle(*rect)));
                Ok(())
            }
            DrawOp::Text(run) => self.draw_text(run, base, ctx),
            DrawOp::Image {
                key,
                placement,
                clip,
            } => self.draw_image(*key, placement, *clip, base, store, ctx),
        }
    }

    fn draw_image(
        &mut self,
        key: BitmapKey,
        placement: &FitPlacement,
        clip: ImageClip,
        base: Affine,
        store: &BitmapStore,
        ctx: &mut vello_cpu::RenderContext,
    ) -> BadgeResult<()> {
        let paint = self.image_paint_for(key, store)?;
        let (src, dst) = (placement.src, placement.dst);
        if src.width() <= 0.0 || src.height() <= 0.0 || dst.width() <= 0.0 || dst.height() <= 0.0
        {
            return Ok(());
        }
        let (kx, ky) = placement.scale();
        let local = Affine::translate((dst.x0, dst.y0))
            * Affine::scale_non_uniform(kx, ky)
            * Affine::translate((-src.x0, -src.y0));

        let clip_path = match clip {
            ImageClip::None => None,
            ImageClip::RoundedRect { rect, radius } => {
                Some(kurbo::RoundedRect::from_rect(rect, radius).to_path(PATH_TOLERANCE))
            }
            ImageClip::Circle { rect } => Some(inscribed_circle(rect)),
        };

        ctx.set_transform(affine_to_cpu(base));
        if let Some(p) = &clip_path {
            ctx.push_clip_layer(&bezpath_to_cpu(p));
        }
        ctx.set_transform(affine_to_cpu(base * local));
        ctx.set_paint(paint);
        ctx.fill_rect(&rect_to_cpu(src));
        if clip_path.is_some() {
            ctx.pop_layer();
        }
        Ok(())
    }

    fn draw_text(
        &mut self,
        run: &TextRun,
        base: Affine,
        ctx: &mut vello_cpu::RenderContext,
    ) -> BadgeResult<()> {
        let brush = TextBrushRgba8 {
            r: run.color.r,
            g: run.color.g,
            b: run.color.b,
            a: run.color.a,
        };
        let shaped = self.text_engine.shape(
            &run.text,
            &run.family,
            run.bold,
            run.size_px as f32,
            brush,
        )?;
        let Some(shaped) = shaped else {
            if !self.warned_no_fonts {
                tracing::warn!("no fonts registered, text is not drawn");
                self.warned_no_fonts = true;
            }
            return Ok(());
        };

        let natural_w = f64::from(shaped.width);
        let condense = match run.max_width {
            Some(max) if max > 0.0 && natural_w > max => max / natural_w,
            _ => 1.0,
        };
        let drawn_w = natural_w * condense;
        let x0 = match run.align {
            TextAlign::Left => run.origin.x,
            TextAlign::Center => run.origin.x - drawn_w / 2.0,
            TextAlign::Right => run.origin.x - drawn_w,
        };
        let y0 = match run.baseline {
            TextBaseline::Top => run.origin.y,
            TextBaseline::Middle => run.origin.y - f64::from(shaped.layout.height()) / 2.0,
        };
        let tr = base * Affine::translate((x0, y0)) * Affine::scale_non_uniform(condense, 1.0);

        ctx.set_transform(affine_to_cpu(tr));
        for line in shaped.layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(glyph_run) = item else {
                    continue;
                };
                let brush = glyph_run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));
                let glyphs = glyph_run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&shaped.font)
                    .font_size(glyph_run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
        Ok(())
    }

    fn image_paint_for(
        &mut self,
        key: BitmapKey,
        store: &BitmapStore,
    ) -> BadgeResult<vello_cpu::Image> {
        if let Some(p) = self.image_cache.get(&key) {
            return Ok(p.clone());
        }
        let prepared = store
            .get(key)
            .ok_or_else(|| BadgeError::render(format!("bitmap {:016x} is not loaded", key.0)))?;
        let paint = image_from_prepared(prepared)?;
        self.image_cache.insert(key, paint.clone());
        Ok(paint)
    }
}

fn inscribed_circle(rect: Rect) -> BezPath {
    let r = rect.width().min(rect.height()) / 2.0;
    kurbo::Circle::new(rect.center(), r).to_path(PATH_TOLERANCE)
}

fn cpu_color(c: Rgba8) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::LineTo(p) => out.line_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::QuadTo(p1, p2) => out.quad_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
            ),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
                vello_cpu::kurbo::Point::new(p3.x, p3.y),
            ),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn image_from_prepared(prepared: &PreparedImage) -> BadgeResult<vello_cpu::Image> {
    let w: u16 = prepared
        .width
        .try_into()
        .map_err(|_| BadgeError::render("bitmap width exceeds u16"))?;
    let h: u16 = prepared
        .height
        .try_into()
        .map_err(|_| BadgeError::render("bitmap height exceeds u16"))?;
    let bytes = prepared.rgba8_premul.as_slice();
    if bytes.len()
        != (w as usize)
            .saturating_mul(h as usize)
            .saturating_mul(4)
    {
        return Err(BadgeError::render("bitmap byte len mismatch"));
    }
    let mut pixels = Vec::<vello_cpu::peniko::color::PremulRgba8>::with_capacity(
        (w as usize) * (h as usize),
    );
    for px in bytes.chunks_exact(4) {
        pixels.push(vello_cpu::peniko::color::PremulRgba8::from_u8_array([
            px[0], px[1], px[2], px[3],
        ]));
    }
    let pixmap = vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true);
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
