use crate::assets::store::{BitmapKey, BitmapStore};
use crate::compose::plan::{CardPlan, DrawOp, ImageClip, TextBaseline, TextRun};
use crate::foundation::core::{Point, Rect, Rgba8, Size};
use crate::foundation::error::{BadgeError, BadgeResult};
use crate::foundation::units::{device_px, mm_to_px};
use crate::geometry::fit::fit_image;
use crate::template::data::{DataRecord, PanZoom};
use crate::template::model::{
    BackgroundKind, FontWeight, ImageStyle, Layer, LayerKind, ShapeStyle, ShapeType, TextAlign,
    TextStyle, Template,
};

/// Text shown by a text layer with neither literal text nor a binding.
pub const DEFAULT_STATIC_TEXT: &str = "Sample Text";

/// Label drawn when an image layer's bitmap fails to load.
pub const IMAGE_ERROR_LABEL: &str = "Image Error";
/// Label drawn when an image layer has no source.
pub const IMAGE_EMPTY_LABEL: &str = "Image";

const PLACEHOLDER_FILL: Rgba8 = Rgba8::rgb(0xe2, 0xe8, 0xf0);
const PLACEHOLDER_TEXT: Rgba8 = Rgba8::rgb(0x94, 0xa3, 0xb8);
const PLACEHOLDER_FONT_PX: f64 = 12.0;
const PLACEHOLDER_FAMILY: &str = "sans-serif";

/// Compile a template plus a data record into a [`CardPlan`].
///
/// Paints white, then the background, then layers by ascending `zIndex` (stable). Bitmaps are
/// loaded through `store`. A failing layer never aborts the card: image failures become a
/// placeholder box and other problems are logged and skipped.
///
/// Errors only when the page size or `scale` is unusable.
#[tracing::instrument(skip(template, data, store), fields(layers = template.layers.len()))]
pub fn compile_card(
    template: &Template,
    data: &DataRecord,
    store: &mut BitmapStore,
    scale: f64,
) -> BadgeResult<CardPlan> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(BadgeError::validation("render scale must be finite and > 0"));
    }
    let (wmm, hmm) = (template.meta.width_mm, template.meta.height_mm);
    if !(wmm.is_finite() && wmm > 0.0 && hmm.is_finite() && hmm > 0.0) {
        return Err(BadgeError::validation(
            "meta widthMm/heightMm must be finite and > 0",
        ));
    }

    let page = Rect::new(0.0, 0.0, mm_to_px(wmm), mm_to_px(hmm));
    let mut c = Compositor {
        store,
        data,
        ops: Vec::new(),
    };

    c.ops.push(DrawOp::FillRect {
        rect: page,
        color: Rgba8::WHITE,
    });
    c.background(template, page);

    for layer in template.layers_in_paint_order() {
        if let Err(e) = c.layer(layer) {
            tracing::warn!(layer = %layer.id, kind = layer.kind_name(), error = %e, "layer skipped");
        }
    }

    Ok(CardPlan {
        width_px: device_px(wmm, scale),
        height_px: device_px(hmm, scale),
        scale,
        page,
        ops: c.ops,
    })
}

struct Compositor<'a> {
    store: &'a mut BitmapStore,
    data: &'a DataRecord,
    ops: Vec<DrawOp>,
}

impl Compositor<'_> {
    fn background(&mut self, template: &Template, page: Rect) {
        let bg = &template.background;
        let value = bg.value.trim();
        if value.is_empty() {
            return;
        }
        match bg.kind {
            BackgroundKind::Color => match Rgba8::parse(value) {
                Ok(color) => self.ops.push(DrawOp::FillRect { rect: page, color }),
                Err(e) => tracing::warn!(error = %e, "background color ignored"),
            },
            BackgroundKind::Image => {
                let key = match self.store.load(value) {
                    Ok(k) => k,
                    Err(e) => {
                        tracing::warn!(error = %e, "background image failed to load");
                        return;
                    }
                };
                let Some(size) = self.image_size(key) else {
                    return;
                };
                let placement = fit_image(size, page, PanZoom::default(), bg.fit)
                    .and_then(|p| p.clip_to_image(size));
                if let Some(placement) = placement {
                    self.ops.push(DrawOp::Image {
                        key,
                        placement,
                        clip: ImageClip::None,
                    });
                }
            }
        }
    }

    fn layer(&mut self, layer: &Layer) -> BadgeResult<()> {
        match &layer.kind {
            LayerKind::Shape(s) => self.shape(layer, s),
            LayerKind::Text(t) => self.text(layer, t),
            LayerKind::Image(i) => self.image(layer, i),
        }
    }

    fn shape(&mut self, layer: &Layer, style: &ShapeStyle) -> BadgeResult<()> {
        let color = Rgba8::parse(&style.fill)?;
        let rect = layer.rect();
        self.ops.push(match style.shape_type {
            ShapeType::Rect => DrawOp::FillRect { rect, color },
            ShapeType::Circle => DrawOp::FillCircle { rect, color },
        });
        Ok(())
    }

    fn text(&mut self, layer: &Layer, style: &TextStyle) -> BadgeResult<()> {
        let text = resolve_text(layer, style, self.data);
        if text.is_empty() {
            return Ok(());
        }
        let color = Rgba8::parse(&style.color)?;
        let x = match style.align {
            TextAlign::Left => layer.x,
            TextAlign::Center => layer.x + layer.w / 2.0,
            TextAlign::Right => layer.x + layer.w,
        };
        self.ops.push(DrawOp::Text(TextRun {
            text,
            origin: Point::new(x, layer.y),
            align: style.align,
            baseline: TextBaseline::Top,
            max_width: Some(layer.w),
            family: style.font_family.clone(),
            size_px: style.font_size,
            bold: style.font_weight == FontWeight::Bold,
            color,
        }));
        Ok(())
    }

    fn image(&mut self, layer: &Layer, style: &ImageStyle) -> BadgeResult<()> {
        let bound = layer
            .bind_key
            .as_deref()
            .and_then(|k| self.data.get(k))
            .and_then(|v| v.image_source())
            .map(|(src, props)| (src.to_owned(), props));
        let source = bound.or_else(|| {
            style
                .static_src
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(|s| (s.to_owned(), PanZoom::default()))
        });
        let Some((src, props)) = source else {
            self.placeholder(layer.rect(), IMAGE_EMPTY_LABEL);
            return Ok(());
        };

        let key = match self.store.load(&src) {
            Ok(k) => k,
            Err(e) => {
                tracing::warn!(layer = %layer.id, error = %e, "image failed to load");
                self.placeholder(layer.rect(), IMAGE_ERROR_LABEL);
                return Ok(());
            }
        };
        let Some(size) = self.image_size(key) else {
            return Ok(());
        };

        let rect = layer.rect();
        let clip = if style.shape_type == Some(ShapeType::Circle) {
            ImageClip::Circle { rect }
        } else {
            match style.border_radius {
                Some(r) if r > 0.0 => ImageClip::RoundedRect { rect, radius: r },
                _ => ImageClip::None,
            }
        };
        let placement =
            fit_image(size, rect, props, style.object_fit).and_then(|p| p.clip_to_image(size));
        if let Some(placement) = placement {
            self.ops.push(DrawOp::Image {
                key,
                placement,
                clip,
            });
        }
        Ok(())
    }

    fn placeholder(&mut self, rect: Rect, label: &str) {
        self.ops.push(DrawOp::FillRect {
            rect,
            color: PLACEHOLDER_FILL,
        });
        self.ops.push(DrawOp::Text(TextRun {
            text: label.to_owned(),
            origin: rect.center(),
            align: TextAlign::Center,
            baseline: TextBaseline::Middle,
            max_width: None,
            family: PLACEHOLDER_FAMILY.to_owned(),
            size_px: PLACEHOLDER_FONT_PX,
            bold: false,
            color: PLACEHOLDER_TEXT,
        }));
    }

    fn image_size(&self, key: BitmapKey) -> Option<Size> {
        self.store
            .get(key)
            .map(|img| Size::new(f64::from(img.width), f64::from(img.height)))
    }
}

/// Display string of a text layer for `data`.
///
/// Bound and present: prefix + value. Bound but absent: the bind key itself. Unbound: the
/// literal text, or [`DEFAULT_STATIC_TEXT`].
pub fn resolve_text(layer: &Layer, style: &TextStyle, data: &DataRecord) -> String {
    match layer.bind_key.as_deref() {
        Some(key) => match data.get(key) {
            Some(v) => {
                let mut out = style.text_prefix.clone().unwrap_or_default();
                out.push_str(&v.display_text());
                out
            }
            None => key.to_owned(),
        },
        None => style
            .static_text
            .clone()
            .unwrap_or_else(|| DEFAULT_STATIC_TEXT.to_owned()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/compiler.rs"]
mod tests;
