use std::path::Path;

use anyhow::Context;

use crate::foundation::error::{BadgeError, BadgeResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub struct TextBrushRgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

/// Text shaped with exactly one font face, ready for glyph rasterization.
pub struct ShapedText {
    /// Single-line layout; glyph positions are relative to the line box top-left.
    pub layout: parley::Layout<TextBrushRgba8>,
    /// Face the glyph ids refer to.
    pub font: vello_cpu::peniko::FontData,
    /// Advance width of the line in pixels.
    pub width: f32,
}

struct FontFace {
    family: String,
    bold: bool,
    bytes: Vec<u8>,
    // One context per face so shaping can never pick glyphs from another file.
    font_ctx: parley::FontContext,
}

/// Stateful helper for shaping text against a small set of registered font files.
///
/// Family lookup is case-insensitive and falls back to the first registered face. Bold is
/// honored when a face of the family has "bold" in its file name.
pub struct TextLayoutEngine {
    faces: Vec<FontFace>,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    /// Engine with no fonts; shaping returns `None` until fonts are registered.
    pub fn new() -> Self {
        Self {
            faces: Vec::new(),
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    /// Register every `.ttf`/`.otf` file in `dir`, in file-name order.
    ///
    /// Returns the number of faces registered.
    pub fn load_dir(&mut self, dir: &Path) -> BadgeResult<usize> {
        let entries =
            std::fs::read_dir(dir).with_context(|| format!("read fonts dir '{}'", dir.display()))?;
        let mut paths: Vec<_> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "ttf" | "otf"))
            })
            .collect();
        paths.sort();

        let mut n = 0;
        for p in paths {
            let bytes =
                std::fs::read(&p).with_context(|| format!("read font '{}'", p.display()))?;
            let bold = p
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|s| s.to_ascii_lowercase().contains("bold"));
            match self.register_font(bytes, bold) {
                Ok(family) => {
                    tracing::debug!(family = %family, path = %p.display(), "registered font");
                    n += 1;
                }
                Err(e) => tracing::warn!(path = %p.display(), error = %e, "skipping font"),
            }
        }
        Ok(n)
    }

    /// Register one font file, returning its family name.
    pub fn register_font(&mut self, bytes: Vec<u8>, bold: bool) -> BadgeResult<String> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes.clone()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            BadgeError::validation("no font families registered from font bytes")
        })?;
        let family = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| BadgeError::validation("registered font family has no name"))?
            .to_string();
        self.faces.push(FontFace {
            family: family.clone(),
            bold,
            bytes,
            font_ctx,
        });
        Ok(family)
    }

    /// Whether any face is registered.
    pub fn has_fonts(&self) -> bool {
        !self.faces.is_empty()
    }

    /// Registered family names, in registration order (duplicates removed).
    pub fn families(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for f in &self.faces {
            if !out.contains(&f.family) {
                out.push(f.family.clone());
            }
        }
        out
    }

    fn pick_face(&self, family: &str, bold: bool) -> Option<usize> {
        let wanted = family.trim().to_ascii_lowercase();
        let matching: Vec<usize> = self
            .faces
            .iter()
            .enumerate()
            .filter(|(_, f)| f.family.to_ascii_lowercase() == wanted)
            .map(|(i, _)| i)
            .collect();
        let pool = if matching.is_empty() {
            tracing::debug!(family, "font family not registered, using fallback");
            let first = self.faces.first()?.family.clone();
            self.faces
                .iter()
                .enumerate()
                .filter(|(_, f)| f.family == first)
                .map(|(i, _)| i)
                .collect()
        } else {
            matching
        };
        pool.iter()
            .copied()
            .find(|&i| self.faces[i].bold == bold)
            .or_else(|| pool.first().copied())
    }

    /// Shape a single line of plain text.
    ///
    /// Returns `Ok(None)` when no font is registered.
    pub fn shape(
        &mut self,
        text: &str,
        family: &str,
        bold: bool,
        size_px: f32,
        brush: TextBrushRgba8,
    ) -> BadgeResult<Option<ShapedText>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(BadgeError::validation(
                "text size_px must be finite and > 0",
            ));
        }
        let Some(i) = self.pick_face(family, bold) else {
            return Ok(None);
        };
        let face = &mut self.faces[i];

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut face.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(face.family.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        layout.align(
            None,
            parley::Alignment::Start,
            parley::AlignmentOptions::default(),
        );
        let width = layout.width();

        let font = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(face.bytes.clone()),
            0,
        );
        Ok(Some(ShapedText {
            layout,
            font,
            width,
        }))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/fonts.rs"]
mod tests;
