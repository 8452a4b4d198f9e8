use std::path::Path;

use anyhow::Context;

use crate::foundation::core::{Point, Rect, Size};
use crate::foundation::error::{BadgeError, BadgeResult};
use crate::foundation::units::mm_to_px;

/// A complete badge template: page size, background, data fields and layers.
///
/// Templates are plain data and round-trip through JSON (camelCase keys). Loading goes
/// through [`Template::from_json`], which tolerates older documents (missing `fields`,
/// `layers` or `background`, and the flat `meta.backgroundImage` string) and then validates.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(from = "TemplateRepr")]
pub struct Template {
    /// Physical page size.
    pub meta: Meta,
    /// Page background painted under every layer.
    pub background: Background,
    /// Ordered data fields layers can bind to.
    pub fields: Vec<FieldDef>,
    /// Layers in authoring order; paint order is by [`Layer::z_index`].
    pub layers: Vec<Layer>,
}

#[derive(serde::Deserialize)]
struct TemplateRepr {
    #[serde(default)]
    meta: Meta,
    #[serde(default)]
    background: Option<Background>,
    #[serde(default)]
    fields: Vec<FieldDef>,
    #[serde(default)]
    layers: Vec<Layer>,
}

impl From<TemplateRepr> for Template {
    fn from(repr: TemplateRepr) -> Self {
        let mut meta = repr.meta;
        let legacy = meta
            .background_image
            .take()
            .filter(|s| !s.trim().is_empty());
        let background = match (repr.background, legacy) {
            (Some(bg), _) => bg,
            (None, Some(src)) => Background::image(src, FitMode::Stretch),
            (None, None) => Background::default(),
        };
        Self {
            meta,
            background,
            fields: repr.fields,
            layers: repr.layers,
        }
    }
}

/// Physical page size in millimeters.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    /// Page width in millimeters.
    #[serde(default = "default_width_mm")]
    pub width_mm: f64,
    /// Page height in millimeters.
    #[serde(default = "default_height_mm")]
    pub height_mm: f64,
    /// Legacy flat background image; folded into [`Template::background`] on load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            width_mm: default_width_mm(),
            height_mm: default_height_mm(),
            background_image: None,
        }
    }
}

fn default_width_mm() -> f64 {
    54.0
}

fn default_height_mm() -> f64 {
    86.0
}

/// Page background.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Background {
    /// Whether `value` is a color or an image source.
    #[serde(rename = "type", default)]
    pub kind: BackgroundKind,
    /// Hex color or image source, depending on `kind`.
    #[serde(default = "default_background_value")]
    pub value: String,
    /// Placement of an image background.
    #[serde(default = "default_background_fit")]
    pub fit: FitMode,
}

impl Default for Background {
    fn default() -> Self {
        Self {
            kind: BackgroundKind::Color,
            value: default_background_value(),
            fit: default_background_fit(),
        }
    }
}

impl Background {
    /// Image background from a source string.
    pub fn image(src: impl Into<String>, fit: FitMode) -> Self {
        Self {
            kind: BackgroundKind::Image,
            value: src.into(),
            fit,
        }
    }

    /// Solid color background.
    pub fn color(hex: impl Into<String>) -> Self {
        Self {
            kind: BackgroundKind::Color,
            value: hex.into(),
            fit: default_background_fit(),
        }
    }
}

fn default_background_value() -> String {
    "#ffffff".to_owned()
}

fn default_background_fit() -> FitMode {
    FitMode::Stretch
}

/// Background discriminant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundKind {
    /// `value` is a color.
    #[default]
    Color,
    /// `value` is an image source.
    Image,
}

/// How a bitmap is placed into a destination rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Fill the whole rectangle ignoring aspect ratio.
    Stretch,
    /// Crop to fill, preserving aspect ratio.
    #[default]
    Cover,
    /// Scale to fit without cropping, leaving the rest of the rectangle untouched.
    Contain,
}

/// A named, typed data slot that layers bind to.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FieldDef {
    /// Join key between data records and layers.
    pub key: String,
    /// Human readable label.
    #[serde(default)]
    pub label: String,
    /// Input type.
    #[serde(rename = "type", default)]
    pub kind: FieldType,
    /// Choices for `select` fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl FieldDef {
    /// Build a field with `label == key`.
    pub fn new(key: impl Into<String>, kind: FieldType) -> Self {
        let key = key.into();
        Self {
            label: key.clone(),
            key,
            kind,
            options: Vec::new(),
        }
    }

    /// Label to show for this field, falling back to the key.
    pub fn display_label(&self) -> &str {
        if self.label.trim().is_empty() {
            &self.key
        } else {
            &self.label
        }
    }
}

/// Input type of a [`FieldDef`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Free text.
    #[default]
    Text,
    /// Numeric input.
    Number,
    /// One of [`FieldDef::options`].
    Select,
    /// Bitmap source.
    Image,
}

/// One positioned visual element.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    /// Unique, immutable identifier.
    pub id: String,
    /// Left edge in logical pixels.
    #[serde(default)]
    pub x: f64,
    /// Top edge in logical pixels.
    #[serde(default)]
    pub y: f64,
    /// Width in logical pixels.
    #[serde(default = "default_layer_dim")]
    pub w: f64,
    /// Height in logical pixels.
    #[serde(default = "default_layer_dim")]
    pub h: f64,
    /// Paint order; higher paints later.
    #[serde(default)]
    pub z_index: i64,
    /// Field key this layer reads dynamic content from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_key: Option<String>,
    /// Variant-specific attributes.
    #[serde(flatten)]
    pub kind: LayerKind,
}

fn default_layer_dim() -> f64 {
    50.0
}

/// Layer variants, discriminated by the JSON `type` key.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerKind {
    /// Filled rectangle or circle.
    Shape(ShapeStyle),
    /// Single line of text.
    Text(TextStyle),
    /// Bitmap placed with a fit mode.
    Image(ImageStyle),
}

/// Geometry of a shape layer or an image clip.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    /// Axis-aligned rectangle.
    #[default]
    Rect,
    /// Circle inscribed in the layer box.
    Circle,
}

/// Attributes of a shape layer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeStyle {
    /// Rectangle or circle.
    #[serde(default)]
    pub shape_type: ShapeType,
    /// Fill color.
    #[serde(default = "default_shape_fill")]
    pub fill: String,
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self {
            shape_type: ShapeType::Rect,
            fill: default_shape_fill(),
        }
    }
}

fn default_shape_fill() -> String {
    "#cccccc".to_owned()
}

/// Attributes of a text layer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    /// Literal text, used when the layer is not bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_text: Option<String>,
    /// Prefix prepended to bound values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_prefix: Option<String>,
    /// Font family name.
    #[serde(default = "default_font_family")]
    pub font_family: String,
    /// Font size in logical pixels.
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    /// Font weight.
    #[serde(default)]
    pub font_weight: FontWeight,
    /// Horizontal anchor.
    #[serde(default)]
    pub align: TextAlign,
    /// Text color.
    #[serde(default = "default_text_color")]
    pub color: String,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            static_text: None,
            text_prefix: None,
            font_family: default_font_family(),
            font_size: default_font_size(),
            font_weight: FontWeight::Normal,
            align: TextAlign::Left,
            color: default_text_color(),
        }
    }
}

fn default_font_family() -> String {
    "Arial".to_owned()
}

fn default_font_size() -> f64 {
    16.0
}

fn default_text_color() -> String {
    "#000000".to_owned()
}

/// Font weight of a text layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    /// Regular weight.
    #[default]
    Normal,
    /// Bold weight.
    Bold,
}

/// Horizontal text anchor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    /// Anchor at `x`.
    #[default]
    Left,
    /// Anchor at `x + w / 2`.
    Center,
    /// Anchor at `x + w`.
    Right,
}

/// Attributes of an image layer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStyle {
    /// Fixed source used when the layer is unbound or its data is missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_src: Option<String>,
    /// Placement of the bitmap inside the layer box.
    #[serde(default)]
    pub object_fit: FitMode,
    /// Corner radius of the clip, in logical pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<f64>,
    /// `circle` clips the bitmap to the inscribed circle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_type: Option<ShapeType>,
}

impl Default for ImageStyle {
    fn default() -> Self {
        Self {
            static_src: None,
            object_fit: FitMode::Cover,
            border_radius: None,
            shape_type: None,
        }
    }
}

impl Layer {
    /// Build a layer with default geometry.
    pub fn new(id: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            id: id.into(),
            x: 0.0,
            y: 0.0,
            w: default_layer_dim(),
            h: default_layer_dim(),
            z_index: 0,
            bind_key: None,
            kind,
        }
    }

    /// Layer box in logical pixels.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.w, self.y + self.h)
    }

    /// Inclusive point-in-box test in logical pixels.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.w && p.y >= self.y && p.y <= self.y + self.h
    }

    /// Text attributes, if this is a text layer.
    pub fn text_style(&self) -> Option<&TextStyle> {
        match &self.kind {
            LayerKind::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Mutable text attributes, if this is a text layer.
    pub fn text_style_mut(&mut self) -> Option<&mut TextStyle> {
        match &mut self.kind {
            LayerKind::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Whether this is an image layer bound to a field.
    pub fn is_bound_image(&self) -> bool {
        matches!(self.kind, LayerKind::Image(_)) && self.bind_key.is_some()
    }

    /// Short variant name used in logs.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            LayerKind::Shape(_) => "shape",
            LayerKind::Text(_) => "text",
            LayerKind::Image(_) => "image",
        }
    }
}

impl Default for Template {
    fn default() -> Self {
        let meta = Meta::default();
        Self::new(meta.width_mm, meta.height_mm)
    }
}

impl Template {
    /// Empty template with the given page size and a white background.
    pub fn new(width_mm: f64, height_mm: f64) -> Self {
        Self {
            meta: Meta {
                width_mm,
                height_mm,
                background_image: None,
            },
            background: Background::default(),
            fields: Vec::new(),
            layers: Vec::new(),
        }
    }

    /// Parse, normalize and validate a template from JSON text.
    #[tracing::instrument(skip(s), fields(len = s.len()))]
    pub fn from_json(s: &str) -> BadgeResult<Self> {
        let mut t: Self = serde_json::from_str(s)
            .map_err(|e| BadgeError::validation(format!("malformed template json: {e}")))?;
        t.normalize();
        t.validate()?;
        Ok(t)
    }

    /// Read a template from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> BadgeResult<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read template '{}'", path.display()))?;
        Self::from_json(&s)
    }

    /// Compact JSON snapshot.
    pub fn to_json(&self) -> BadgeResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Pretty-printed JSON, as published to the object store.
    pub fn to_json_pretty(&self) -> BadgeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Repair recoverable inconsistencies in older or hand-edited documents.
    ///
    /// Blank bind keys are dropped, and bind keys that reference no field get a field
    /// created for them (typed after the layer).
    pub fn normalize(&mut self) {
        for layer in &mut self.layers {
            if layer.bind_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
                layer.bind_key = None;
            }
        }
        let missing: Vec<(String, FieldType)> = self
            .layers
            .iter()
            .filter_map(|l| {
                let key = l.bind_key.as_ref()?;
                let kind = match l.kind {
                    LayerKind::Image(_) => FieldType::Image,
                    _ => FieldType::Text,
                };
                Some((key.clone(), kind))
            })
            .collect();
        for (key, kind) in missing {
            if self.field(&key).is_none() {
                tracing::debug!(key = %key, "adding field for dangling bind key");
                self.fields.push(FieldDef::new(key, kind));
            }
        }
    }

    /// Check entity invariants.
    pub fn validate(&self) -> BadgeResult<()> {
        let Meta {
            width_mm,
            height_mm,
            ..
        } = self.meta;
        if !width_mm.is_finite() || width_mm <= 0.0 || !height_mm.is_finite() || height_mm <= 0.0
        {
            return Err(BadgeError::validation(
                "meta widthMm/heightMm must be finite and > 0",
            ));
        }

        let mut keys = std::collections::HashSet::new();
        for f in &self.fields {
            if f.key.trim().is_empty() {
                return Err(BadgeError::validation("field key must be non-empty"));
            }
            if !keys.insert(f.key.as_str()) {
                return Err(BadgeError::validation(format!(
                    "duplicate field key \"{}\"",
                    f.key
                )));
            }
        }

        let mut ids = std::collections::HashSet::new();
        for l in &self.layers {
            if l.id.trim().is_empty() {
                return Err(BadgeError::validation("layer id must be non-empty"));
            }
            if !ids.insert(l.id.as_str()) {
                return Err(BadgeError::validation(format!(
                    "duplicate layer id \"{}\"",
                    l.id
                )));
            }
            if !(l.x.is_finite() && l.y.is_finite()) {
                return Err(BadgeError::validation(format!(
                    "layer \"{}\" position must be finite",
                    l.id
                )));
            }
            if !l.w.is_finite() || l.w <= 0.0 || !l.h.is_finite() || l.h <= 0.0 {
                return Err(BadgeError::validation(format!(
                    "layer \"{}\" w/h must be finite and > 0",
                    l.id
                )));
            }
            if let Some(key) = &l.bind_key
                && !keys.contains(key.as_str())
            {
                return Err(BadgeError::validation(format!(
                    "layer \"{}\" binds unknown field \"{key}\"",
                    l.id
                )));
            }
            match &l.kind {
                LayerKind::Text(t) => {
                    if !t.font_size.is_finite() || t.font_size <= 0.0 {
                        return Err(BadgeError::validation(format!(
                            "layer \"{}\" fontSize must be finite and > 0",
                            l.id
                        )));
                    }
                    if t.static_text.is_some() && l.bind_key.is_some() {
                        return Err(BadgeError::validation(format!(
                            "text layer \"{}\" must use either staticText or bindKey",
                            l.id
                        )));
                    }
                }
                LayerKind::Image(i) => {
                    if let Some(r) = i.border_radius
                        && (!r.is_finite() || r < 0.0)
                    {
                        return Err(BadgeError::validation(format!(
                            "layer \"{}\" borderRadius must be finite and >= 0",
                            l.id
                        )));
                    }
                }
                LayerKind::Shape(_) => {}
            }
        }
        Ok(())
    }

    /// Logical page size in pixels.
    pub fn page_size_px(&self) -> Size {
        Size::new(mm_to_px(self.meta.width_mm), mm_to_px(self.meta.height_mm))
    }

    /// Look up a field by key.
    pub fn field(&self, key: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Look up a layer by id.
    pub fn layer(&self, id: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// Look up a layer by id for mutation.
    pub fn layer_mut(&mut self, id: &str) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    /// Layers in paint order: ascending `zIndex`, ties keep authoring order.
    pub fn layers_in_paint_order(&self) -> Vec<&Layer> {
        let mut out: Vec<&Layer> = self.layers.iter().collect();
        out.sort_by_key(|l| l.z_index);
        out
    }

    /// Layers topmost first, the reverse of paint order.
    pub fn layers_top_down(&self) -> Vec<&Layer> {
        let mut out = self.layers_in_paint_order();
        out.reverse();
        out
    }

    /// Append a field, rejecting blank or duplicate keys.
    pub fn add_field(&mut self, field: FieldDef) -> BadgeResult<()> {
        if field.key.trim().is_empty() {
            return Err(BadgeError::validation("field key must be non-empty"));
        }
        if self.field(&field.key).is_some() {
            return Err(BadgeError::validation(format!(
                "duplicate field key \"{}\"",
                field.key
            )));
        }
        self.fields.push(field);
        Ok(())
    }

    /// Detach a layer.
    pub fn remove_layer(&mut self, id: &str) -> Option<Layer> {
        let i = self.layers.iter().position(|l| l.id == id)?;
        Some(self.layers.remove(i))
    }

    /// Remove a field and every layer bound to it.
    ///
    /// Returns the removed field and the removed layers, or `None` if no such field exists.
    pub fn remove_field(&mut self, key: &str) -> Option<(FieldDef, Vec<Layer>)> {
        let i = self.fields.iter().position(|f| f.key == key)?;
        let field = self.fields.remove(i);
        let (removed, kept): (Vec<Layer>, Vec<Layer>) = std::mem::take(&mut self.layers)
            .into_iter()
            .partition(|l| l.bind_key.as_deref() == Some(key));
        self.layers = kept;
        Some((field, removed))
    }

    /// Smallest `layer-N` id not used by any layer.
    pub fn next_layer_id(&self) -> String {
        (1..)
            .map(|n: u64| format!("layer-{n}"))
            .find(|id| self.layer(id).is_none())
            .unwrap_or_else(|| "layer".to_owned())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/template/model.rs"]
mod tests;
