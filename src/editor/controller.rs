use crate::editor::history::History;
use crate::foundation::core::{Point, Rect, Size, Vec2};
use crate::foundation::error::{BadgeError, BadgeResult};
use crate::storage::bootstrap::save_local;
use crate::storage::kv::KeyValueStore;
use crate::template::data::DataRecord;
use crate::template::model::{
    Background, FieldDef, FieldType, FitMode, FontWeight, ImageStyle, Layer, LayerKind,
    ShapeStyle, ShapeType, Template, TextStyle,
};

/// Smallest width or height a resize can produce, in logical pixels.
pub const MIN_LAYER_SIZE: f64 = 10.0;
/// Smallest font size text autoscale can produce.
pub const MIN_FONT_SIZE: f64 = 4.0;
/// Side of a square resize handle, in display pixels.
pub const HANDLE_SIZE_PX: f64 = 12.0;
/// Keyboard nudge distance in logical pixels.
pub const NUDGE_STEP: f64 = 1.0;
/// Keyboard nudge distance with the modifier held.
pub const NUDGE_STEP_LARGE: f64 = 10.0;

// Font size assumed for a text layer that somehow has none.
const FALLBACK_FONT_SIZE: f64 = 16.0;

/// Corner handle of the selection box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeHandle {
    /// Top-left.
    Nw,
    /// Top-right.
    Ne,
    /// Bottom-right.
    Se,
    /// Bottom-left.
    Sw,
}

impl ResizeHandle {
    /// All handles, clockwise from top-left.
    pub const ALL: [Self; 4] = [Self::Nw, Self::Ne, Self::Se, Self::Sw];

    fn west(self) -> bool {
        matches!(self, Self::Nw | Self::Sw)
    }

    fn north(self) -> bool {
        matches!(self, Self::Nw | Self::Ne)
    }

    fn corner(self, r: Rect) -> Point {
        match self {
            Self::Nw => Point::new(r.x0, r.y0),
            Self::Ne => Point::new(r.x1, r.y0),
            Self::Se => Point::new(r.x1, r.y1),
            Self::Sw => Point::new(r.x0, r.y1),
        }
    }
}

/// Arrow-key direction for [`EditorSession::nudge`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NudgeDirection {
    /// Decrease `x`.
    Left,
    /// Increase `x`.
    Right,
    /// Decrease `y`.
    Up,
    /// Increase `y`.
    Down,
}

/// What a pointer-down landed on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PointerHit {
    /// A resize handle of the selected layer; a resize gesture started.
    Handle(ResizeHandle),
    /// A layer body; it is now selected and a drag gesture started.
    Layer(String),
    /// Empty canvas; the selection was cleared.
    Nothing,
}

/// In-progress direct-manipulation gesture.
#[derive(Clone, Debug, PartialEq)]
pub enum Gesture {
    /// No pointer button held.
    Idle,
    /// Moving a layer.
    Dragging {
        /// Layer being moved.
        layer: String,
        /// Logical pointer position at pointer-down.
        anchor: Point,
        /// Layer origin at pointer-down.
        origin: Point,
        /// Whether any pointer-move changed the geometry.
        moved: bool,
    },
    /// Resizing a layer from one corner.
    Resizing {
        /// Layer being resized.
        layer: String,
        /// Handle grabbed.
        handle: ResizeHandle,
        /// Logical pointer position at pointer-down.
        anchor: Point,
        /// Layer box at pointer-down.
        original: Rect,
        /// Exact layer size at pointer-down.
        original_size: Size,
        /// Font size at pointer-down, for text layers.
        original_font: Option<f64>,
        /// Whether any pointer-move changed the geometry.
        moved: bool,
    },
}

/// Layer to add with [`EditorSession::add_layer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayerPreset {
    /// Text bound to `key`; a text field is created when missing.
    TextField {
        /// Field key.
        key: String,
    },
    /// Literal bold "TEXT".
    StaticText,
    /// Blue rectangle.
    ShapeRect,
    /// Photo bound to `key`; an image field is created when missing.
    ImageField {
        /// Field key.
        key: String,
    },
}

/// Explicit editing session: the template, its selection, undo history and the active gesture.
///
/// Pointer positions are in display pixels (canvas pixels times `display_zoom`). Every committed
/// edit pushes a history snapshot and checkpoints the template to the key-value store when one
/// is attached. Continuous gestures push once, on pointer-up.
pub struct EditorSession {
    template: Template,
    selection: Option<String>,
    history: History,
    gesture: Gesture,
    display_zoom: f64,
    kv: Option<Box<dyn KeyValueStore>>,
    nudged: bool,
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("selection", &self.selection)
            .field("gesture", &self.gesture)
            .field("history_len", &self.history.len())
            .field("history_index", &self.history.index())
            .field("display_zoom", &self.display_zoom)
            .finish_non_exhaustive()
    }
}

impl EditorSession {
    /// Start editing `template`, seeding history with it.
    pub fn new(template: Template) -> BadgeResult<Self> {
        let mut s = Self {
            template: Template::default(),
            selection: None,
            history: History::new(),
            gesture: Gesture::Idle,
            display_zoom: 1.0,
            kv: None,
            nudged: false,
        };
        s.load_template(template)?;
        Ok(s)
    }

    /// Attach a store that receives a checkpoint after every committed edit.
    pub fn with_kv(mut self, kv: Box<dyn KeyValueStore>) -> Self {
        self.kv = Some(kv);
        self
    }

    /// Replace the document wholesale, resetting history to a single snapshot.
    pub fn load_template(&mut self, mut template: Template) -> BadgeResult<()> {
        template.normalize();
        template.validate()?;
        self.template = template;
        self.selection = None;
        self.gesture = Gesture::Idle;
        self.nudged = false;
        self.history.clear();
        self.history.push(&self.template)?;
        Ok(())
    }

    /// Live template.
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Undo history.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Active gesture.
    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    /// Attached checkpoint store.
    pub fn kv(&self) -> Option<&dyn KeyValueStore> {
        self.kv.as_deref()
    }

    /// Selected layer id.
    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    /// Selected layer.
    pub fn selected_layer(&self) -> Option<&Layer> {
        self.template.layer(self.selection.as_deref()?)
    }

    /// Select a layer by id, or clear the selection with `None`. Unknown ids clear it.
    pub fn select(&mut self, id: Option<&str>) {
        self.selection = id
            .filter(|id| self.template.layer(id).is_some())
            .map(str::to_owned);
    }

    /// Display pixels per logical pixel.
    pub fn display_zoom(&self) -> f64 {
        self.display_zoom
    }

    /// Set the display zoom; non-finite or non-positive values are ignored.
    pub fn set_display_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() && zoom > 0.0 {
            self.display_zoom = zoom;
        }
    }

    fn to_logical(&self, p: Point) -> Point {
        Point::new(p.x / self.display_zoom, p.y / self.display_zoom)
    }

    /// Topmost layer containing the logical point.
    pub fn layer_at(&self, logical: Point) -> Option<&Layer> {
        self.template
            .layers_top_down()
            .into_iter()
            .find(|l| l.contains(logical))
    }

    /// Selection box in display pixels.
    pub fn selection_box(&self) -> Option<Rect> {
        let r = self.selected_layer()?.rect();
        Some(r.scale_from_origin(self.display_zoom))
    }

    /// Handle squares in display pixels, centered on the selection box corners.
    pub fn handle_rects(&self) -> Vec<(ResizeHandle, Rect)> {
        let Some(sel) = self.selection_box() else {
            return Vec::new();
        };
        let half = HANDLE_SIZE_PX / 2.0;
        ResizeHandle::ALL
            .iter()
            .map(|&h| {
                let c = h.corner(sel);
                (h, Rect::new(c.x - half, c.y - half, c.x + half, c.y + half))
            })
            .collect()
    }

    fn handle_at(&self, display: Point) -> Option<ResizeHandle> {
        self.handle_rects()
            .into_iter()
            .find(|(_, r)| {
                display.x >= r.x0 && display.x <= r.x1 && display.y >= r.y0 && display.y <= r.y1
            })
            .map(|(h, _)| h)
    }

    /// Begin a gesture at a display-pixel position.
    ///
    /// Handles of the current selection win over layer bodies; bodies are tested topmost
    /// first. A miss clears the selection.
    pub fn pointer_down(&mut self, display: Point) -> PointerHit {
        self.flush_nudges();
        let logical = self.to_logical(display);

        if let Some(handle) = self.handle_at(display)
            && let Some(layer) = self.selected_layer()
        {
            self.gesture = Gesture::Resizing {
                layer: layer.id.clone(),
                handle,
                anchor: logical,
                original: layer.rect(),
                original_size: Size::new(layer.w, layer.h),
                original_font: layer.text_style().map(|t| t.font_size),
                moved: false,
            };
            return PointerHit::Handle(handle);
        }

        match self.layer_at(logical).map(|l| (l.id.clone(), Point::new(l.x, l.y))) {
            Some((id, origin)) => {
                self.selection = Some(id.clone());
                self.gesture = Gesture::Dragging {
                    layer: id.clone(),
                    anchor: logical,
                    origin,
                    moved: false,
                };
                PointerHit::Layer(id)
            }
            None => {
                self.selection = None;
                self.gesture = Gesture::Idle;
                PointerHit::Nothing
            }
        }
    }

    /// Update the active gesture. Returns whether the template changed.
    pub fn pointer_move(&mut self, display: Point) -> bool {
        let logical = self.to_logical(display);
        match &mut self.gesture {
            Gesture::Idle => false,
            Gesture::Dragging {
                layer,
                anchor,
                origin,
                moved,
            } => {
                let d: Vec2 = logical - *anchor;
                let Some(l) = self.template.layer_mut(layer) else {
                    return false;
                };
                l.x = origin.x + d.x;
                l.y = origin.y + d.y;
                *moved = l.x != origin.x || l.y != origin.y;
                true
            }
            Gesture::Resizing {
                layer,
                handle,
                anchor,
                original,
                original_size,
                original_font,
                moved,
            } => {
                let d: Vec2 = logical - *anchor;
                let Some(l) = self.template.layer_mut(layer) else {
                    return false;
                };
                if d == Vec2::ZERO {
                    restore_box(l, *original, *original_size, *original_font);
                    *moved = false;
                    return true;
                }
                apply_resize(l, *handle, *original, d);
                let new_h = l.h;
                let mut font_changed = false;
                if let (Some(font), Some(t)) = (*original_font, l.text_style_mut()) {
                    let base = if font > 0.0 { font } else { FALLBACK_FONT_SIZE };
                    t.font_size = autoscaled_font(base, original_size.height, new_h);
                    font_changed = t.font_size != font;
                }
                *moved = l.x != original.x0
                    || l.y != original.y0
                    || l.w != original_size.width
                    || l.h != original_size.height
                    || font_changed;
                true
            }
        }
    }

    /// Finish the active gesture, pushing history if anything moved.
    pub fn pointer_up(&mut self) -> BadgeResult<bool> {
        let moved = match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Idle => false,
            Gesture::Dragging { moved, .. } | Gesture::Resizing { moved, .. } => moved,
        };
        if moved {
            self.commit()?;
        }
        Ok(moved)
    }

    /// Abort the active gesture, restoring the geometry it started from. No history entry.
    pub fn pointer_cancel(&mut self) {
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Idle => {}
            Gesture::Dragging { layer, origin, .. } => {
                if let Some(l) = self.template.layer_mut(&layer) {
                    l.x = origin.x;
                    l.y = origin.y;
                }
            }
            Gesture::Resizing {
                layer,
                original,
                original_size,
                original_font,
                ..
            } => {
                if let Some(l) = self.template.layer_mut(&layer) {
                    restore_box(l, original, original_size, original_font);
                }
            }
        }
    }

    /// Move the selection by one step, or ten with `large`. Returns whether anything moved.
    ///
    /// Nudges are not pushed to history one by one; see [`EditorSession::commit_nudges`].
    pub fn nudge(&mut self, dir: NudgeDirection, large: bool) -> bool {
        let step = if large { NUDGE_STEP_LARGE } else { NUDGE_STEP };
        let Some(id) = self.selection.clone() else {
            return false;
        };
        let Some(l) = self.template.layer_mut(&id) else {
            return false;
        };
        match dir {
            NudgeDirection::Left => l.x -= step,
            NudgeDirection::Right => l.x += step,
            NudgeDirection::Up => l.y -= step,
            NudgeDirection::Down => l.y += step,
        }
        self.nudged = true;
        true
    }

    /// Push a single history entry for all nudges since the last commit.
    pub fn commit_nudges(&mut self) -> BadgeResult<bool> {
        if !self.nudged {
            return Ok(false);
        }
        self.commit()?;
        Ok(true)
    }

    fn flush_nudges(&mut self) {
        if let Err(e) = self.commit_nudges() {
            tracing::warn!(error = %e, "failed to record nudges");
        }
    }

    /// Delete the selected layer.
    pub fn delete_selected(&mut self) -> BadgeResult<Option<Layer>> {
        match self.selection.clone() {
            Some(id) => self.delete_layer(&id),
            None => Ok(None),
        }
    }

    /// Delete a layer by id.
    pub fn delete_layer(&mut self, id: &str) -> BadgeResult<Option<Layer>> {
        self.flush_nudges();
        let removed = self.template.remove_layer(id);
        if removed.is_some() {
            self.selection = None;
            self.commit()?;
        }
        Ok(removed)
    }

    /// Add a field definition.
    pub fn add_field(&mut self, field: FieldDef) -> BadgeResult<()> {
        self.flush_nudges();
        self.template.add_field(field)?;
        self.commit()
    }

    /// Delete a field and every layer bound to it. Returns the ids of the removed layers.
    pub fn delete_field(&mut self, key: &str) -> BadgeResult<Vec<String>> {
        self.flush_nudges();
        let Some((_, layers)) = self.template.remove_field(key) else {
            return Ok(Vec::new());
        };
        let ids: Vec<String> = layers.into_iter().map(|l| l.id).collect();
        if self
            .selection
            .as_ref()
            .is_some_and(|s| ids.iter().any(|id| id == s))
        {
            self.selection = None;
        }
        tracing::debug!(key, removed = ids.len(), "field deleted");
        self.commit()?;
        Ok(ids)
    }

    /// Add a preset layer at (10, 10) above everything, select it and return its id.
    pub fn add_layer(&mut self, preset: LayerPreset) -> BadgeResult<String> {
        self.flush_nudges();
        let id = self.template.next_layer_id();
        let (kind, bind, size) = match preset {
            LayerPreset::TextField { key } => {
                self.ensure_field(&key, FieldType::Text)?;
                let style = TextStyle {
                    font_size: 14.0,
                    color: "#000000".to_owned(),
                    ..TextStyle::default()
                };
                (LayerKind::Text(style), Some(key), (100.0, 20.0))
            }
            LayerPreset::StaticText => {
                let style = TextStyle {
                    static_text: Some("TEXT".to_owned()),
                    font_size: 18.0,
                    font_weight: FontWeight::Bold,
                    color: "#000000".to_owned(),
                    ..TextStyle::default()
                };
                (LayerKind::Text(style), None, (80.0, 20.0))
            }
            LayerPreset::ShapeRect => {
                let style = ShapeStyle {
                    shape_type: ShapeType::Rect,
                    fill: "#3b82f6".to_owned(),
                };
                (LayerKind::Shape(style), None, (100.0, 20.0))
            }
            LayerPreset::ImageField { key } => {
                self.ensure_field(&key, FieldType::Image)?;
                let style = ImageStyle {
                    object_fit: FitMode::Cover,
                    ..ImageStyle::default()
                };
                (LayerKind::Image(style), Some(key), (80.0, 80.0))
            }
        };

        let mut layer = Layer::new(id.clone(), kind);
        layer.x = 10.0;
        layer.y = 10.0;
        (layer.w, layer.h) = size;
        layer.z_index = i64::try_from(self.template.layers.len()).unwrap_or(i64::MAX - 10) + 10;
        layer.bind_key = bind;
        self.template.layers.push(layer);
        self.selection = Some(id.clone());
        self.commit()?;
        Ok(id)
    }

    fn ensure_field(&mut self, key: &str, kind: FieldType) -> BadgeResult<()> {
        if key.trim().is_empty() {
            return Err(BadgeError::validation("field key must be non-empty"));
        }
        if self.template.field(key).is_none() {
            self.template.fields.push(FieldDef::new(key, kind));
        }
        Ok(())
    }

    /// Raise (`+1`) or lower (`-1`) the selected layer's `zIndex`.
    pub fn change_z_index(&mut self, delta: i64) -> BadgeResult<bool> {
        self.flush_nudges();
        let Some(id) = self.selection.clone() else {
            return Ok(false);
        };
        let Some(l) = self.template.layer_mut(&id) else {
            return Ok(false);
        };
        l.z_index = l.z_index.saturating_add(delta);
        self.commit()?;
        Ok(true)
    }

    /// Edit a layer's properties through `f`.
    ///
    /// The id cannot change. If the edited template fails validation the edit is rolled back
    /// and the error returned.
    pub fn update_layer(&mut self, id: &str, f: impl FnOnce(&mut Layer)) -> BadgeResult<()> {
        self.flush_nudges();
        let Some(i) = self.template.layers.iter().position(|l| l.id == id) else {
            return Err(BadgeError::validation(format!("no layer \"{id}\"")));
        };
        let before = self.template.layers[i].clone();
        let layer = &mut self.template.layers[i];
        f(layer);
        layer.id = before.id.clone();
        if let Err(e) = self.template.validate() {
            self.template.layers[i] = before;
            return Err(e);
        }
        self.commit()
    }

    /// Use an image as background, keeping the current fit.
    pub fn set_background_image(&mut self, src: impl Into<String>) -> BadgeResult<()> {
        let fit = self.template.background.fit;
        self.set_background(Background::image(src, fit))
    }

    /// Change how a background image is fitted.
    pub fn set_background_fit(&mut self, fit: FitMode) -> BadgeResult<()> {
        let mut bg = self.template.background.clone();
        bg.fit = fit;
        self.set_background(bg)
    }

    /// Solid background color.
    pub fn set_background_color(&mut self, hex: &str) -> BadgeResult<()> {
        crate::foundation::core::Rgba8::parse(hex)?;
        self.set_background(Background::color(hex))
    }

    /// Reset to the default white background.
    pub fn remove_background(&mut self) -> BadgeResult<()> {
        self.set_background(Background::default())
    }

    fn set_background(&mut self, bg: Background) -> BadgeResult<()> {
        self.flush_nudges();
        self.template.background = bg;
        self.template.meta.background_image = None;
        self.commit()
    }

    /// Change the physical page size.
    pub fn set_page_size(&mut self, width_mm: f64, height_mm: f64) -> BadgeResult<()> {
        if !(width_mm.is_finite() && width_mm > 0.0 && height_mm.is_finite() && height_mm > 0.0) {
            return Err(BadgeError::validation(
                "page widthMm/heightMm must be finite and > 0",
            ));
        }
        self.flush_nudges();
        self.template.meta.width_mm = width_mm;
        self.template.meta.height_mm = height_mm;
        self.commit()
    }

    /// Step back in history. Returns whether the template changed.
    pub fn undo(&mut self) -> BadgeResult<bool> {
        self.flush_nudges();
        let restored = self.history.undo()?;
        self.restore(restored)
    }

    /// Step forward in history. Returns whether the template changed.
    pub fn redo(&mut self) -> BadgeResult<bool> {
        self.flush_nudges();
        let restored = self.history.redo()?;
        self.restore(restored)
    }

    fn restore(&mut self, restored: Option<Template>) -> BadgeResult<bool> {
        let Some(t) = restored else {
            return Ok(false);
        };
        self.template = t;
        self.selection = None;
        self.gesture = Gesture::Idle;
        self.checkpoint();
        Ok(true)
    }

    /// Placeholder record for editor previews: `"[Label]"` per non-image field.
    pub fn preview_record(&self) -> DataRecord {
        DataRecord::placeholder(&self.template)
    }

    fn commit(&mut self) -> BadgeResult<()> {
        self.nudged = false;
        self.history.push(&self.template)?;
        self.checkpoint();
        Ok(())
    }

    fn checkpoint(&mut self) {
        if let Some(kv) = self.kv.as_deref_mut()
            && let Err(e) = save_local(kv, &self.template)
        {
            tracing::warn!(error = %e, "template checkpoint failed");
        }
    }
}

/// Apply a corner resize of `d` logical pixels to `layer`, starting from `original`.
///
/// Width and height never drop below [`MIN_LAYER_SIZE`]. West and north edges follow the
/// pointer while the box is above the floor; at the floor the opposite edge stays put.
pub fn apply_resize(layer: &mut Layer, handle: ResizeHandle, original: Rect, d: Vec2) {
    let (ow, oh) = (original.width(), original.height());
    if handle.west() {
        let w = (ow - d.x).max(MIN_LAYER_SIZE);
        layer.w = w;
        layer.x = if w > MIN_LAYER_SIZE {
            original.x0 + d.x
        } else {
            original.x1 - MIN_LAYER_SIZE
        };
    } else {
        layer.w = (ow + d.x).max(MIN_LAYER_SIZE);
        layer.x = original.x0;
    }
    if handle.north() {
        let h = (oh - d.y).max(MIN_LAYER_SIZE);
        layer.h = h;
        layer.y = if h > MIN_LAYER_SIZE {
            original.y0 + d.y
        } else {
            original.y1 - MIN_LAYER_SIZE
        };
    } else {
        layer.h = (oh + d.y).max(MIN_LAYER_SIZE);
        layer.y = original.y0;
    }
}

fn restore_box(l: &mut Layer, origin: Rect, size: Size, font: Option<f64>) {
    l.x = origin.x0;
    l.y = origin.y0;
    l.w = size.width;
    l.h = size.height;
    if let (Some(font), Some(t)) = (font, l.text_style_mut()) {
        t.font_size = font;
    }
}

/// Font size after resizing a text box from `original_h` to `new_h`.
///
/// An unchanged height keeps the font size as is.
pub fn autoscaled_font(original_font: f64, original_h: f64, new_h: f64) -> f64 {
    if original_h.is_nan() || original_h <= 0.0 || new_h == original_h {
        return original_font;
    }
    (original_font * new_h / original_h).round().max(MIN_FONT_SIZE)
}

#[cfg(test)]
#[path = "../../tests/unit/editor/controller.rs"]
mod tests;
