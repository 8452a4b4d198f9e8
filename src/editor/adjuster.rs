use crate::foundation::core::{Point, Size, Vec2};
use crate::template::data::{DataRecord, PanZoom, ZOOM_MAX, ZOOM_MIN};
use crate::template::model::{Layer, Template};

/// Zoom multiplier per wheel step towards the user.
pub const ZOOM_IN_FACTOR: f64 = 1.05;
/// Zoom multiplier per wheel step away from the user.
pub const ZOOM_OUT_FACTOR: f64 = 0.95;

/// Photo adjustment gesture state.
#[derive(Clone, Debug, PartialEq)]
pub enum AdjusterState {
    /// Not panning.
    Idle,
    /// Dragging the photo inside its frame.
    PanningImage {
        /// Field whose [`crate::ImageValue`] is being adjusted.
        key: String,
        /// Layer frame size in logical pixels.
        frame: Size,
        /// Device-pixel pointer position at drag start.
        anchor: Point,
        /// Props at drag start.
        original: PanZoom,
    },
}

/// Maps pointer gestures over the rendered card to pan/zoom of bound photos.
///
/// Pointer positions are device pixels of the rendered raster; `render_scale` converts them to
/// logical pixels. Only the data record is mutated, never the template, and nothing is pushed
/// to an undo history.
#[derive(Clone, Debug)]
pub struct ImageAdjuster {
    render_scale: f64,
    state: AdjusterState,
}

impl ImageAdjuster {
    /// Adjuster for a raster rendered at `render_scale` device pixels per logical pixel.
    pub fn new(render_scale: f64) -> Self {
        let render_scale = if render_scale.is_finite() && render_scale > 0.0 {
            render_scale
        } else {
            1.0
        };
        Self {
            render_scale,
            state: AdjusterState::Idle,
        }
    }

    /// Current gesture state.
    pub fn state(&self) -> &AdjusterState {
        &self.state
    }

    /// Whether a pan is in progress.
    pub fn is_panning(&self) -> bool {
        matches!(self.state, AdjusterState::PanningImage { .. })
    }

    fn to_logical(&self, device: Point) -> Point {
        Point::new(device.x / self.render_scale, device.y / self.render_scale)
    }

    /// Topmost image layer under the pointer that is bound to a field holding a photo.
    pub fn hover_target<'t>(
        &self,
        template: &'t Template,
        data: &DataRecord,
        device: Point,
    ) -> Option<&'t Layer> {
        let p = self.to_logical(device);
        template.layers_top_down().into_iter().find(|l| {
            l.is_bound_image()
                && l.contains(p)
                && l.bind_key
                    .as_deref()
                    .and_then(|k| data.get(k))
                    .is_some_and(|v| v.image_source().is_some())
        })
    }

    /// Start panning the photo under the pointer. Returns the field key, or `None` on a miss.
    ///
    /// A raw source is upgraded to an [`crate::ImageValue`] with centered props.
    pub fn begin_pan(
        &mut self,
        template: &Template,
        data: &mut DataRecord,
        device: Point,
    ) -> Option<String> {
        let layer = self.hover_target(template, data, device)?;
        let key = layer.bind_key.clone()?;
        let frame = Size::new(layer.w, layer.h);
        let original = data.image_value_mut(&key)?.props.clamped();
        tracing::debug!(key = %key, "pan start");
        self.state = AdjusterState::PanningImage {
            key: key.clone(),
            frame,
            anchor: device,
            original,
        };
        Some(key)
    }

    /// Update the pan for a pointer at `device`. Returns whether props changed.
    pub fn pan_move(&mut self, data: &mut DataRecord, device: Point) -> bool {
        let AdjusterState::PanningImage {
            key,
            frame,
            anchor,
            original,
        } = &self.state
        else {
            return false;
        };
        let delta = (device - *anchor) / self.render_scale;
        let next = panned(*original, delta, *frame);
        match data.image_value_mut(key) {
            Some(v) => {
                v.props = next;
                true
            }
            None => false,
        }
    }

    /// Finish the pan. Returns whether one was in progress.
    pub fn end_pan(&mut self) -> bool {
        let was = self.is_panning();
        self.state = AdjusterState::Idle;
        was
    }

    /// Abort the pan, restoring the props it started from.
    pub fn cancel_pan(&mut self, data: &mut DataRecord) {
        if let AdjusterState::PanningImage { key, original, .. } =
            std::mem::replace(&mut self.state, AdjusterState::Idle)
            && let Some(v) = data.image_value_mut(&key)
        {
            v.props = original;
        }
    }

    /// One wheel step over the pointer. Returns the new zoom, or `None` if no photo is hovered.
    pub fn wheel(
        &mut self,
        template: &Template,
        data: &mut DataRecord,
        device: Point,
        scrolling_in: bool,
    ) -> Option<f64> {
        let key = self.hover_target(template, data, device)?.bind_key.clone()?;
        let v = data.image_value_mut(&key)?;
        v.props.zoom = zoom_step(v.props.zoom, scrolling_in);
        Some(v.props.zoom)
    }
}

/// Props after dragging by `delta` logical pixels over a frame of size `frame`.
///
/// Offsets move against the pointer, scaled by `1 / (frame * zoom)`, and stay within `[0, 1]`.
pub fn panned(original: PanZoom, delta: Vec2, frame: Size) -> PanZoom {
    let zoom = original.zoom;
    let mut out = original;
    if frame.width > 0.0 {
        out.x = original.x - delta.x / (frame.width * zoom);
    }
    if frame.height > 0.0 {
        out.y = original.y - delta.y / (frame.height * zoom);
    }
    out.clamped()
}

/// Zoom after one wheel step, kept within `[ZOOM_MIN, ZOOM_MAX]`.
pub fn zoom_step(zoom: f64, scrolling_in: bool) -> f64 {
    let factor = if scrolling_in {
        ZOOM_IN_FACTOR
    } else {
        ZOOM_OUT_FACTOR
    };
    let base = if zoom.is_finite() && zoom > 0.0 { zoom } else { 1.0 };
    (base * factor).clamp(ZOOM_MIN, ZOOM_MAX)
}

#[cfg(test)]
#[path = "../../tests/unit/editor/adjuster.rs"]
mod tests;
