use std::collections::BTreeMap;

use crate::foundation::error::{BadgeError, BadgeResult};
use crate::template::model::{FieldType, Template};

/// Minimum interactive photo zoom.
pub const ZOOM_MIN: f64 = 0.1;
/// Maximum interactive photo zoom.
pub const ZOOM_MAX: f64 = 10.0;

/// User pan/zoom of a bound photo inside its fixed layer frame.
///
/// `x`/`y` are fractional pan offsets (`0.5` = centered), `zoom > 1` magnifies.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PanZoom {
    /// Horizontal pan offset in `[0, 1]`.
    #[serde(default = "half")]
    pub x: f64,
    /// Vertical pan offset in `[0, 1]`.
    #[serde(default = "half")]
    pub y: f64,
    /// Magnification in `[ZOOM_MIN, ZOOM_MAX]`.
    #[serde(default = "one")]
    pub zoom: f64,
}

fn half() -> f64 {
    0.5
}

fn one() -> f64 {
    1.0
}

impl Default for PanZoom {
    fn default() -> Self {
        Self {
            x: 0.5,
            y: 0.5,
            zoom: 1.0,
        }
    }
}

impl PanZoom {
    /// Return a copy with offsets in `[0, 1]` and zoom in `[ZOOM_MIN, ZOOM_MAX]`.
    ///
    /// Non-finite components fall back to their defaults.
    pub fn clamped(self) -> Self {
        fn unit(v: f64) -> f64 {
            if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.5 }
        }
        let zoom = if self.zoom.is_finite() && self.zoom > 0.0 {
            self.zoom.clamp(ZOOM_MIN, ZOOM_MAX)
        } else {
            1.0
        };
        Self {
            x: unit(self.x),
            y: unit(self.y),
            zoom,
        }
    }
}

/// Runtime value of an image field that the user has adjusted interactively.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ImageValue {
    /// Bitmap source (data URI, relative path or URL).
    pub value: String,
    /// Pan/zoom applied when fitting the bitmap.
    #[serde(default)]
    pub props: PanZoom,
}

impl ImageValue {
    /// Wrap a source with centered, unzoomed props.
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            value: src.into(),
            props: PanZoom::default(),
        }
    }
}

/// A value bound to one field.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    /// Plain string.
    Text(String),
    /// Plain number.
    Number(f64),
    /// Photo with pan/zoom props.
    Image(ImageValue),
}

impl DataValue {
    /// String shown by a text layer bound to this value.
    pub fn display_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => format_number(*n),
            Self::Image(v) => v.value.clone(),
        }
    }

    /// Bitmap source and props for an image layer bound to this value.
    ///
    /// Empty sources count as "no source".
    pub fn image_source(&self) -> Option<(&str, PanZoom)> {
        let (src, props) = match self {
            Self::Text(s) => (s.as_str(), PanZoom::default()),
            Self::Image(v) => (v.value.as_str(), v.props),
            Self::Number(_) => return None,
        };
        if src.trim().is_empty() {
            None
        } else {
            Some((src, props))
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// A mapping from field key to bound value, consumed by the compositor.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct DataRecord(BTreeMap<String, DataValue>);

impl DataRecord {
    /// Empty record: every bound layer renders its placeholder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a record from a JSON object.
    pub fn from_json(s: &str) -> BadgeResult<Self> {
        serde_json::from_str(s)
            .map_err(|e| BadgeError::validation(format!("malformed data record: {e}")))
    }

    /// Initial generator record: `select` fields default to their first option.
    pub fn for_template(template: &Template) -> Self {
        let mut out = Self::new();
        for f in &template.fields {
            if f.kind == FieldType::Select {
                let first = f.options.first().cloned().unwrap_or_default();
                out.set_text(&f.key, first);
            }
        }
        out
    }

    /// Editor preview record: `"[Label]"` for every non-image field.
    pub fn placeholder(template: &Template) -> Self {
        let mut out = Self::new();
        for f in &template.fields {
            if f.kind != FieldType::Image {
                out.set_text(&f.key, format!("[{}]", f.display_label()));
            }
        }
        out
    }

    /// Value bound to `key`.
    pub fn get(&self, key: &str) -> Option<&DataValue> {
        self.0.get(key)
    }

    /// Whether `key` has a value.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Bind an arbitrary value.
    pub fn insert(&mut self, key: impl Into<String>, value: DataValue) {
        self.0.insert(key.into(), value);
    }

    /// Bind a string.
    pub fn set_text(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.insert(key, DataValue::Text(value.into()));
    }

    /// Bind a number.
    pub fn set_number(&mut self, key: impl Into<String>, value: f64) {
        self.insert(key, DataValue::Number(value));
    }

    /// Bind a raw image source, discarding any previous pan/zoom.
    pub fn set_image(&mut self, key: impl Into<String>, src: impl Into<String>) {
        self.insert(key, DataValue::Text(src.into()));
    }

    /// Remove a binding.
    pub fn remove(&mut self, key: &str) -> Option<DataValue> {
        self.0.remove(key)
    }

    /// Mutable [`ImageValue`] for `key`, upgrading a raw source to one with default props.
    ///
    /// Returns `None` when the key is unbound, numeric, or has an empty source.
    pub fn image_value_mut(&mut self, key: &str) -> Option<&mut ImageValue> {
        let slot = self.0.get_mut(key)?;
        if let DataValue::Text(src) = slot {
            if src.trim().is_empty() {
                return None;
            }
            *slot = DataValue::Image(ImageValue::new(std::mem::take(src)));
        }
        match slot {
            DataValue::Image(v) if !v.value.trim().is_empty() => Some(v),
            _ => None,
        }
    }

    /// Iterate bindings in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &DataValue)> {
        self.0.iter()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/template/data.rs"]
mod tests;
