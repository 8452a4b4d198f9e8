//! Badgekit composes fixed-size ID badges from layered templates and lets users edit them
//! directly on the rendered card.
//!
//! The public API follows the data flow:
//!
//! - Load and validate a [`Template`] (or decode one from a shared link)
//! - Compile it with a [`DataRecord`] into a [`CardPlan`] and rasterize it with a
//!   [`CardRenderer`]
//! - Export the [`FrameRGBA`] as PNG or PDF
//! - Edit the template through an [`EditorSession`], and adjust bound photos with an
//!   [`ImageAdjuster`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod compose;
mod foundation;
mod geometry;

/// Direct-manipulation editing.
pub mod editor;
/// PNG and PDF encoders.
pub mod export;
/// Raster backend and render session.
pub mod render;
/// Checkpoint and publishing collaborators.
pub mod storage;
/// Template document model.
pub mod template;

pub use crate::foundation::core::{Affine, BezPath, FrameRGBA, Point, Rect, Rgba8, Size, Vec2};
pub use crate::foundation::error::{BadgeError, BadgeResult};
pub use crate::foundation::units::{REFERENCE_DPI, device_px, mm_to_px, px_to_mm};

pub use crate::assets::decode::{
    PreparedImage, decode_bitmap, decode_image, downscale_image, rasterize_svg,
};
pub use crate::assets::fonts::{ShapedText, TextBrushRgba8, TextLayoutEngine};
pub use crate::assets::source::{
    ImageSource, RemoteFetcher, SourceResolver, normalize_rel_path, parse_source,
};
pub use crate::assets::store::{BitmapKey, BitmapStore};
pub use crate::compose::compiler::{
    DEFAULT_STATIC_TEXT, IMAGE_EMPTY_LABEL, IMAGE_ERROR_LABEL, compile_card, resolve_text,
};
pub use crate::compose::plan::{CardPlan, DrawOp, ImageClip, TextBaseline, TextRun};
pub use crate::geometry::fit::{FitPlacement, fit_image};

pub use crate::editor::adjuster::{ImageAdjuster, ZOOM_IN_FACTOR, ZOOM_OUT_FACTOR};
pub use crate::editor::controller::{
    EditorSession, Gesture, HANDLE_SIZE_PX, LayerPreset, MIN_FONT_SIZE, MIN_LAYER_SIZE,
    NUDGE_STEP, NUDGE_STEP_LARGE, NudgeDirection, PointerHit, ResizeHandle,
};
pub use crate::editor::history::{HISTORY_CAPACITY, History};
pub use crate::export::pdf::encode_pdf;
pub use crate::export::png::encode_png;
pub use crate::render::cpu::CpuBackend;
pub use crate::render::session::{
    CardRenderer, DEFAULT_RENDER_SCALE, RenderSettings, RenderSlot, RenderTicket,
};
pub use crate::storage::bootstrap::{
    InitialTemplate, LOCAL_TEMPLATE_KEY, TemplateOrigin, load_initial_template,
    load_latest_published, load_published, publish_template,
};
pub use crate::storage::kv::{FsKv, KeyValueStore, MemoryKv};
pub use crate::storage::objects::{FsObjectStore, MemoryObjectStore, ObjectStore};
pub use crate::template::data::{DataRecord, DataValue, ImageValue, PanZoom, ZOOM_MAX, ZOOM_MIN};
pub use crate::template::link::{decode_link, encode_link, slugify};
pub use crate::template::model::{
    Background, BackgroundKind, FieldDef, FieldType, FitMode, FontWeight, ImageStyle, Layer,
    LayerKind, Meta, ShapeStyle, ShapeType, Template, TextAlign, TextStyle,
};
