use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::assets::fonts::TextLayoutEngine;
use crate::assets::source::{RemoteFetcher, SourceResolver};
use crate::assets::store::BitmapStore;
use crate::compose::compiler::compile_card;
use crate::compose::plan::CardPlan;
use crate::foundation::core::FrameRGBA;
use crate::foundation::error::BadgeResult;
use crate::render::cpu::CpuBackend;
use crate::template::data::DataRecord;
use crate::template::model::Template;

/// Default oversampling factor from logical to device pixels.
pub const DEFAULT_RENDER_SCALE: f64 = 2.0;

/// Rendering configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderSettings {
    /// Oversampling factor applied to every logical coordinate.
    pub render_scale: f64,
    /// Root that relative image paths resolve against.
    pub assets_root: PathBuf,
    /// Directory of `.ttf`/`.otf` files used for text.
    pub fonts_dir: Option<PathBuf>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            render_scale: DEFAULT_RENDER_SCALE,
            assets_root: PathBuf::from("."),
            fonts_dir: None,
        }
    }
}

impl RenderSettings {
    /// Defaults overridden by `BADGEKIT_RENDER_SCALE`, `BADGEKIT_ASSETS_ROOT` and
    /// `BADGEKIT_FONTS_DIR`. Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut out = Self::default();
        if let Some(scale) = std::env::var("BADGEKIT_RENDER_SCALE")
            .ok()
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v > 0.0)
        {
            out.render_scale = scale;
        }
        if let Some(root) = std::env::var_os("BADGEKIT_ASSETS_ROOT").filter(|v| !v.is_empty()) {
            out.assets_root = PathBuf::from(root);
        }
        if let Some(dir) = std::env::var_os("BADGEKIT_FONTS_DIR").filter(|v| !v.is_empty()) {
            out.fonts_dir = Some(PathBuf::from(dir));
        }
        out
    }
}

/// Owns the bitmap cache and raster backend used to render cards.
///
/// Re-rendering a card whose plan is unchanged returns the previous frame without rasterizing.
#[derive(Debug)]
pub struct CardRenderer {
    settings: RenderSettings,
    store: BitmapStore,
    backend: CpuBackend,
    last: Option<(u64, FrameRGBA)>,
}

impl CardRenderer {
    /// Renderer for `settings`, loading fonts from `fonts_dir` when set.
    ///
    /// A missing or unreadable fonts directory is logged; text is then not drawn.
    pub fn new(settings: RenderSettings) -> Self {
        let mut text_engine = TextLayoutEngine::new();
        if let Some(dir) = &settings.fonts_dir {
            match text_engine.load_dir(dir) {
                Ok(0) => tracing::warn!(dir = %dir.display(), "no fonts found"),
                Ok(n) => tracing::debug!(dir = %dir.display(), faces = n, "fonts loaded"),
                Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "fonts not loaded"),
            }
        }
        let store = BitmapStore::new(SourceResolver::new(settings.assets_root.clone()));
        Self {
            settings,
            store,
            backend: CpuBackend::new(text_engine),
            last: None,
        }
    }

    /// Use `fetcher` for `http(s)` image sources.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn RemoteFetcher>) -> Self {
        let resolver = self.store.resolver().clone().with_fetcher(fetcher);
        self.store = BitmapStore::new(resolver);
        self
    }

    /// Active settings.
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Bitmap cache, e.g. to pre-seed decoded images.
    pub fn store_mut(&mut self) -> &mut BitmapStore {
        &mut self.store
    }

    /// Raster backend, e.g. to register fonts.
    pub fn backend_mut(&mut self) -> &mut CpuBackend {
        &mut self.backend
    }

    /// Compile without rasterizing.
    pub fn compile(&mut self, template: &Template, data: &DataRecord) -> BadgeResult<CardPlan> {
        compile_card(template, data, &mut self.store, self.settings.render_scale)
    }

    /// Compile and rasterize one card.
    #[tracing::instrument(skip(self, template, data))]
    pub fn render(&mut self, template: &Template, data: &DataRecord) -> BadgeResult<FrameRGBA> {
        let plan = self.compile(template, data)?;
        self.render_plan(&plan)
    }

    /// Rasterize an already compiled plan.
    pub fn render_plan(&mut self, plan: &CardPlan) -> BadgeResult<FrameRGBA> {
        let fp = plan.fingerprint();
        if let Some((last_fp, frame)) = &self.last
            && *last_fp == fp
        {
            tracing::debug!(fingerprint = fp, "plan unchanged, reusing frame");
            return Ok(frame.clone());
        }
        let frame = self.backend.render(plan, &self.store)?;
        self.last = Some((fp, frame.clone()));
        Ok(frame)
    }
}

/// Ticket identifying one render request issued on a [`RenderSlot`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct RenderTicket(u64);

impl RenderTicket {
    /// Monotonic generation number.
    pub fn generation(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
struct SlotState {
    committed: u64,
    frame: Option<Arc<FrameRGBA>>,
}

/// Latest-wins holder for the frame shown on one surface.
///
/// Every request takes a ticket with [`RenderSlot::begin`]. Only the most recently issued
/// ticket may [`commit`](RenderSlot::commit); a superseded render is dropped when it resolves,
/// so an older result never overwrites a newer one.
#[derive(Debug, Default)]
pub struct RenderSlot {
    issued: AtomicU64,
    state: Mutex<SlotState>,
}

impl RenderSlot {
    /// Empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket for a new render, superseding any pending one.
    pub fn begin(&self) -> RenderTicket {
        RenderTicket(self.issued.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Whether `ticket` is still the latest request.
    pub fn is_current(&self, ticket: RenderTicket) -> bool {
        self.issued.load(Ordering::Acquire) == ticket.0
    }

    /// Store `frame` if `ticket` is still the latest request. Returns whether it was accepted.
    pub fn commit(&self, ticket: RenderTicket, frame: FrameRGBA) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !self.is_current(ticket) || ticket.0 <= state.committed {
            tracing::debug!(generation = ticket.0, "discarding superseded render");
            return false;
        }
        state.committed = ticket.0;
        state.frame = Some(Arc::new(frame));
        true
    }

    /// Most recently committed frame.
    pub fn frame(&self) -> Option<Arc<FrameRGBA>> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .frame
            .clone()
    }

    /// Generation of the most recently committed frame (0 when none).
    pub fn committed_generation(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .committed
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/session.rs"]
mod tests;
