use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine;

use crate::foundation::error::{BadgeError, BadgeResult};

/// Where an image source string points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageSource {
    /// Inline `data:` URI, already decoded to bytes.
    Inline {
        /// Declared media type (may be empty).
        mime: String,
        /// Encoded image bytes.
        bytes: Vec<u8>,
    },
    /// Path relative to the assets root.
    Path(String),
    /// `http(s)` URL, resolved through a [`RemoteFetcher`].
    Remote(String),
}

/// Classify and pre-decode an image source string.
pub fn parse_source(src: &str) -> BadgeResult<ImageSource> {
    let src = src.trim();
    if src.is_empty() {
        return Err(BadgeError::image_load("empty image source"));
    }
    if let Some(rest) = src.strip_prefix("data:") {
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| BadgeError::image_load("data uri is missing ','"))?;
        let is_base64 = meta.ends_with(";base64");
        let mime = meta.trim_end_matches(";base64").to_owned();
        let bytes = if is_base64 {
            base64::engine::general_purpose::STANDARD
                .decode(payload.trim())
                .map_err(|e| BadgeError::image_load(format!("data uri base64: {e}")))?
        } else {
            percent_decode(payload)?
        };
        return Ok(ImageSource::Inline { mime, bytes });
    }
    let lower = src.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Ok(ImageSource::Remote(src.to_owned()));
    }
    Ok(ImageSource::Path(normalize_rel_path(src)?))
}

/// Normalize a relative asset path.
///
/// Backslashes become `/`, empty and `.` segments are dropped, a leading `/` is treated as the
/// assets root, and `..` is rejected so sources cannot escape it.
pub fn normalize_rel_path(source: &str) -> BadgeResult<String> {
    let s = source.replace('\\', "/");
    if s.trim().is_empty() {
        return Err(BadgeError::image_load("asset path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(BadgeError::image_load("asset paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(BadgeError::image_load("asset path must contain a file name"));
    }

    Ok(out.join("/"))
}

fn percent_decode(input: &str) -> BadgeResult<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input
                .get(i + 1..i + 3)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| BadgeError::image_load("invalid percent-encoding in data uri"))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

/// Collaborator that downloads remote image sources.
pub trait RemoteFetcher: Send + Sync {
    /// Fetch the raw bytes behind `url`.
    fn fetch(&self, url: &str) -> BadgeResult<Vec<u8>>;
}

/// Turns image source strings into encoded bytes.
#[derive(Clone)]
pub struct SourceResolver {
    assets_root: PathBuf,
    fetcher: Option<Arc<dyn RemoteFetcher>>,
}

impl std::fmt::Debug for SourceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceResolver")
            .field("assets_root", &self.assets_root)
            .field("has_fetcher", &self.fetcher.is_some())
            .finish()
    }
}

impl SourceResolver {
    /// Resolver reading relative paths under `assets_root`, with no remote access.
    pub fn new(assets_root: impl Into<PathBuf>) -> Self {
        Self {
            assets_root: assets_root.into(),
            fetcher: None,
        }
    }

    /// Attach a remote fetcher for `http(s)` sources.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn RemoteFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Root that relative paths resolve against.
    pub fn assets_root(&self) -> &Path {
        &self.assets_root
    }

    /// Load the encoded bytes behind `src`.
    pub fn read(&self, src: &str) -> BadgeResult<Vec<u8>> {
        match parse_source(src)? {
            ImageSource::Inline { bytes, .. } => Ok(bytes),
            ImageSource::Path(rel) => {
                let p = self.assets_root.join(Path::new(&rel));
                std::fs::read(&p).map_err(|e| {
                    BadgeError::image_load(format!("failed to read '{}': {e}", p.display()))
                })
            }
            ImageSource::Remote(url) => match &self.fetcher {
                Some(f) => f.fetch(&url),
                None => Err(BadgeError::image_load(format!(
                    "no remote fetcher configured for '{url}'"
                ))),
            },
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/source.rs"]
mod tests;
