use std::collections::HashMap;
use std::sync::Arc;

use crate::assets::decode::{PreparedImage, decode_bitmap};
use crate::assets::source::SourceResolver;
use crate::foundation::error::BadgeResult;
use crate::foundation::math::hash_str;

/// Stable cache key for an image source string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BitmapKey(pub u64);

impl BitmapKey {
    /// Key for `src` (FNV-1a of the trimmed source string).
    pub fn for_source(src: &str) -> Self {
        Self(hash_str(src.trim()))
    }
}

/// Decoded bitmap cache in front of a [`SourceResolver`].
///
/// All IO and decoding happens in [`BitmapStore::load`]; renderers only look bitmaps up by
/// key. Failed loads are not cached, so a later render retries them.
#[derive(Debug)]
pub struct BitmapStore {
    resolver: SourceResolver,
    images: HashMap<BitmapKey, Arc<PreparedImage>>,
}

impl BitmapStore {
    /// Empty cache over `resolver`.
    pub fn new(resolver: SourceResolver) -> Self {
        Self {
            resolver,
            images: HashMap::new(),
        }
    }

    /// Resolve, decode and cache `src`, returning its key.
    pub fn load(&mut self, src: &str) -> BadgeResult<BitmapKey> {
        let key = BitmapKey::for_source(src);
        if self.images.contains_key(&key) {
            return Ok(key);
        }
        let bytes = self.resolver.read(src)?;
        let image = decode_bitmap(&bytes)?;
        tracing::debug!(
            key = key.0,
            width = image.width,
            height = image.height,
            "decoded bitmap"
        );
        self.images.insert(key, Arc::new(image));
        Ok(key)
    }

    /// Seed the cache with an already decoded bitmap for `src`.
    pub fn insert(&mut self, src: &str, image: PreparedImage) -> BitmapKey {
        let key = BitmapKey::for_source(src);
        self.images.insert(key, Arc::new(image));
        key
    }

    /// Cached bitmap for `key`.
    pub fn get(&self, key: BitmapKey) -> Option<&Arc<PreparedImage>> {
        self.images.get(&key)
    }

    /// Whether `src` is already decoded.
    pub fn contains(&self, src: &str) -> bool {
        self.images.contains_key(&BitmapKey::for_source(src))
    }

    /// Number of cached bitmaps.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Drop every cached bitmap.
    pub fn clear(&mut self) {
        self.images.clear();
    }

    /// Resolver used for cache misses.
    pub fn resolver(&self) -> &SourceResolver {
        &self.resolver
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/store.rs"]
mod tests;
