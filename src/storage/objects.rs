use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::Context;

use crate::foundation::error::{BadgeError, BadgeResult};

/// Named blob storage addressed by URL.
pub trait ObjectStore {
    /// Store `bytes` under `name`, overwriting, and return its URL.
    fn store(&mut self, name: &str, bytes: &[u8], content_type: &str) -> BadgeResult<String>;
    /// URL of the most recently stored object whose name starts with `prefix`.
    fn fetch_latest(&self, prefix: &str) -> BadgeResult<Option<String>>;
    /// Contents behind a URL returned by this store.
    fn read(&self, url: &str) -> BadgeResult<Vec<u8>>;
}

fn check_name(name: &str) -> BadgeResult<()> {
    if name.is_empty()
        || name.starts_with('/')
        || name.contains('\\')
        || name.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..")
    {
        return Err(BadgeError::storage(format!("invalid object name \"{name}\"")));
    }
    Ok(())
}

#[derive(Clone, Debug)]
struct MemoryObject {
    name: String,
    bytes: Vec<u8>,
    content_type: String,
    seq: u64,
}

const MEMORY_SCHEME: &str = "memory://";

/// Process-local object store with `memory://<name>` URLs.
#[derive(Clone, Debug, Default)]
pub struct MemoryObjectStore {
    objects: Vec<MemoryObject>,
    seq: u64,
}

impl MemoryObjectStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Content type recorded for `name`.
    pub fn content_type(&self, name: &str) -> Option<&str> {
        self.objects
            .iter()
            .find(|o| o.name == name)
            .map(|o| o.content_type.as_str())
    }
}

impl ObjectStore for MemoryObjectStore {
    fn store(&mut self, name: &str, bytes: &[u8], content_type: &str) -> BadgeResult<String> {
        check_name(name)?;
        self.seq += 1;
        self.objects.retain(|o| o.name != name);
        self.objects.push(MemoryObject {
            name: name.to_owned(),
            bytes: bytes.to_vec(),
            content_type: content_type.to_owned(),
            seq: self.seq,
        });
        Ok(format!("{MEMORY_SCHEME}{name}"))
    }

    fn fetch_latest(&self, prefix: &str) -> BadgeResult<Option<String>> {
        Ok(self
            .objects
            .iter()
            .filter(|o| o.name.starts_with(prefix))
            .max_by_key(|o| o.seq)
            .map(|o| format!("{MEMORY_SCHEME}{}", o.name)))
    }

    fn read(&self, url: &str) -> BadgeResult<Vec<u8>> {
        let name = url
            .strip_prefix(MEMORY_SCHEME)
            .ok_or_else(|| BadgeError::storage(format!("not a memory url: {url}")))?;
        self.objects
            .iter()
            .find(|o| o.name == name)
            .map(|o| o.bytes.clone())
            .ok_or_else(|| BadgeError::storage(format!("object not found: {name}")))
    }
}

/// Objects stored as files under a root directory; URLs are file paths.
///
/// Recency is the file modification time, ties broken by name.
#[derive(Clone, Debug)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collect(&self, dir: &Path, rel: &str, out: &mut Vec<(String, SystemTime)>) -> BadgeResult<()> {
        let entries = match std::fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("list '{}'", dir.display()))
                    .into());
            }
        };
        for entry in entries {
            let entry = entry.with_context(|| format!("list '{}'", dir.display()))?;
            let Some(file_name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            let name = if rel.is_empty() {
                file_name
            } else {
                format!("{rel}/{file_name}")
            };
            let meta = entry
                .metadata()
                .with_context(|| format!("stat '{}'", entry.path().display()))?;
            if meta.is_dir() {
                self.collect(&entry.path(), &name, out)?;
            } else {
                out.push((name, meta.modified().unwrap_or(SystemTime::UNIX_EPOCH)));
            }
        }
        Ok(())
    }
}

impl ObjectStore for FsObjectStore {
    fn store(&mut self, name: &str, bytes: &[u8], _content_type: &str) -> BadgeResult<String> {
        check_name(name)?;
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create '{}'", parent.display()))?;
        }
        std::fs::write(&path, bytes).with_context(|| format!("write '{}'", path.display()))?;
        Ok(path.display().to_string())
    }

    fn fetch_latest(&self, prefix: &str) -> BadgeResult<Option<String>> {
        let mut all = Vec::new();
        self.collect(&self.root, "", &mut all)?;
        Ok(all
            .into_iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)))
            .map(|(name, _)| self.root.join(name).display().to_string()))
    }

    fn read(&self, url: &str) -> BadgeResult<Vec<u8>> {
        let path = Path::new(url);
        let escapes = path
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir));
        if escapes || !path.starts_with(&self.root) {
            return Err(BadgeError::storage(format!("url outside store: {url}")));
        }
        Ok(std::fs::read(path).with_context(|| format!("read '{url}'"))?)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/storage/objects.rs"]
mod tests;
