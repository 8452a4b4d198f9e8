use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::foundation::error::{BadgeError, BadgeResult};

/// Simple string key-value persistence.
pub trait KeyValueStore: Send {
    /// Store `value` under `key`, replacing any previous value.
    fn save(&mut self, key: &str, value: &str) -> BadgeResult<()>;
    /// Value under `key`, if any.
    fn get(&self, key: &str) -> BadgeResult<Option<String>>;
}

/// Process-local store.
#[derive(Clone, Debug, Default)]
pub struct MemoryKv {
    entries: HashMap<String, String>,
}

impl MemoryKv {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKv {
    fn save(&mut self, key: &str, value: &str) -> BadgeResult<()> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn get(&self, key: &str) -> BadgeResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }
}

/// One file per key under a directory.
#[derive(Clone, Debug)]
pub struct FsKv {
    dir: PathBuf,
}

impl FsKv {
    /// Store rooted at `dir`; the directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> BadgeResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(BadgeError::storage(format!("invalid key \"{key}\"")));
        }
        Ok(self.dir.join(key))
    }
}

impl KeyValueStore for FsKv {
    fn save(&mut self, key: &str, value: &str) -> BadgeResult<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create kv dir '{}'", self.dir.display()))?;
        std::fs::write(&path, value).with_context(|| format!("write '{}'", path.display()))?;
        Ok(())
    }

    fn get(&self, key: &str) -> BadgeResult<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("read '{}'", path.display()))
                .into()),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/storage/kv.rs"]
mod tests;
