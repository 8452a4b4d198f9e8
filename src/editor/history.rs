use std::collections::VecDeque;

use crate::foundation::error::{BadgeError, BadgeResult};
use crate::template::model::Template;

/// Maximum number of snapshots kept.
pub const HISTORY_CAPACITY: usize = 20;

/// Bounded undo/redo stack of serialized template snapshots.
///
/// `index` always points at the snapshot matching the live template. Pushing after an undo
/// discards the redo branch; overflowing the capacity evicts the oldest snapshot.
#[derive(Clone, Debug)]
pub struct History {
    snapshots: VecDeque<String>,
    index: usize,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// Empty history with [`HISTORY_CAPACITY`].
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// Empty history keeping at most `capacity` snapshots (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            snapshots: VecDeque::with_capacity(capacity),
            index: 0,
            capacity,
        }
    }

    /// Record `template` as the newest state.
    pub fn push(&mut self, template: &Template) -> BadgeResult<()> {
        let snapshot = template.to_json()?;
        self.push_snapshot(snapshot);
        Ok(())
    }

    /// Record a raw JSON snapshot as the newest state.
    pub fn push_snapshot(&mut self, snapshot: String) {
        if !self.snapshots.is_empty() && self.index + 1 < self.snapshots.len() {
            self.snapshots.truncate(self.index + 1);
        }
        self.snapshots.push_back(snapshot);
        while self.snapshots.len() > self.capacity {
            self.snapshots.pop_front();
        }
        self.index = self.snapshots.len() - 1;
        tracing::debug!(index = self.index, len = self.snapshots.len(), "history push");
    }

    /// Step back. Returns the restored template, or `None` at the oldest snapshot.
    pub fn undo(&mut self) -> BadgeResult<Option<Template>> {
        if !self.can_undo() {
            return Ok(None);
        }
        self.index -= 1;
        tracing::debug!(index = self.index, "undo");
        self.current().map(Some)
    }

    /// Step forward. Returns the restored template, or `None` at the newest snapshot.
    pub fn redo(&mut self) -> BadgeResult<Option<Template>> {
        if !self.can_redo() {
            return Ok(None);
        }
        self.index += 1;
        tracing::debug!(index = self.index, "redo");
        self.current().map(Some)
    }

    fn current(&self) -> BadgeResult<Template> {
        let s = self
            .snapshots
            .get(self.index)
            .ok_or_else(|| BadgeError::validation("history index out of range"))?;
        Ok(serde_json::from_str(s)?)
    }

    /// Whether [`History::undo`] would move.
    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    /// Whether [`History::redo`] would move.
    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.snapshots.len()
    }

    /// Number of snapshots held.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether nothing has been pushed yet.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Position of the live snapshot.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Snapshot at `i`, oldest first.
    pub fn snapshot(&self, i: usize) -> Option<&str> {
        self.snapshots.get(i).map(String::as_str)
    }

    /// Drop every snapshot.
    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.index = 0;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/editor/history.rs"]
mod tests;
