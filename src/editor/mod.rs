//! Direct-manipulation editing: the editor session, its undo history and the photo adjuster.

/// Photo pan/zoom gestures over the rendered card.
pub mod adjuster;
/// Editor session and gesture state machine.
pub mod controller;
/// Bounded snapshot undo/redo.
pub mod history;
