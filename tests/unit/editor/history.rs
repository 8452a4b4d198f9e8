use super::*;

fn template(width_mm: f64) -> Template {
    Template::new(width_mm, 86.0)
}

#[test]
fn empty_history_cannot_move() {
    let mut h = History::new();
    assert!(h.is_empty());
    assert!(!h.can_undo());
    assert!(!h.can_redo());
    assert!(h.undo().unwrap().is_none());
    assert!(h.redo().unwrap().is_none());
}

#[test]
fn undo_and_redo_walk_snapshots() {
    let mut h = History::new();
    for w in [10.0, 20.0, 30.0] {
        h.push(&template(w)).unwrap();
    }
    assert_eq!(h.index(), 2);
    assert_eq!(h.undo().unwrap().unwrap().meta.width_mm, 20.0);
    assert_eq!(h.undo().unwrap().unwrap().meta.width_mm, 10.0);
    assert!(h.undo().unwrap().is_none());
    assert_eq!(h.redo().unwrap().unwrap().meta.width_mm, 20.0);
    assert_eq!(h.redo().unwrap().unwrap().meta.width_mm, 30.0);
    assert!(h.redo().unwrap().is_none());
}

#[test]
fn push_after_undo_discards_redo_branch() {
    let mut h = History::new();
    for w in [10.0, 20.0, 30.0] {
        h.push(&template(w)).unwrap();
    }
    h.undo().unwrap();
    h.undo().unwrap();
    h.push(&template(40.0)).unwrap();
    assert_eq!(h.len(), 2);
    assert_eq!(h.index(), 1);
    assert!(!h.can_redo());
    assert_eq!(h.undo().unwrap().unwrap().meta.width_mm, 10.0);
}

#[test]
fn capacity_evicts_oldest() {
    let mut h = History::new();
    for i in 0..25 {
        h.push(&template(f64::from(i + 1))).unwrap();
    }
    assert_eq!(h.len(), HISTORY_CAPACITY);
    assert_eq!(h.index(), HISTORY_CAPACITY - 1);

    let oldest: Template = serde_json::from_str(h.snapshot(0).unwrap()).unwrap();
    assert_eq!(oldest.meta.width_mm, 6.0);

    let mut steps = 0;
    while h.undo().unwrap().is_some() {
        steps += 1;
    }
    assert_eq!(steps, HISTORY_CAPACITY - 1);
}

#[test]
fn zero_capacity_keeps_one_snapshot() {
    let mut h = History::with_capacity(0);
    h.push(&template(1.0)).unwrap();
    h.push(&template(2.0)).unwrap();
    assert_eq!(h.len(), 1);
    assert!(!h.can_undo());
}

#[test]
fn corrupt_snapshot_surfaces_error() {
    let mut h = History::new();
    h.push_snapshot("{}".to_owned());
    h.push_snapshot("not json".to_owned());
    h.push_snapshot("{}".to_owned());
    assert!(h.undo().is_err());
    assert_eq!(h.undo().unwrap().unwrap(), Template::default());
}

#[test]
fn clear_resets() {
    let mut h = History::new();
    h.push(&template(1.0)).unwrap();
    h.clear();
    assert!(h.is_empty());
    assert_eq!(h.index(), 0);
}
