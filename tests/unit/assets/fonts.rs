use super::*;

const WHITE: TextBrushRgba8 = TextBrushRgba8 {
    r: 255,
    g: 255,
    b: 255,
    a: 255,
};

#[test]
fn empty_engine_shapes_nothing() {
    let mut engine = TextLayoutEngine::new();
    assert!(!engine.has_fonts());
    assert!(engine.families().is_empty());
    assert!(
        engine
            .shape("Alice", "Inter", false, 14.0, WHITE)
            .unwrap()
            .is_none()
    );
}

#[test]
fn invalid_size_is_rejected() {
    let mut engine = TextLayoutEngine::default();
    for size in [0.0, -1.0, f32::NAN] {
        assert!(matches!(
            engine.shape("x", "Inter", false, size, WHITE),
            Err(BadgeError::Validation(_))
        ));
    }
}

#[test]
fn garbage_font_bytes_are_rejected() {
    let mut engine = TextLayoutEngine::new();
    assert!(engine.register_font(b"not a font".to_vec(), false).is_err());
    assert!(!engine.has_fonts());
}

#[test]
fn load_dir_skips_unusable_files() {
    let dir = std::env::temp_dir().join(format!("badgekit-fonts-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("Broken-Bold.ttf"), b"garbage").unwrap();
    std::fs::write(dir.join("readme.txt"), b"not a font").unwrap();

    let mut engine = TextLayoutEngine::new();
    assert_eq!(engine.load_dir(&dir).unwrap(), 0);
    assert!(!engine.has_fonts());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn load_dir_missing_is_error() {
    let mut engine = TextLayoutEngine::new();
    assert!(
        engine
            .load_dir(Path::new("/nonexistent-badgekit-fonts"))
            .is_err()
    );
}
