use super::*;
use crate::storage::bootstrap::{LOCAL_TEMPLATE_KEY, load_local};
use crate::storage::kv::MemoryKv;

fn scenario() -> Template {
    let mut t = Template::new(54.0, 86.0);
    t.fields.push(FieldDef::new("name", FieldType::Text));

    let mut text = Layer::new(
        "l1",
        LayerKind::Text(TextStyle {
            font_size: 14.0,
            ..TextStyle::default()
        }),
    );
    text.bind_key = Some("name".to_owned());
    (text.x, text.y, text.w, text.h) = (10.0, 10.0, 100.0, 20.0);
    text.z_index = 1;

    let mut band = Layer::new("l2", LayerKind::Shape(ShapeStyle::default()));
    (band.w, band.h) = (204.0, 30.0);

    t.layers.push(text);
    t.layers.push(band);
    t
}

fn session() -> EditorSession {
    EditorSession::new(scenario()).unwrap()
}

fn layer<'a>(s: &'a EditorSession, id: &str) -> &'a Layer {
    s.template().layer(id).unwrap()
}

fn font(s: &EditorSession, id: &str) -> f64 {
    layer(s, id).text_style().unwrap().font_size
}

#[test]
fn new_session_seeds_history() {
    let s = session();
    assert_eq!(s.history().len(), 1);
    assert_eq!(s.gesture(), &Gesture::Idle);
    assert!(s.selection().is_none());
    assert!(EditorSession::new(Template::new(0.0, 86.0)).is_err());
}

#[test]
fn pointer_down_selects_topmost_and_drags() {
    let mut s = session();
    assert_eq!(
        s.pointer_down(Point::new(20.0, 15.0)),
        PointerHit::Layer("l1".to_owned())
    );
    assert_eq!(s.selection(), Some("l1"));
    assert!(s.pointer_move(Point::new(30.0, 25.0)));
    assert!(s.pointer_move(Point::new(35.0, 17.0)));
    assert_eq!((layer(&s, "l1").x, layer(&s, "l1").y), (25.0, 12.0));
    assert!(s.pointer_up().unwrap());
    assert_eq!(s.history().len(), 2);
    assert_eq!(s.gesture(), &Gesture::Idle);
}

#[test]
fn click_without_move_does_not_push_history() {
    let mut s = session();
    s.pointer_down(Point::new(150.0, 20.0));
    assert_eq!(s.selection(), Some("l2"));
    assert!(!s.pointer_up().unwrap());
    assert_eq!(s.history().len(), 1);
}

#[test]
fn zero_delta_moves_do_not_push_history() {
    let mut s = session();
    let before = s.template().clone();

    s.pointer_down(Point::new(150.0, 20.0));
    s.pointer_move(Point::new(150.0, 20.0));
    assert!(!s.pointer_up().unwrap());

    s.pointer_down(Point::new(20.0, 15.0));
    s.pointer_move(Point::new(60.0, 40.0));
    s.pointer_move(Point::new(20.0, 15.0));
    assert!(!s.pointer_up().unwrap());

    assert_eq!(s.history().len(), 1);
    assert_eq!(s.template(), &before);
}

#[test]
fn resize_back_to_start_restores_exact_geometry() {
    let mut t = scenario();
    let l = t.layer_mut("l1").unwrap();
    (l.x, l.w) = (10.3, 99.9);
    l.text_style_mut().unwrap().font_size = 14.5;
    let mut s = EditorSession::new(t).unwrap();
    let before = s.template().clone();
    s.select(Some("l1"));

    assert_eq!(
        s.pointer_down(Point::new(110.2, 30.0)),
        PointerHit::Handle(ResizeHandle::Se)
    );
    s.pointer_move(Point::new(110.2, 30.0));
    assert_eq!(s.template(), &before);
    s.pointer_move(Point::new(140.0, 60.0));
    assert_ne!(s.template(), &before);
    s.pointer_move(Point::new(110.2, 30.0));
    assert!(!s.pointer_up().unwrap());

    assert_eq!(s.history().len(), 1);
    assert_eq!(s.template(), &before);
}

#[test]
fn empty_canvas_clears_selection() {
    let mut s = session();
    s.select(Some("l1"));
    assert_eq!(s.pointer_down(Point::new(150.0, 200.0)), PointerHit::Nothing);
    assert!(s.selection().is_none());
    assert!(!s.pointer_move(Point::new(160.0, 210.0)));
}

#[test]
fn handles_win_over_layer_bodies() {
    let mut s = session();
    s.select(Some("l1"));
    let handles = s.handle_rects();
    assert_eq!(handles.len(), 4);
    assert_eq!(handles[2].0, ResizeHandle::Se);
    assert_eq!(handles[2].1, Rect::new(104.0, 24.0, 116.0, 36.0));

    // Inside both the Nw handle and the l2 band.
    assert_eq!(
        s.pointer_down(Point::new(6.0, 6.0)),
        PointerHit::Handle(ResizeHandle::Nw)
    );
    assert!(matches!(s.gesture(), Gesture::Resizing { .. }));
}

#[test]
fn text_resize_autoscales_font_and_undo_restores() {
    let mut s = session();
    s.select(Some("l1"));
    assert_eq!(
        s.pointer_down(Point::new(110.0, 30.0)),
        PointerHit::Handle(ResizeHandle::Se)
    );
    assert!(s.pointer_move(Point::new(130.0, 50.0)));
    let l = layer(&s, "l1");
    assert_eq!((l.x, l.y, l.w, l.h), (10.0, 10.0, 120.0, 40.0));
    assert_eq!(font(&s, "l1"), 28.0);
    assert!(s.pointer_up().unwrap());

    assert!(s.undo().unwrap());
    assert_eq!(layer(&s, "l1").h, 20.0);
    assert_eq!(font(&s, "l1"), 14.0);
    assert!(s.selection().is_none());

    assert!(s.redo().unwrap());
    assert_eq!(font(&s, "l1"), 28.0);
    assert!(!s.redo().unwrap());
}

#[test]
fn shrinking_text_respects_font_floor() {
    let mut s = session();
    s.select(Some("l1"));
    s.pointer_down(Point::new(110.0, 30.0));
    s.pointer_move(Point::new(110.0, -100.0));
    assert_eq!(layer(&s, "l1").h, MIN_LAYER_SIZE);
    assert_eq!(font(&s, "l1"), 7.0);
    assert_eq!(autoscaled_font(14.0, 20.0, 2.0), MIN_FONT_SIZE);
    assert_eq!(autoscaled_font(14.0, 0.0, 30.0), 14.0);
}

#[test]
fn west_resize_at_floor_pins_east_edge() {
    let mut l = Layer::new("x", LayerKind::Shape(ShapeStyle::default()));
    let original = Rect::new(10.0, 10.0, 110.0, 30.0);

    apply_resize(&mut l, ResizeHandle::Nw, original, Vec2::new(-20.0, -5.0));
    assert_eq!((l.x, l.y, l.w, l.h), (-10.0, 5.0, 120.0, 25.0));

    apply_resize(&mut l, ResizeHandle::Nw, original, Vec2::new(200.0, 50.0));
    assert_eq!((l.x, l.y, l.w, l.h), (100.0, 20.0, 10.0, 10.0));

    apply_resize(&mut l, ResizeHandle::Se, original, Vec2::new(-500.0, 5.0));
    assert_eq!((l.x, l.y, l.w, l.h), (10.0, 10.0, 10.0, 25.0));

    apply_resize(&mut l, ResizeHandle::Ne, original, Vec2::new(5.0, 4.0));
    assert_eq!((l.x, l.y, l.w, l.h), (10.0, 14.0, 105.0, 16.0));
}

#[test]
fn cancel_restores_geometry() {
    let mut s = session();
    s.select(Some("l1"));
    s.pointer_down(Point::new(110.0, 30.0));
    s.pointer_move(Point::new(150.0, 70.0));
    s.pointer_cancel();
    let l = layer(&s, "l1");
    assert_eq!((l.x, l.y, l.w, l.h), (10.0, 10.0, 100.0, 20.0));
    assert_eq!(font(&s, "l1"), 14.0);

    s.pointer_down(Point::new(20.0, 15.0));
    s.pointer_move(Point::new(80.0, 90.0));
    s.pointer_cancel();
    assert_eq!((layer(&s, "l1").x, layer(&s, "l1").y), (10.0, 10.0));
    assert_eq!(s.history().len(), 1);
}

#[test]
fn display_zoom_maps_pointer_to_logical() {
    let mut s = session();
    s.set_display_zoom(2.0);
    s.set_display_zoom(-1.0);
    assert_eq!(s.display_zoom(), 2.0);
    assert_eq!(
        s.pointer_down(Point::new(40.0, 30.0)),
        PointerHit::Layer("l1".to_owned())
    );
    assert_eq!(s.selection_box(), Some(Rect::new(20.0, 20.0, 220.0, 60.0)));
    s.pointer_move(Point::new(60.0, 30.0));
    assert_eq!(layer(&s, "l1").x, 20.0);
}

#[test]
fn nudges_commit_as_one_entry() {
    let mut s = session();
    assert!(!s.nudge(NudgeDirection::Left, false));
    s.select(Some("l1"));
    for _ in 0..3 {
        assert!(s.nudge(NudgeDirection::Right, false));
    }
    assert!(s.nudge(NudgeDirection::Down, true));
    assert!(s.nudge(NudgeDirection::Up, false));
    assert_eq!((layer(&s, "l1").x, layer(&s, "l1").y), (13.0, 19.0));
    assert_eq!(s.history().len(), 1);

    assert!(s.commit_nudges().unwrap());
    assert!(!s.commit_nudges().unwrap());
    assert_eq!(s.history().len(), 2);
}

#[test]
fn pending_nudges_flush_before_other_edits() {
    let mut s = session();
    s.select(Some("l1"));
    s.nudge(NudgeDirection::Left, true);
    s.add_field(FieldDef::new("title", FieldType::Text)).unwrap();
    assert_eq!(s.history().len(), 3);

    assert!(s.undo().unwrap());
    assert!(s.template().field("title").is_none());
    assert_eq!(layer(&s, "l1").x, 0.0);
}

#[test]
fn delete_field_cascades_to_bound_layers() {
    let mut s = session();
    s.select(Some("l1"));
    assert_eq!(s.delete_field("name").unwrap(), ["l1"]);
    assert!(s.template().layer("l1").is_none());
    assert!(s.template().layer("l2").is_some());
    assert!(s.selection().is_none());
    assert!(s.delete_field("name").unwrap().is_empty());
    assert_eq!(s.history().len(), 2);
}

#[test]
fn delete_selected_layer() {
    let mut s = session();
    assert!(s.delete_selected().unwrap().is_none());
    s.select(Some("l2"));
    assert_eq!(s.delete_selected().unwrap().unwrap().id, "l2");
    assert!(s.selection().is_none());
    assert!(s.delete_layer("l2").unwrap().is_none());
    assert_eq!(s.history().len(), 2);
}

#[test]
fn add_layer_presets() {
    let mut s = session();
    let id = s.add_layer(LayerPreset::ShapeRect).unwrap();
    assert_eq!(id, "layer-1");
    assert_eq!(s.selection(), Some("layer-1"));
    let l = layer(&s, &id);
    assert_eq!((l.x, l.y, l.w, l.h, l.z_index), (10.0, 10.0, 100.0, 20.0, 12));
    let LayerKind::Shape(shape) = &l.kind else {
        panic!("expected shape");
    };
    assert_eq!(shape.fill, "#3b82f6");

    let id = s
        .add_layer(LayerPreset::TextField {
            key: "title".to_owned(),
        })
        .unwrap();
    assert_eq!(id, "layer-2");
    assert_eq!(layer(&s, &id).bind_key.as_deref(), Some("title"));
    assert_eq!(s.template().field("title").unwrap().kind, FieldType::Text);

    let id = s.add_layer(LayerPreset::StaticText).unwrap();
    let style = layer(&s, &id).text_style().unwrap();
    assert_eq!(style.static_text.as_deref(), Some("TEXT"));
    assert_eq!(style.font_weight, FontWeight::Bold);

    let id = s
        .add_layer(LayerPreset::ImageField {
            key: "photo".to_owned(),
        })
        .unwrap();
    assert_eq!((layer(&s, &id).w, layer(&s, &id).h), (80.0, 80.0));
    assert_eq!(s.template().field("photo").unwrap().kind, FieldType::Image);
    assert_eq!(s.history().len(), 5);

    assert!(
        s.add_layer(LayerPreset::TextField { key: " ".to_owned() })
            .is_err()
    );
}

#[test]
fn z_index_changes_selected_layer() {
    let mut s = session();
    assert!(!s.change_z_index(1).unwrap());
    s.select(Some("l2"));
    assert!(s.change_z_index(5).unwrap());
    assert_eq!(layer(&s, "l2").z_index, 5);
    assert_eq!(s.layer_at(Point::new(20.0, 15.0)).unwrap().id, "l2");
}

#[test]
fn update_layer_rolls_back_invalid_edits() {
    let mut s = session();
    let err = s.update_layer("l1", |l| l.w = -5.0).unwrap_err();
    assert!(matches!(err, BadgeError::Validation(_)));
    assert_eq!(layer(&s, "l1").w, 100.0);
    assert_eq!(s.history().len(), 1);

    s.update_layer("l1", |l| {
        l.id = "renamed".to_owned();
        l.y = 40.0;
    })
    .unwrap();
    assert_eq!(layer(&s, "l1").y, 40.0);
    assert!(s.template().layer("renamed").is_none());
    assert!(s.update_layer("missing", |_| {}).is_err());
}

#[test]
fn background_and_page_edits() {
    let mut s = session();
    assert!(s.set_background_color("#zz").is_err());
    s.set_background_color("#112233").unwrap();
    assert_eq!(s.template().background, Background::color("#112233"));

    s.set_background_fit(FitMode::Contain).unwrap();
    s.set_background_image("bg.png").unwrap();
    assert_eq!(
        s.template().background,
        Background::image("bg.png", FitMode::Contain)
    );
    s.remove_background().unwrap();
    assert_eq!(s.template().background, Background::default());
    assert!(s.template().meta.background_image.is_none());

    assert!(s.set_page_size(0.0, 10.0).is_err());
    s.set_page_size(85.6, 54.0).unwrap();
    assert_eq!(s.template().meta.width_mm, 85.6);
}

#[test]
fn edits_are_checkpointed() {
    let mut s = session().with_kv(Box::new(MemoryKv::new()));
    assert!(load_local(s.kv().unwrap()).unwrap().is_none());
    s.add_field(FieldDef::new("dept", FieldType::Select)).unwrap();
    let saved = load_local(s.kv().unwrap()).unwrap().unwrap();
    assert_eq!(&saved, s.template());
    assert!(s.kv().unwrap().get(LOCAL_TEMPLATE_KEY).unwrap().is_some());

    s.undo().unwrap();
    let saved = load_local(s.kv().unwrap()).unwrap().unwrap();
    assert!(saved.field("dept").is_none());
}

#[test]
fn preview_record_uses_labels() {
    let s = session();
    assert_eq!(
        s.preview_record().get("name").unwrap().display_text(),
        "[name]"
    );
}
