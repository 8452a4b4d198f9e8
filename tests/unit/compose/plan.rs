use super::*;

fn run(text: &str) -> TextRun {
    TextRun {
        text: text.to_owned(),
        origin: Point::new(10.0, 10.0),
        align: TextAlign::Left,
        baseline: TextBaseline::Top,
        max_width: Some(100.0),
        family: "Arial".to_owned(),
        size_px: 14.0,
        bold: false,
        color: Rgba8::BLACK,
    }
}

fn plan(ops: Vec<DrawOp>) -> CardPlan {
    CardPlan {
        width_px: 408,
        height_px: 650,
        scale: 2.0,
        page: Rect::new(0.0, 0.0, 204.0, 325.0),
        ops,
    }
}

#[test]
fn fingerprint_is_stable_for_equal_plans() {
    let a = plan(vec![
        DrawOp::FillRect {
            rect: Rect::new(0.0, 0.0, 204.0, 325.0),
            color: Rgba8::WHITE,
        },
        DrawOp::Text(run("Alice")),
    ]);
    let b = a.clone();
    assert_eq!(a.fingerprint(), b.fingerprint());
}

#[test]
fn fingerprint_changes_with_content() {
    let a = plan(vec![DrawOp::Text(run("Alice"))]);
    let b = plan(vec![DrawOp::Text(run("Bob"))]);
    assert_ne!(a.fingerprint(), b.fingerprint());

    let mut bold = run("Alice");
    bold.bold = true;
    assert_ne!(a.fingerprint(), plan(vec![DrawOp::Text(bold)]).fingerprint());

    let mut scaled = a.clone();
    scaled.scale = 1.0;
    assert_ne!(a.fingerprint(), scaled.fingerprint());
}

#[test]
fn fingerprint_distinguishes_clips() {
    let placement = FitPlacement {
        src: Rect::new(0.0, 0.0, 10.0, 10.0),
        dst: Rect::new(0.0, 0.0, 50.0, 50.0),
    };
    let image = |clip| {
        plan(vec![DrawOp::Image {
            key: BitmapKey(7),
            placement,
            clip,
        }])
    };
    let none = image(ImageClip::None).fingerprint();
    let circle = image(ImageClip::Circle {
        rect: placement.dst,
    })
    .fingerprint();
    let rounded = image(ImageClip::RoundedRect {
        rect: placement.dst,
        radius: 4.0,
    })
    .fingerprint();
    assert_ne!(none, circle);
    assert_ne!(circle, rounded);
    assert_ne!(none, rounded);
}

#[test]
fn texts_filters_text_ops_in_order() {
    let p = plan(vec![
        DrawOp::Text(run("a")),
        DrawOp::FillCircle {
            rect: Rect::new(0.0, 0.0, 4.0, 4.0),
            color: Rgba8::BLACK,
        },
        DrawOp::Text(run("b")),
    ]);
    let texts: Vec<&str> = p.texts().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, ["a", "b"]);
}
