use super::*;
use crate::template::model::FieldDef;

#[test]
fn untagged_values_parse_by_shape() {
    let r = DataRecord::from_json(
        r#"{"name": "Alice", "id": 42, "photo": {"value": "p.png", "props": {"x": 0.2, "y": 0.8, "zoom": 2}}}"#,
    )
    .unwrap();
    assert_eq!(r.get("name"), Some(&DataValue::Text("Alice".to_owned())));
    assert_eq!(r.get("id"), Some(&DataValue::Number(42.0)));
    let Some(DataValue::Image(v)) = r.get("photo") else {
        panic!("expected image value");
    };
    assert_eq!(v.value, "p.png");
    assert_eq!(
        v.props,
        PanZoom {
            x: 0.2,
            y: 0.8,
            zoom: 2.0
        }
    );
}

#[test]
fn image_value_props_default_when_missing() {
    let r = DataRecord::from_json(r#"{"photo": {"value": "p.png"}}"#).unwrap();
    let (src, props) = r.get("photo").unwrap().image_source().unwrap();
    assert_eq!(src, "p.png");
    assert_eq!(props, PanZoom::default());
}

#[test]
fn malformed_record_is_validation_error() {
    assert!(matches!(
        DataRecord::from_json("[1, 2]").unwrap_err(),
        BadgeError::Validation(_)
    ));
}

#[test]
fn display_text_formats_numbers_without_trailing_zero() {
    assert_eq!(DataValue::Number(42.0).display_text(), "42");
    assert_eq!(DataValue::Number(-3.0).display_text(), "-3");
    assert_eq!(DataValue::Number(2.5).display_text(), "2.5");
    assert_eq!(DataValue::Text("x".to_owned()).display_text(), "x");
    assert_eq!(
        DataValue::Image(ImageValue::new("a.png")).display_text(),
        "a.png"
    );
}

#[test]
fn image_source_treats_empty_and_numbers_as_absent() {
    assert!(DataValue::Text(String::new()).image_source().is_none());
    assert!(DataValue::Text("  ".to_owned()).image_source().is_none());
    assert!(DataValue::Number(1.0).image_source().is_none());
    assert!(
        DataValue::Image(ImageValue::new(""))
            .image_source()
            .is_none()
    );
    let v = DataValue::Text("a.png".to_owned());
    let (src, props) = v.image_source().unwrap();
    assert_eq!(src, "a.png");
    assert_eq!(props, PanZoom::default());
}

#[test]
fn clamped_keeps_props_in_range() {
    let p = PanZoom {
        x: -1.0,
        y: 2.0,
        zoom: 50.0,
    }
    .clamped();
    assert_eq!(
        p,
        PanZoom {
            x: 0.0,
            y: 1.0,
            zoom: ZOOM_MAX
        }
    );
    let p = PanZoom {
        x: f64::NAN,
        y: 0.3,
        zoom: 0.0,
    }
    .clamped();
    assert_eq!(
        p,
        PanZoom {
            x: 0.5,
            y: 0.3,
            zoom: 1.0
        }
    );
    assert_eq!(
        PanZoom {
            x: 0.5,
            y: 0.5,
            zoom: 0.01
        }
        .clamped()
        .zoom,
        ZOOM_MIN
    );
}

#[test]
fn image_value_mut_upgrades_raw_source() {
    let mut r = DataRecord::new();
    r.set_image("photo", "p.png");
    assert_eq!(r.get("photo"), Some(&DataValue::Text("p.png".to_owned())));
    let v = r.image_value_mut("photo").unwrap();
    v.props.zoom = 2.0;
    let Some(DataValue::Image(v)) = r.get("photo") else {
        panic!("expected upgrade");
    };
    assert_eq!(v.value, "p.png");
    assert_eq!((v.props.x, v.props.y, v.props.zoom), (0.5, 0.5, 2.0));
}

#[test]
fn image_value_mut_rejects_missing_empty_and_numeric() {
    let mut r = DataRecord::new();
    assert!(r.image_value_mut("photo").is_none());
    r.set_image("photo", "");
    assert!(r.image_value_mut("photo").is_none());
    assert_eq!(r.get("photo"), Some(&DataValue::Text(String::new())));
    r.set_number("n", 3.0);
    assert!(r.image_value_mut("n").is_none());
}

#[test]
fn for_template_defaults_selects_to_first_option() {
    let mut t = Template::default();
    let mut dept = FieldDef::new("dept", FieldType::Select);
    dept.options = vec!["Sales".to_owned(), "Ops".to_owned()];
    t.fields.push(dept);
    t.fields.push(FieldDef::new("empty", FieldType::Select));
    t.fields.push(FieldDef::new("name", FieldType::Text));

    let r = DataRecord::for_template(&t);
    assert_eq!(r.get("dept"), Some(&DataValue::Text("Sales".to_owned())));
    assert_eq!(r.get("empty"), Some(&DataValue::Text(String::new())));
    assert!(!r.contains("name"));
}

#[test]
fn placeholder_uses_labels_and_skips_images() {
    let mut t = Template::default();
    let mut name = FieldDef::new("name", FieldType::Text);
    name.label = "Full Name".to_owned();
    t.fields.push(name);
    t.fields.push(FieldDef::new("id", FieldType::Number));
    t.fields.push(FieldDef::new("photo", FieldType::Image));

    let r = DataRecord::placeholder(&t);
    assert_eq!(r.get("name").unwrap().display_text(), "[Full Name]");
    assert_eq!(r.get("id").unwrap().display_text(), "[id]");
    assert!(!r.contains("photo"));
}

#[test]
fn record_serializes_as_plain_object() {
    let mut r = DataRecord::new();
    r.set_text("b", "x");
    r.set_number("a", 1.5);
    assert_eq!(serde_json::to_string(&r).unwrap(), r#"{"a":1.5,"b":"x"}"#);
    assert_eq!(r.iter().count(), 2);
    assert!(r.remove("a").is_some());
    assert!(!r.contains("a"));
}
