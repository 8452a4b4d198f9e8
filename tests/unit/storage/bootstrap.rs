use super::*;
use crate::storage::kv::MemoryKv;
use crate::storage::objects::MemoryObjectStore;
use crate::template::link::encode_link;
use crate::template::model::{FieldDef, FieldType};

fn named(width_mm: f64) -> Template {
    let mut t = Template::new(width_mm, 86.0);
    t.fields.push(FieldDef::new("name", FieldType::Text));
    t
}

#[test]
fn local_checkpoint_round_trips() {
    let mut kv = MemoryKv::new();
    assert!(load_local(&kv).unwrap().is_none());
    save_local(&mut kv, &named(54.0)).unwrap();
    assert_eq!(load_local(&kv).unwrap(), Some(named(54.0)));
}

#[test]
fn link_wins_over_local_and_fallback() {
    let mut kv = MemoryKv::new();
    save_local(&mut kv, &named(60.0)).unwrap();
    let link = encode_link(&named(70.0)).unwrap();
    let local: &dyn KeyValueStore = &kv;

    let init =
        load_initial_template(Some(link.as_str()), Some(local), Some(named(80.0))).unwrap();
    assert_eq!(init.origin, TemplateOrigin::Link);
    assert_eq!(init.template.meta.width_mm, 70.0);
    assert!(init.link_error.is_none());

    let init = load_initial_template(None, Some(local), Some(named(80.0))).unwrap();
    assert_eq!(init.origin, TemplateOrigin::Local);
    assert_eq!(init.template.meta.width_mm, 60.0);
    assert!(init.link_error.is_none());

    let init = load_initial_template(Some("  "), None, Some(named(80.0))).unwrap();
    assert_eq!(init.origin, TemplateOrigin::Fallback);
    assert_eq!(init.template.meta.width_mm, 80.0);
    assert!(init.link_error.is_none());
}

#[test]
fn broken_sources_fall_through() {
    let mut kv = MemoryKv::new();
    kv.save(LOCAL_TEMPLATE_KEY, "{not json").unwrap();
    let local: &dyn KeyValueStore = &kv;
    let init =
        load_initial_template(Some("garbage!!"), Some(local), Some(named(90.0))).unwrap();
    assert_eq!(init.origin, TemplateOrigin::Fallback);
    assert_eq!(init.template.meta.width_mm, 90.0);
}

#[test]
fn broken_link_error_reaches_the_caller() {
    let init = load_initial_template(Some("garbage!!"), None, Some(Template::default())).unwrap();
    assert_eq!(init.origin, TemplateOrigin::Fallback);
    assert!(matches!(init.link_error, Some(BadgeError::LinkDecode(_))));

    let mut kv = MemoryKv::new();
    save_local(&mut kv, &named(60.0)).unwrap();
    let local: &dyn KeyValueStore = &kv;
    let init = load_initial_template(Some("garbage!!"), Some(local), None).unwrap();
    assert_eq!(init.origin, TemplateOrigin::Local);
    assert!(matches!(init.link_error, Some(BadgeError::LinkDecode(_))));

    let err = load_initial_template(Some("garbage!!"), None, None).unwrap_err();
    assert!(matches!(err, BadgeError::NoTemplate(ref m) if m.contains("shared link")));
}

#[test]
fn nothing_available_is_no_template() {
    let kv = MemoryKv::new();
    let local: &dyn KeyValueStore = &kv;
    assert!(matches!(
        load_initial_template(None, Some(local), None).unwrap_err(),
        BadgeError::NoTemplate(_)
    ));
}

#[test]
fn publish_then_load_latest() {
    let mut store = MemoryObjectStore::new();
    assert!(load_latest_published(&store).unwrap().is_none());

    let url = publish_template(&mut store, "Staff Badge", &named(54.0)).unwrap();
    assert!(url.starts_with("memory://templates/staff-badge-"));
    assert!(url.ends_with(".json"));
    let name = url.trim_start_matches("memory://");
    assert_eq!(store.content_type(name), Some(JSON_CONTENT_TYPE));

    publish_template(&mut store, "Visitor", &named(60.0)).unwrap();
    let latest = load_latest_published(&store).unwrap().unwrap();
    assert_eq!(latest.meta.width_mm, 60.0);

    let slug = name
        .trim_start_matches(PUBLISHED_PREFIX)
        .trim_end_matches(".json");
    let first = load_published(&store, slug).unwrap().unwrap();
    assert_eq!(first.meta.width_mm, 54.0);
    assert!(load_published(&store, "nope").unwrap().is_none());
}

#[test]
fn publish_rejects_invalid_templates() {
    let mut store = MemoryObjectStore::new();
    let bad = Template::new(-1.0, 86.0);
    assert!(publish_template(&mut store, "x", &bad).is_err());
    assert!(store.is_empty());
}

#[test]
fn non_utf8_published_object_is_storage_error() {
    let mut store = MemoryObjectStore::new();
    store
        .store("templates/bin.json", &[0xff, 0xfe], JSON_CONTENT_TYPE)
        .unwrap();
    assert!(matches!(
        load_latest_published(&store).unwrap_err(),
        BadgeError::Storage(_)
    ));
}
