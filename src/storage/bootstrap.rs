use crate::foundation::error::{BadgeError, BadgeResult};
use crate::storage::kv::KeyValueStore;
use crate::storage::objects::ObjectStore;
use crate::template::link::{decode_link, slugify};
use crate::template::model::Template;

/// Key under which the live template is checkpointed.
pub const LOCAL_TEMPLATE_KEY: &str = "idcard_template_v2";

/// Object-name prefix of published templates.
pub const PUBLISHED_PREFIX: &str = "templates/";

const JSON_CONTENT_TYPE: &str = "application/json";

/// Where [`load_initial_template`] found its template.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemplateOrigin {
    /// Decoded from a shared link.
    Link,
    /// Restored from the local checkpoint.
    Local,
    /// The caller-supplied default document.
    Fallback,
}

/// Write the template checkpoint.
pub fn save_local(kv: &mut dyn KeyValueStore, template: &Template) -> BadgeResult<()> {
    kv.save(LOCAL_TEMPLATE_KEY, &template.to_json()?)
}

/// Read the template checkpoint, if one exists.
pub fn load_local(kv: &dyn KeyValueStore) -> BadgeResult<Option<Template>> {
    kv.get(LOCAL_TEMPLATE_KEY)?
        .map(|s| Template::from_json(&s))
        .transpose()
}

/// Result of [`load_initial_template`].
#[derive(Debug)]
pub struct InitialTemplate {
    /// Template to edit or fill.
    pub template: Template,
    /// Where it came from.
    pub origin: TemplateOrigin,
    /// Why a supplied shared link was not used; shown to the user next to the fallback.
    pub link_error: Option<BadgeError>,
}

/// Pick the template to start from: shared link, then local checkpoint, then `fallback`.
///
/// A link that fails to decode is skipped and its [`BadgeError::LinkDecode`] is returned in
/// [`InitialTemplate::link_error`]. A corrupt checkpoint is logged and skipped. Errors with
/// [`BadgeError::NoTemplate`] when nothing is available.
#[tracing::instrument(skip_all, fields(has_link = link.is_some()))]
pub fn load_initial_template(
    link: Option<&str>,
    kv: Option<&dyn KeyValueStore>,
    fallback: Option<Template>,
) -> BadgeResult<InitialTemplate> {
    let mut link_error = None;
    if let Some(payload) = link.filter(|s| !s.trim().is_empty()) {
        match decode_link(payload) {
            Ok(template) => {
                return Ok(InitialTemplate {
                    template,
                    origin: TemplateOrigin::Link,
                    link_error: None,
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "shared link unusable, falling back");
                link_error = Some(e);
            }
        }
    }
    let restored = match kv.map(load_local).transpose() {
        Ok(t) => t.flatten(),
        Err(e) => {
            tracing::warn!(error = %e, "local checkpoint unusable, falling back");
            None
        }
    };
    let (template, origin) = match (restored, fallback) {
        (Some(t), _) => (t, TemplateOrigin::Local),
        (None, Some(t)) => (t, TemplateOrigin::Fallback),
        (None, None) => {
            let why = match &link_error {
                Some(e) => format!("shared link unusable ({e}), no local checkpoint or default"),
                None => "no shared link, local checkpoint or default template".to_owned(),
            };
            return Err(BadgeError::no_template(why));
        }
    };
    Ok(InitialTemplate {
        template,
        origin,
        link_error,
    })
}

/// Publish a template as `templates/<slug>.json` and return its URL.
#[tracing::instrument(skip(store, template))]
pub fn publish_template(
    store: &mut dyn ObjectStore,
    name: &str,
    template: &Template,
) -> BadgeResult<String> {
    template.validate()?;
    let slug = slugify(name);
    let object = format!("{PUBLISHED_PREFIX}{slug}.json");
    let url = store.store(&object, template.to_json_pretty()?.as_bytes(), JSON_CONTENT_TYPE)?;
    tracing::info!(slug = %slug, url = %url, "template published");
    Ok(url)
}

/// The most recently published template, if any.
pub fn load_latest_published(store: &dyn ObjectStore) -> BadgeResult<Option<Template>> {
    read_published(store, PUBLISHED_PREFIX)
}

/// The template published under `slug`, if any.
pub fn load_published(store: &dyn ObjectStore, slug: &str) -> BadgeResult<Option<Template>> {
    read_published(store, &format!("{PUBLISHED_PREFIX}{slug}.json"))
}

fn read_published(store: &dyn ObjectStore, prefix: &str) -> BadgeResult<Option<Template>> {
    let Some(url) = store.fetch_latest(prefix)? else {
        return Ok(None);
    };
    let bytes = store.read(&url)?;
    let s = std::str::from_utf8(&bytes)
        .map_err(|e| BadgeError::storage(format!("published template is not utf-8: {e}")))?;
    Template::from_json(s).map(Some)
}

#[cfg(test)]
#[path = "../../tests/unit/storage/bootstrap.rs"]
mod tests;
