use std::io::{Read, Write};

use anyhow::Context;
use base64::Engine;

use crate::foundation::error::{BadgeError, BadgeResult};
use crate::template::model::Template;

/// Largest template JSON a shared link may inflate to. Embedded `data:` images count.
pub const MAX_LINK_JSON_BYTES: usize = 8 * 1024 * 1024;

/// Encode a template into a compact, URL-safe shared-link payload.
///
/// Compact JSON, DEFLATE-compressed, base64 (URL-safe alphabet, no padding).
pub fn encode_link(template: &Template) -> BadgeResult<String> {
    let json = template.to_json()?;
    let mut enc = flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::best());
    enc.write_all(json.as_bytes())
        .context("compress link payload")?;
    let bytes = enc.finish().context("finish link payload")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Decode a shared-link payload produced by [`encode_link`].
///
/// Any base64, inflate or JSON failure is reported as [`BadgeError::LinkDecode`]; a payload
/// that decodes but fails validation keeps its validation error.
pub fn decode_link(payload: &str) -> BadgeResult<Template> {
    let payload = payload.trim().trim_end_matches('=');
    if payload.is_empty() {
        return Err(BadgeError::link_decode("empty link payload"));
    }
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| BadgeError::link_decode(format!("invalid base64: {e}")))?;
    let mut json = String::new();
    flate2::read::DeflateDecoder::new(bytes.as_slice())
        .take(MAX_LINK_JSON_BYTES as u64 + 1)
        .read_to_string(&mut json)
        .map_err(|e| BadgeError::link_decode(format!("invalid compressed payload: {e}")))?;
    if json.len() > MAX_LINK_JSON_BYTES {
        return Err(BadgeError::link_decode(format!(
            "link payload inflates past {MAX_LINK_JSON_BYTES} bytes"
        )));
    }
    let mut t: Template = serde_json::from_str(&json)
        .map_err(|e| BadgeError::link_decode(format!("invalid template json: {e}")))?;
    t.normalize();
    t.validate()?;
    Ok(t)
}

/// Object-store friendly slug with a base36 millisecond timestamp suffix.
pub fn slugify(name: &str) -> String {
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    slugify_at(name, millis)
}

/// [`slugify`] with an explicit timestamp.
pub fn slugify_at(name: &str, millis: u64) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.trim().chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    let slug = if slug.is_empty() { "template" } else { slug };
    format!("{slug}-{}", to_base36(millis))
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_owned();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
#[path = "../../tests/unit/template/link.rs"]
mod tests;
