use std::sync::LazyLock;

use regex::Regex;

use super::text::plain_text;
use crate::db::ProfileRecord;

/// Class that marks the short description paragraph under the name.
pub const DESCRIPTION_CLASS: &str = "bio-description";

static H1_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h1\b[^>]*>(.*?)</h1\s*>").unwrap());
static PARAGRAPH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<p\b([^>]*)>(.*?)</p\s*>").unwrap());
static CLASS_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)(?:^|\s)class\s*=\s*["']([^"']*)["']"#).unwrap());
static IMG_SRC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)<img\b[^>]*?\ssrc\s*=\s*["']([^"']+)["']"#).unwrap());

/// Best-effort profile from page markup. Fields that are not found stay `None`
/// so the caller can fall back to site defaults.
pub fn extract(markup: &str) -> ProfileRecord {
    ProfileRecord {
        name: extract_name(markup),
        description: extract_description(markup),
        logo_url: extract_logo(markup),
    }
}

fn extract_name(markup: &str) -> Option<String> {
    H1_RE
        .captures(markup)
        .map(|c| plain_text(&c[1]))
        .filter(|s| !s.is_empty())
}

fn extract_description(markup: &str) -> Option<String> {
    PARAGRAPH_RE
        .captures_iter(markup)
        .find(|c| has_class(&c[1], DESCRIPTION_CLASS))
        .map(|c| plain_text(&c[2]))
        .filter(|s| !s.is_empty())
}

fn extract_logo(markup: &str) -> Option<String> {
    IMG_SRC_RE
        .captures(markup)
        .map(|c| c[1].trim().to_string())
        .filter(|s| !s.is_empty())
}

fn has_class(attrs: &str, class: &str) -> bool {
    CLASS_ATTR_RE
        .captures(attrs)
        .is_some_and(|c| c[1].split_whitespace().any(|name| name == class))
}
