use std::sync::LazyLock;

use regex::Regex;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Strip every tag from a markup fragment and return its plain text,
/// entities decoded, whitespace runs collapsed and trimmed.
pub fn plain_text(markup: &str) -> String {
    let stripped = TAG_RE.replace_all(markup, " ");
    let decoded = html_escape::decode_html_entities(&stripped);
    WS_RE.replace_all(&decoded, " ").trim().to_string()
}

/// Length in characters, not bytes. `"🔥"` is 1, `"Blog"` is 4.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}
