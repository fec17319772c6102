use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

use super::text::{char_len, plain_text};
use crate::db::{LinkId, LinkRecord};

pub const DEFAULT_ICON: &str = "🔗";

/// Anything at or under this many characters is treated as a glyph, not a title.
pub const GLYPH_MAX_CHARS: usize = 4;

static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<a\s(?:[^>]*?\s)?href\s*=\s*(?:"([^"]+)"|'([^']+)')[^>]*>(.*?)</a\s*>"#,
    )
    .unwrap()
});
static SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<span\b[^>]*>(.*?)</span\s*>").unwrap());

const ADMIN_PATHS: &[&str] = &["wp-admin", "wp-login"];
const PROMO_DOMAINS: &[&str] = &["francescopasseri.com"];

/// Pull bio links out of stored page markup, in document order.
pub fn extract(markup: &str) -> Vec<LinkRecord> {
    ANCHOR_RE
        .captures_iter(markup)
        .filter_map(|caps| {
            let Some(url) = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()) else {
                return None;
            };
            if is_excluded(url) {
                debug!(url, "skipping excluded anchor");
                return None;
            }
            let record = build_record(url, &caps[3]);
            if record.is_none() {
                debug!(url, "skipping anchor without a usable title");
            }
            record
        })
        .collect()
}

/// Stable id for a link that has no stored row: xxh3 of the URL, hex encoded.
pub fn link_id(url: &str) -> String {
    format!("{:016x}", xxh3_64(url.as_bytes()))
}

fn is_excluded(url: &str) -> bool {
    url.starts_with('#')
        || ADMIN_PATHS.iter().any(|p| url.contains(p))
        || PROMO_DOMAINS.iter().any(|d| url.contains(d))
}

fn build_record(url: &str, inner: &str) -> Option<LinkRecord> {
    let spans: Vec<String> = SPAN_RE
        .captures_iter(inner)
        .map(|c| plain_text(&c[1]))
        .collect();

    let glyph = spans
        .first()
        .filter(|t| !t.is_empty() && char_len(t) <= GLYPH_MAX_CHARS)
        .cloned();
    let icon = glyph.clone().unwrap_or_else(|| DEFAULT_ICON.to_string());

    let title = resolve_title(&plain_text(inner), glyph.as_deref(), &icon, &spans);
    if title.is_empty() || title == icon {
        return None;
    }

    Some(LinkRecord {
        id: LinkId::Hashed(link_id(url)),
        title,
        url: url.to_string(),
        icon,
    })
}

fn resolve_title(candidate: &str, glyph: Option<&str>, icon: &str, spans: &[String]) -> String {
    let looks_like_glyph = candidate == icon || char_len(candidate) <= GLYPH_MAX_CHARS;
    if !looks_like_glyph {
        // "🔥 Shop Now": the icon span leaked into the stripped text.
        return glyph
            .and_then(|g| candidate.strip_prefix(g))
            .map(str::trim)
            .filter(|rest| !rest.is_empty())
            .unwrap_or(candidate)
            .to_string();
    }

    spans
        .iter()
        .find(|t| t.as_str() != icon && char_len(t) > GLYPH_MAX_CHARS)
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    #[test]
    fn no_anchors_no_links() {
        assert!(extract("<h1>Hello</h1><p>Nothing to click here.</p>").is_empty());
        assert!(extract("").is_empty());
    }

    #[test]
    fn icon_and_title_spans() {
        let links = extract(r#"<a href="https://x.example/a"><span>🔥</span><span>Shop Now</span></a>"#);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].icon, "🔥");
        assert_eq!(links[0].title, "Shop Now");
        assert_eq!(links[0].url, "https://x.example/a");
    }

    #[test]
    fn in_page_anchor_dropped() {
        let links = extract(r##"<a href="#top"><span>⬆️</span><span>Back to top</span></a>"##);
        assert!(links.is_empty());
    }

    #[test]
    fn promo_footer_dropped() {
        let links = extract(
            r#"<p>Powered by <a href="https://francescopasseri.com" target="_blank">FP Publisher</a></p>"#,
        );
        assert!(links.is_empty());
    }

    #[test]
    fn admin_and_login_dropped() {
        let html = r#"
            <a href="https://site.example/wp-admin/options.php">Settings page</a>
            <a href="https://site.example/wp-login.php">Log in here</a>
            <a href="https://site.example/shop">Visit the shop</a>
        "#;
        let links = extract(html);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://site.example/shop");
    }

    #[test]
    fn same_url_same_id() {
        let html = r#"
            <a href="https://x.example/a"><span>🔥</span><span>Shop Now</span></a>
            <a href="https://x.example/a">The same shop again</a>
        "#;
        let links = extract(html);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].id, links[1].id);
        assert_ne!(link_id("https://x.example/a"), link_id("https://x.example/b"));
    }

    #[test]
    fn lone_icon_span_dropped() {
        assert!(extract(r#"<a href="https://x.example/b"><span>🎵</span></a>"#).is_empty());
    }

    #[test]
    fn plain_anchor_gets_default_icon() {
        let links = extract(r#"<a href="https://x.example/c">My latest video</a>"#);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].icon, DEFAULT_ICON);
        assert_eq!(links[0].title, "My latest video");
    }

    #[test]
    fn short_plain_title_dropped() {
        // Known fragility of the glyph heuristic: a four letter word looks like an icon.
        assert!(extract(r#"<a href="https://x.example/blog">Blog</a>"#).is_empty());
    }

    #[test]
    fn long_first_span_is_not_an_icon() {
        let links = extract(r#"<a href="https://x.example/d"><span>Book a call</span></a>"#);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].icon, DEFAULT_ICON);
        assert_eq!(links[0].title, "Book a call");
    }

    #[test]
    fn icon_followed_by_bare_text() {
        let links = extract(r#"<a href="https://x.example/e"><span>📸</span> Instagram</a>"#);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].icon, "📸");
        assert_eq!(links[0].title, "Instagram");
    }

    #[test]
    fn attributes_case_and_quotes() {
        let html = "<A class='btn' HREF='https://x.example/f' target=\"_blank\">\n  <SPAN class=\"i\">🎧</SPAN>\n  <SPAN>Podcast episodes</SPAN>\n</A>";
        let links = extract(html);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://x.example/f");
        assert_eq!(links[0].icon, "🎧");
        assert_eq!(links[0].title, "Podcast episodes");
    }

    #[test]
    fn unterminated_anchor_not_matched() {
        assert!(extract(r#"<a href="https://x.example/g"><span>🔥</span><span>Shop Now</span>"#).is_empty());
    }

    #[test]
    fn url_kept_verbatim() {
        let links = extract(r#"<a href="https://x.example/s?q=a&amp;b=c">Search results</a>"#);
        assert_eq!(links[0].url, "https://x.example/s?q=a&amp;b=c");
    }

    #[test]
    fn bare_text_after_icon_beats_later_span() {
        let links = extract(
            r#"<a href="https://x.example/a"><span>🔥</span> Big sale <span>Limited offer</span></a>"#,
        );
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].icon, "🔥");
        assert_eq!(links[0].title, "Big sale Limited offer");
    }

    #[test]
    fn href_needs_attribute_boundary() {
        let links = extract(
            r#"<a data-href="https://tracker.example/x" href="https://real.example/shop">Visit the shop</a>"#,
        );
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://real.example/shop");

        let links = extract(r##"<a data-href="#" href="https://real.example/shop">Visit the shop</a>"##);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://real.example/shop");
    }

    #[test]
    fn href_whitespace_kept() {
        let links = extract(r#"<a href=" https://x.example/sp ">Spaced out link</a>"#);
        assert_eq!(links[0].url, " https://x.example/sp ");
    }

    #[test]
    fn apostrophe_inside_double_quoted_href() {
        let links = extract(r#"<a href="https://x.example/it's">It is here</a>"#);
        assert_eq!(links[0].url, "https://x.example/it's");

        let links = extract(r#"<a href='https://x.example/say"hi"'>Say hello</a>"#);
        assert_eq!(links[0].url, r#"https://x.example/say"hi""#);
    }

    #[test]
    fn title_not_escaped() {
        let links = extract(r#"<a href="https://x.example/h"><span>🍕</span><span>Fish &amp; Chips</span></a>"#);
        assert_eq!(links[0].title, "Fish & Chips");
    }

    #[test]
    fn publisher_page_fixture() {
        let html = fixture("bio_page");
        let links = extract(&html);
        let titles: Vec<&str> = links.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Shop Now", "Latest YouTube video", "Newsletter signup", "Book a consultation"]
        );
        assert_eq!(links[0].icon, "🔥");
        assert_eq!(links[3].icon, DEFAULT_ICON);
        assert!(links.iter().all(|l| !l.url.starts_with('#')));
        assert!(links.iter().all(|l| !l.url.contains("francescopasseri.com")));
    }

    #[test]
    fn extraction_is_deterministic() {
        let html = fixture("bio_page");
        assert_eq!(extract(&html), extract(&html));
    }
}
