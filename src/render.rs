use std::fmt::Write as _;

use anyhow::Result;
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

use crate::bio::{self, BioPage, BIO_SLUG};
use crate::parser::links::DEFAULT_ICON;
use crate::settings::{is_hex_color, Theme, DEFAULT_PRIMARY_COLOR};

/// Only this many links get their own entrance delay.
const STAGGERED_LINKS: usize = 10;
const PROMO_URL: &str = "https://francescopasseri.com";
const EMPTY_MESSAGE: &str = "No links available";

const STYLE: &str = r#"
        html.dark {
            --bg: #0a0a0a;
            --surface: #141414;
            --text: #fafafa;
            --text-muted: #9ca3af;
            --border: #262626;
            --shadow: 0 2px 8px rgba(0,0,0,0.3);
        }

        @media (prefers-color-scheme: dark) {
            :root:not(.light) {
                --bg: #0a0a0a;
                --surface: #141414;
                --text: #fafafa;
                --text-muted: #9ca3af;
                --border: #262626;
                --shadow: 0 2px 8px rgba(0,0,0,0.3);
            }
        }

        *, *::before, *::after { box-sizing: border-box; margin: 0; padding: 0; }

        html, body {
            min-height: 100vh;
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, 'Helvetica Neue', Arial, sans-serif;
            background: var(--bg);
            color: var(--text);
            -webkit-font-smoothing: antialiased;
        }

        body { display: flex; flex-direction: column; align-items: center; padding: 48px 20px 100px; }

        .bio-container { width: 100%; max-width: 420px; display: flex; flex-direction: column; align-items: center; }
        .bio-header { text-align: center; margin-bottom: 32px; animation: fadeInUp 0.5s ease forwards; }

        .bio-logo {
            width: 100px;
            height: 100px;
            border-radius: 50%;
            object-fit: cover;
            border: 3px solid var(--primary);
            margin-bottom: 16px;
            box-shadow: 0 0 0 4px var(--primary-light);
        }

        .bio-name { font-size: 1.5rem; font-weight: 700; margin-bottom: 6px; letter-spacing: -0.02em; }
        .bio-description { font-size: 0.9rem; color: var(--text-muted); max-width: 280px; line-height: 1.5; }
        .bio-links { width: 100%; display: flex; flex-direction: column; gap: 12px; }

        .bio-link {
            display: flex;
            align-items: center;
            justify-content: center;
            gap: 10px;
            width: 100%;
            min-height: 56px;
            padding: 14px 20px;
            background: var(--surface);
            border: 1px solid var(--border);
            border-radius: var(--radius);
            text-decoration: none;
            color: var(--text);
            font-weight: 500;
            transition: all 0.2s ease;
            box-shadow: var(--shadow);
            animation: fadeInUp 0.4s ease forwards;
            opacity: 0;
        }

        .bio-link:hover, .bio-link:focus {
            background: var(--primary);
            border-color: var(--primary);
            color: #fff;
            transform: translateY(-2px);
            box-shadow: 0 6px 20px rgba(0,0,0,0.15);
        }

        .bio-link:active { transform: translateY(0); }
        .bio-link-icon { font-size: 1.2em; flex-shrink: 0; }

        .bio-footer {
            position: fixed;
            bottom: 0;
            left: 0;
            right: 0;
            padding: 20px;
            text-align: center;
            font-size: 0.75rem;
            color: var(--text-muted);
            background: linear-gradient(transparent, var(--bg) 50%);
        }

        .bio-footer a { color: inherit; text-decoration: none; opacity: 0.8; }
        .bio-footer a:hover { opacity: 1; }

        .bio-empty { text-align: center; padding: 40px 20px; color: var(--text-muted); }
        .bio-empty-icon { font-size: 3rem; margin-bottom: 16px; opacity: 0.5; }

        @keyframes fadeInUp {
            from { opacity: 0; transform: translateY(16px); }
            to { opacity: 1; transform: translateY(0); }
        }

        @media (prefers-reduced-motion: reduce) {
            .bio-header, .bio-link { animation: none; opacity: 1; }
        }
"#;

/// Render the standalone bio page. Every dynamic value is escaped here and
/// nowhere else.
pub fn render_page(page: &BioPage) -> Result<String> {
    let profile = &page.profile;
    let primary = css_color(page.settings.primary_color());
    let page_url = format!("{}/{}", page.site.home_url.trim_end_matches('/'), BIO_SLUG);
    let logo = safe_url(&profile.logo_url);

    let mut html = String::with_capacity(8 * 1024);

    let theme_class = match page.settings.theme {
        Theme::Dark => " class=\"dark\"",
        Theme::Light => " class=\"light\"",
        Theme::Auto => "",
    };
    write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"{}\"{}>\n<head>\n",
        attr(&page.site.locale.replace('_', "-")),
        theme_class
    )?;

    html.push_str("    <meta charset=\"UTF-8\">\n");
    html.push_str("    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    writeln!(html, "    <meta name=\"theme-color\" content=\"{}\">", attr(primary))?;
    writeln!(html, "    <meta name=\"description\" content=\"{}\">", attr(&profile.description))?;
    writeln!(html, "    <meta property=\"og:title\" content=\"{} - Link\">", attr(&profile.name))?;
    writeln!(html, "    <meta property=\"og:description\" content=\"{}\">", attr(&profile.description))?;
    html.push_str("    <meta property=\"og:type\" content=\"website\">\n");
    if let Some(url) = safe_url(&page_url) {
        writeln!(html, "    <meta property=\"og:url\" content=\"{}\">", attr(url))?;
    }
    if let Some(logo) = logo {
        writeln!(html, "    <meta property=\"og:image\" content=\"{}\">", attr(logo))?;
    }
    writeln!(html, "    <title>{} - Link</title>", text(&profile.name))?;

    html.push_str("    <style>\n");
    write!(
        html,
        "        :root {{\n            --primary: {p};\n            --primary-light: {p}22;\n            \
         --bg: #fafafa;\n            --surface: #ffffff;\n            --text: #1a1a1a;\n            \
         --text-muted: #6b7280;\n            --border: #e5e7eb;\n            --radius: 14px;\n            \
         --shadow: 0 2px 8px rgba(0,0,0,0.08);\n        }}\n",
        p = primary
    )?;
    html.push_str(STYLE);
    for i in 0..page.links.len().min(STAGGERED_LINKS) {
        writeln!(
            html,
            "        .bio-link:nth-child({}) {{ animation-delay: {:.2}s; }}",
            i + 1,
            animation_delay(i)
        )?;
    }
    html.push_str("    </style>\n</head>\n<body>\n");

    html.push_str("    <div class=\"bio-container\">\n        <header class=\"bio-header\">\n");
    if let Some(logo) = logo {
        writeln!(
            html,
            "            <img src=\"{}\" alt=\"{}\" class=\"bio-logo\">",
            attr(logo),
            attr(&profile.name)
        )?;
    }
    writeln!(html, "            <h1 class=\"bio-name\">{}</h1>", text(&profile.name))?;
    if !profile.description.is_empty() {
        writeln!(
            html,
            "            <p class=\"bio-description\">{}</p>",
            text(&profile.description)
        )?;
    }
    html.push_str("        </header>\n\n        <nav class=\"bio-links\" aria-label=\"Links\">\n");

    if page.links.is_empty() {
        write!(
            html,
            "            <div class=\"bio-empty\">\n                <div class=\"bio-empty-icon\">{}</div>\n                <p>{}</p>\n            </div>\n",
            DEFAULT_ICON, EMPTY_MESSAGE
        )?;
    }
    for link in &page.links {
        let href = bio::link_href(link, &page.site);
        let Some(href) = safe_url(&href) else {
            continue;
        };
        writeln!(
            html,
            "            <a href=\"{}\" class=\"bio-link\" target=\"_blank\" rel=\"noopener\">",
            attr(href)
        )?;
        if !link.icon.is_empty() {
            writeln!(html, "                <span class=\"bio-link-icon\">{}</span>", text(&link.icon))?;
        }
        writeln!(html, "                <span>{}</span>", text(&link.title))?;
        html.push_str("            </a>\n");
    }

    html.push_str("        </nav>\n    </div>\n\n");
    writeln!(
        html,
        "    <footer class=\"bio-footer\">\n        <p>Powered by <a href=\"{}\" target=\"_blank\" rel=\"noopener\">FP Publisher</a></p>\n    </footer>",
        PROMO_URL
    )?;
    html.push_str("</body>\n</html>\n");

    Ok(html)
}

fn animation_delay(index: usize) -> f64 {
    0.1 + index as f64 * 0.05
}

fn css_color(color: &str) -> &str {
    if is_hex_color(color) {
        color.trim()
    } else {
        DEFAULT_PRIMARY_COLOR
    }
}

/// Reject script-capable schemes. Relative URLs and the usual link schemes pass.
fn safe_url(url: &str) -> Option<&str> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    let scheme_end = url.find(':');
    let path_start = url.find(['/', '?', '#']);
    match scheme_end {
        Some(i) if path_start.map_or(true, |p| i < p) => {
            let scheme = url[..i].to_ascii_lowercase();
            matches!(scheme.as_str(), "http" | "https" | "mailto" | "tel").then_some(url)
        }
        _ => Some(url),
    }
}
