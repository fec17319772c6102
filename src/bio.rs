use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use tracing::info;

use crate::db::{self, LinkId, LinkRecord, ProfileRecord, SiteInfo};
use crate::parser;
use crate::settings::{self, Settings};

/// Slug of the page whose content feeds the fallback path.
pub const BIO_SLUG: &str = "bio";
pub const CLICK_PARAM: &str = "fp_bio_click";

/// Profile with every field resolved. Empty string means "nothing anywhere".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub name: String,
    pub description: String,
    pub logo_url: String,
}

/// Everything the renderer needs for one request.
#[derive(Debug, Clone, Serialize)]
pub struct BioPage {
    pub site: SiteInfo,
    pub settings: Settings,
    pub profile: Profile,
    pub links: Vec<LinkRecord>,
}

pub fn build(conn: &Connection, now: DateTime<Utc>) -> Result<BioPage> {
    let site = db::fetch_site_info(conn)?;
    let settings = settings::load(conn)?;
    let markup = db::fetch_page_content(conn, BIO_SLUG)?;

    let links = resolve_links(conn, &site, markup.as_deref(), now)?;
    let record = markup.as_deref().map(parser::profile::extract).unwrap_or_default();
    let profile = resolve_profile(&record, &settings, &site);

    Ok(BioPage { site, settings, profile, links })
}

/// Links from the publisher's table when it has any for this site, otherwise
/// whatever can be scraped from the bio page markup.
pub fn resolve_links(
    conn: &Connection,
    site: &SiteInfo,
    markup: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Vec<LinkRecord>> {
    if db::table_exists(conn, db::BIO_LINKS_TABLE)? {
        let remote_site_id = if db::table_exists(conn, db::REMOTE_SITES_TABLE)? {
            match extract_domain(&site.home_url) {
                Some(host) => db::find_remote_site_id(conn, &host)?,
                None => None,
            }
        } else {
            None
        };

        let links = db::fetch_active_links(conn, remote_site_id, now)?;
        if !links.is_empty() {
            info!(count = links.len(), ?remote_site_id, "Using publisher links");
            return Ok(links);
        }
    }

    let links = markup.map(parser::links::extract).unwrap_or_default();
    info!(count = links.len(), "Using links parsed from the '{}' page", BIO_SLUG);
    Ok(links)
}

/// Settings win over markup, markup wins over site defaults. The name has no
/// setting, so it is markup then site name.
pub fn resolve_profile(record: &ProfileRecord, settings: &Settings, site: &SiteInfo) -> Profile {
    let pick = |candidates: [Option<&str>; 3]| -> String {
        candidates
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
            .unwrap_or_default()
            .to_string()
    };

    Profile {
        name: pick([record.name.as_deref(), Some(site.name.as_str()), None]),
        description: pick([
            Some(settings.description.as_str()),
            record.description.as_deref(),
            Some(site.description.as_str()),
        ]),
        logo_url: pick([
            Some(settings.logo_url.as_str()),
            record.logo_url.as_deref(),
            Some(site.logo_url.as_str()),
        ]),
    }
}

/// Where a rendered link should point: stored links go through the click
/// counter, scraped links go straight to their destination.
pub fn link_href(link: &LinkRecord, site: &SiteInfo) -> String {
    match &link.id {
        LinkId::Stored(id) => format!(
            "{}/{}?{}={}",
            site.home_url.trim_end_matches('/'),
            BIO_SLUG,
            CLICK_PARAM,
            id
        ),
        LinkId::Hashed(_) => link.url.clone(),
    }
}

fn extract_domain(url: &str) -> Option<String> {
    let host = url
        .split("//")
        .nth(1)
        .unwrap_or(url)
        .split(['/', '?', '#', ':'])
        .next()
        .unwrap_or("")
        .trim_start_matches("www.");
    if host.is_empty() {
        None
    } else {
        Some(host.to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{test_conn, BioLinkRow};
    use chrono::TimeZone;

    const MARKUP: &str = r#"
        <h1>Giulia</h1>
        <p class="bio-description">Ceramics</p>
        <a href="https://x.example/a"><span>🔥</span><span>Shop Now</span></a>
    "#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn site() -> SiteInfo {
        SiteInfo {
            name: "Giulia Site".into(),
            description: "Just another site".into(),
            home_url: "https://www.giulia.example.com/".into(),
            logo_url: "https://giulia.example.com/logo.png".into(),
            locale: "it_IT".into(),
        }
    }

    fn stored(title: &str, remote_site_id: Option<i64>) -> BioLinkRow {
        BioLinkRow {
            remote_site_id,
            title: title.into(),
            url: format!("https://{}.example", title.to_lowercase()),
            icon: Some("⭐".into()),
            sort_order: 0,
            is_active: true,
            expires_at: None,
        }
    }

    #[test]
    fn falls_back_to_markup_without_publisher() {
        let conn = test_conn(false);
        let links = resolve_links(&conn, &site(), Some(MARKUP), now()).unwrap();
        assert_eq!(links.len(), 1);
        assert!(matches!(links[0].id, LinkId::Hashed(_)));
    }

    #[test]
    fn falls_back_when_publisher_table_empty() {
        let conn = test_conn(true);
        let links = resolve_links(&conn, &site(), Some(MARKUP), now()).unwrap();
        assert_eq!(links[0].title, "Shop Now");
    }

    #[test]
    fn publisher_links_preferred_and_scoped() {
        let conn = test_conn(true);
        let mine = db::insert_remote_site(&conn, "https://giulia.example.com").unwrap();
        let other = db::insert_remote_site(&conn, "https://other.example.org").unwrap();
        db::insert_bio_link(&conn, &stored("Mine", Some(mine))).unwrap();
        db::insert_bio_link(&conn, &stored("Theirs", Some(other))).unwrap();

        let links = resolve_links(&conn, &site(), Some(MARKUP), now()).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].title, "Mine");
        assert_eq!(links[0].icon, "⭐");
    }

    #[test]
    fn no_markup_no_links() {
        let conn = test_conn(false);
        assert!(resolve_links(&conn, &site(), None, now()).unwrap().is_empty());
    }

    #[test]
    fn profile_precedence() {
        let record = parser::profile::extract(MARKUP);
        let mut settings = Settings::default();
        let p = resolve_profile(&record, &settings, &site());
        assert_eq!(p.name, "Giulia");
        assert_eq!(p.description, "Ceramics");
        assert_eq!(p.logo_url, "https://giulia.example.com/logo.png");

        settings.description = "From settings".into();
        settings.logo_url = "https://cdn.example/me.png".into();
        let p = resolve_profile(&record, &settings, &site());
        assert_eq!(p.description, "From settings");
        assert_eq!(p.logo_url, "https://cdn.example/me.png");
    }

    #[test]
    fn profile_never_absent() {
        let p = resolve_profile(&ProfileRecord::default(), &Settings::default(), &SiteInfo::default());
        assert_eq!(p.name, "");
        assert_eq!(p.description, "");
        assert_eq!(p.logo_url, "");

        let p = resolve_profile(&ProfileRecord::default(), &Settings::default(), &site());
        assert_eq!(p.name, "Giulia Site");
        assert_eq!(p.description, "Just another site");
    }

    #[test]
    fn stored_links_are_tracked() {
        let link = LinkRecord {
            id: LinkId::Stored(7),
            title: "Shop".into(),
            url: "https://shop.example".into(),
            icon: "🛒".into(),
        };
        assert_eq!(link_href(&link, &site()), "https://www.giulia.example.com/bio?fp_bio_click=7");

        let scraped = LinkRecord { id: LinkId::Hashed("abc".into()), ..link };
        assert_eq!(link_href(&scraped, &site()), "https://shop.example");
    }

    #[test]
    fn domain_from_home_url() {
        assert_eq!(extract_domain("https://www.Giulia.example.com/").as_deref(), Some("giulia.example.com"));
        assert_eq!(extract_domain("http://localhost:8080").as_deref(), Some("localhost"));
        assert_eq!(extract_domain(""), None);
    }

    #[test]
    fn build_from_store() {
        let conn = test_conn(false);
        db::upsert_page(&conn, BIO_SLUG, Some("Bio"), MARKUP).unwrap();
        db::set_site_meta(&conn, "name", "Fallback Name").unwrap();
        let page = build(&conn, now()).unwrap();
        assert_eq!(page.profile.name, "Giulia");
        assert_eq!(page.links.len(), 1);
    }
}
