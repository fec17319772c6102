use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

pub const DEFAULT_DB_PATH: &str = "data/bio.sqlite";

pub const BIO_LINKS_TABLE: &str = "fp_pub_bio_links";
pub const REMOTE_SITES_TABLE: &str = "fp_pub_remote_sites";
pub const BIO_SETTINGS_TABLE: &str = "fp_pub_bio_settings";

pub fn connect(path: &str) -> Result<Connection> {
    if let Some(dir) = Path::new(path).parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create database directory {}", dir.display()))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

/// Host-side tables: pages by slug, site metadata and the options store.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS pages (
            slug       TEXT PRIMARY KEY,
            title      TEXT,
            content    TEXT NOT NULL DEFAULT '',
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS site_meta (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS options (
            name  TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}

/// Tables normally owned by the companion publishing tool.
pub fn init_publisher_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS fp_pub_remote_sites (
            id       INTEGER PRIMARY KEY,
            site_url TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS fp_pub_bio_links (
            id             INTEGER PRIMARY KEY,
            remote_site_id INTEGER REFERENCES fp_pub_remote_sites(id),
            title          TEXT NOT NULL,
            url            TEXT NOT NULL,
            icon           TEXT,
            sort_order     INTEGER NOT NULL DEFAULT 0,
            is_active      BOOLEAN NOT NULL DEFAULT 1,
            expires_at     TEXT,
            click_count    INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_bio_links_active ON fp_pub_bio_links(is_active, sort_order);

        CREATE TABLE IF NOT EXISTS fp_pub_bio_settings (
            setting_key   TEXT PRIMARY KEY,
            setting_value TEXT
        );
        ",
    )?;
    Ok(())
}

pub fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |r| r.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

// ── Records ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LinkId {
    /// Row id in the publisher's links table; clicks can be tracked.
    Stored(i64),
    /// Content hash of the URL, for links scraped from page markup.
    Hashed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRecord {
    pub id: LinkId,
    pub title: String,
    pub url: String,
    pub icon: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileRecord {
    pub name: Option<String>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
}

// ── Pages ──

pub fn upsert_page(conn: &Connection, slug: &str, title: Option<&str>, content: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO pages (slug, title, content) VALUES (?1, ?2, ?3)
         ON CONFLICT(slug) DO UPDATE SET
             title = COALESCE(excluded.title, pages.title),
             content = excluded.content,
             updated_at = datetime('now')",
        rusqlite::params![slug, title, content],
    )?;
    Ok(())
}

pub fn fetch_page_content(conn: &Connection, slug: &str) -> Result<Option<String>> {
    let content = conn
        .query_row("SELECT content FROM pages WHERE slug = ?1", [slug], |r| r.get(0))
        .optional()?;
    Ok(content)
}

// ── Site metadata ──

pub const SITE_KEYS: &[&str] = &["name", "description", "home_url", "logo_url", "locale"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteInfo {
    pub name: String,
    pub description: String,
    pub home_url: String,
    pub logo_url: String,
    pub locale: String,
}

impl Default for SiteInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            home_url: "http://localhost".to_string(),
            logo_url: String::new(),
            locale: "en".to_string(),
        }
    }
}

pub fn set_site_meta(conn: &Connection, key: &str, value: &str) -> Result<()> {
    anyhow::ensure!(
        SITE_KEYS.contains(&key),
        "Unknown site key '{}' (expected one of: {})",
        key,
        SITE_KEYS.join(", ")
    );
    conn.execute(
        "INSERT OR REPLACE INTO site_meta (key, value) VALUES (?1, ?2)",
        rusqlite::params![key, value],
    )?;
    Ok(())
}

pub fn fetch_site_info(conn: &Connection) -> Result<SiteInfo> {
    let mut site = SiteInfo::default();
    let mut stmt = conn.prepare("SELECT key, value FROM site_meta")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    for (key, value) in rows {
        match key.as_str() {
            "name" => site.name = value,
            "description" => site.description = value,
            "home_url" if !value.is_empty() => site.home_url = value,
            "logo_url" => site.logo_url = value,
            "locale" if !value.is_empty() => site.locale = value,
            _ => {}
        }
    }
    Ok(site)
}

// ── Options ──

pub fn load_option(conn: &Connection, name: &str) -> Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM options WHERE name = ?1", [name], |r| r.get(0))
        .optional()?;
    Ok(value)
}

pub fn save_option(conn: &Connection, name: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO options (name, value) VALUES (?1, ?2)",
        rusqlite::params![name, value],
    )?;
    Ok(())
}

// ── Publisher links ──

pub struct BioLinkRow {
    pub remote_site_id: Option<i64>,
    pub title: String,
    pub url: String,
    pub icon: Option<String>,
    pub sort_order: i64,
    pub is_active: bool,
    pub expires_at: Option<String>, // "YYYY-MM-DD HH:MM:SS", UTC
}

pub fn insert_remote_site(conn: &Connection, site_url: &str) -> Result<i64> {
    conn.execute("INSERT INTO fp_pub_remote_sites (site_url) VALUES (?1)", [site_url])?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_bio_link(conn: &Connection, row: &BioLinkRow) -> Result<i64> {
    conn.execute(
        "INSERT INTO fp_pub_bio_links
         (remote_site_id, title, url, icon, sort_order, is_active, expires_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            row.remote_site_id, row.title, row.url, row.icon, row.sort_order, row.is_active,
            row.expires_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Remote site whose URL mentions `host`.
pub fn find_remote_site_id(conn: &Connection, host: &str) -> Result<Option<i64>> {
    let pattern = format!("%{}%", escape_like(host));
    let id = conn
        .query_row(
            "SELECT id FROM fp_pub_remote_sites WHERE site_url LIKE ?1 ESCAPE '\\' ORDER BY id LIMIT 1",
            [pattern],
            |r| r.get(0),
        )
        .optional()?;
    Ok(id)
}

pub fn fetch_active_links(
    conn: &Connection,
    remote_site_id: Option<i64>,
    now: DateTime<Utc>,
) -> Result<Vec<LinkRecord>> {
    let now = now.format("%Y-%m-%d %H:%M:%S").to_string();
    let site_clause = if remote_site_id.is_some() { " AND remote_site_id = ?2" } else { "" };
    let sql = format!(
        "SELECT id, title, url, icon FROM fp_pub_bio_links
         WHERE is_active = 1{}
           AND (expires_at IS NULL OR expires_at > ?1)
         ORDER BY sort_order ASC, id ASC",
        site_clause
    );

    let mut stmt = conn.prepare(&sql)?;
    let map_row = |row: &rusqlite::Row| -> rusqlite::Result<LinkRecord> {
        Ok(LinkRecord {
            id: LinkId::Stored(row.get(0)?),
            title: row.get(1)?,
            url: row.get(2)?,
            icon: row
                .get::<_, Option<String>>(3)?
                .unwrap_or_else(|| crate::parser::links::DEFAULT_ICON.to_string()),
        })
    };
    let rows = match remote_site_id {
        Some(id) => stmt.query_map(rusqlite::params![now, id], map_row)?,
        None => stmt.query_map(rusqlite::params![now], map_row)?,
    }
    .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Bump the click counter and return the link's destination.
pub fn track_click(conn: &Connection, link_id: i64) -> Result<Option<String>> {
    if link_id <= 0 || !table_exists(conn, BIO_LINKS_TABLE)? {
        return Ok(None);
    }
    conn.execute(
        "UPDATE fp_pub_bio_links SET click_count = click_count + 1 WHERE id = ?1",
        [link_id],
    )?;
    let url = conn
        .query_row("SELECT url FROM fp_pub_bio_links WHERE id = ?1", [link_id], |r| r.get(0))
        .optional()?;
    Ok(url)
}

pub fn fetch_click_count(conn: &Connection, link_id: i64) -> Result<Option<i64>> {
    let count = conn
        .query_row(
            "SELECT click_count FROM fp_pub_bio_links WHERE id = ?1",
            [link_id],
            |r| r.get(0),
        )
        .optional()?;
    Ok(count)
}

// ── Publisher settings ──

pub fn fetch_publisher_settings(conn: &Connection) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare(
        "SELECT setting_key, COALESCE(setting_value, '') FROM fp_pub_bio_settings",
    )?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
pub(crate) fn set_publisher_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO fp_pub_bio_settings (setting_key, setting_value) VALUES (?1, ?2)",
        rusqlite::params![key, value],
    )?;
    Ok(())
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
pub(crate) fn test_conn(publisher: bool) -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    init_schema(&conn).unwrap();
    if publisher {
        init_publisher_schema(&conn).unwrap();
    }
    conn
}
