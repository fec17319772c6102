use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::db;

/// Options-table key holding the user's saved display settings (JSON object).
pub const OPTION_NAME: &str = "bio_settings";
pub const DEFAULT_PRIMARY_COLOR: &str = "#3b82f6";

pub const SETTING_KEYS: &[&str] = &["primary_color", "theme", "logo_url", "description"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Follows the visitor's `prefers-color-scheme`.
    #[default]
    Auto,
    Light,
    Dark,
}

impl Theme {
    pub fn parse(s: &str) -> Option<Theme> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Theme::Auto),
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Auto => "auto",
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub primary_color: String,
    pub theme: Theme,
    pub logo_url: String,
    pub description: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            primary_color: DEFAULT_PRIMARY_COLOR.to_string(),
            theme: Theme::Auto,
            logo_url: String::new(),
            description: String::new(),
        }
    }
}

impl Settings {
    /// Overlay one stored key. Unknown keys are ignored; unknown themes become `auto`.
    fn apply(&mut self, key: &str, value: &str) {
        match key {
            "primary_color" => self.primary_color = value.trim().to_string(),
            "theme" => self.theme = Theme::parse(value).unwrap_or_default(),
            "logo_url" => self.logo_url = value.trim().to_string(),
            "description" => self.description = value.trim().to_string(),
            _ => debug!(key, "ignoring unknown setting"),
        }
    }

    pub fn primary_color(&self) -> &str {
        if self.primary_color.is_empty() {
            DEFAULT_PRIMARY_COLOR
        } else {
            &self.primary_color
        }
    }
}

/// Defaults, then the publisher's settings table, then the locally saved option.
pub fn load(conn: &Connection) -> Result<Settings> {
    let mut settings = Settings::default();

    if db::table_exists(conn, db::BIO_SETTINGS_TABLE)? {
        for (key, value) in db::fetch_publisher_settings(conn)? {
            settings.apply(&key, &value);
        }
    }

    for (key, value) in load_saved(conn)? {
        if let Value::String(s) = value {
            settings.apply(&key, &s);
        }
    }

    Ok(settings)
}

/// Validate and persist a single setting in the saved option, keeping the others.
pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
    if !SETTING_KEYS.contains(&key) {
        bail!(
            "Unknown setting '{}' (expected one of: {})",
            key,
            SETTING_KEYS.join(", ")
        );
    }
    let value = match key {
        "theme" => match Theme::parse(value) {
            Some(theme) => theme.as_str().to_string(),
            None => bail!("Invalid theme '{}' (expected auto, light or dark)", value),
        },
        "primary_color" if !is_hex_color(value) => {
            bail!("Invalid color '{}' (expected #rgb or #rrggbb)", value)
        }
        _ => value.trim().to_string(),
    };

    let mut saved = load_saved(conn)?;
    saved.insert(key.to_string(), Value::String(value));
    let json = serde_json::to_string(&saved)?;
    db::save_option(conn, OPTION_NAME, &json)
}

fn load_saved(conn: &Connection) -> Result<Map<String, Value>> {
    match db::load_option(conn, OPTION_NAME)? {
        Some(raw) => serde_json::from_str(&raw)
            .with_context(|| format!("Option '{}' is not a JSON object", OPTION_NAME)),
        None => Ok(Map::new()),
    }
}

pub(crate) fn is_hex_color(s: &str) -> bool {
    let s = s.trim();
    s.strip_prefix('#').is_some_and(|hex| {
        matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
    })
}
