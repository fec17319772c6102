mod bio;
mod config;
mod db;
mod fetch;
mod parser;
mod render;
mod settings;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(name = "bio_page", about = "Standalone \"link in bio\" page renderer")]
struct Cli {
    /// SQLite database (default: $BIO_DB_PATH or data/bio.sqlite)
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the host tables (and optionally the publisher tables)
    Init {
        /// Also create the companion publisher's link/settings tables
        #[arg(long)]
        publisher: bool,
    },
    /// Set a site metadata field (name, description, home_url, logo_url, locale)
    Site { key: String, value: String },
    /// Store a local HTML file as a page's content
    Page {
        /// HTML file to import
        file: PathBuf,
        #[arg(short, long, default_value = bio::BIO_SLUG)]
        slug: String,
    },
    /// Download a URL and store the HTML as a page's content
    Fetch {
        url: String,
        #[arg(short, long, default_value = bio::BIO_SLUG)]
        slug: String,
    },
    /// Run both extractors on an HTML file and print the result as JSON
    Extract { file: PathBuf },
    /// Add a link to the publisher's table
    AddLink {
        title: String,
        url: String,
        #[arg(short, long)]
        icon: Option<String>,
        #[arg(long, default_value = "0")]
        sort: i64,
        /// UTC expiry, "YYYY-MM-DD HH:MM:SS"
        #[arg(long)]
        expires: Option<String>,
        /// Remote site URL to scope the link to
        #[arg(long)]
        site: Option<String>,
    },
    /// List the links the page would show
    Links {
        #[arg(long)]
        json: bool,
    },
    /// Show the resolved profile
    Profile {
        #[arg(long)]
        json: bool,
    },
    /// Render the bio page HTML
    Render {
        /// Output file (default: stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Record a click on a stored link and print its destination
    Click { id: i64 },
    /// Show settings, or set one (primary_color, theme, logo_url, description)
    Settings { key: Option<String>, value: Option<String> },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let conn = db::connect(&config::db_path(cli.db))?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Init { publisher } => {
            if publisher {
                db::init_publisher_schema(&conn)?;
            }
            println!(
                "Schema ready{}.",
                if publisher { " (with publisher tables)" } else { "" }
            );
        }
        Commands::Site { key, value } => {
            db::set_site_meta(&conn, &key, &value)?;
            println!("site.{} = {}", key, value);
        }
        Commands::Page { file, slug } => {
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            db::upsert_page(&conn, &slug, None, &html)?;
            println!("Stored {} bytes as page '{}'", html.len(), slug);
        }
        Commands::Fetch { url, slug } => {
            let html = fetch::fetch_page(&url).await?;
            db::upsert_page(&conn, &slug, None, &html)?;
            println!("Stored {} bytes from {} as page '{}'", html.len(), url, slug);
        }
        Commands::Extract { file } => {
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let page = parser::extract_page(&html);
            let out = serde_json::json!({ "profile": page.profile, "links": page.links });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Commands::AddLink { title, url, icon, sort, expires, site } => {
            db::init_publisher_schema(&conn)?;
            let remote_site_id = match site {
                Some(site_url) => Some(
                    match db::find_remote_site_id(&conn, &site_url)? {
                        Some(id) => id,
                        None => db::insert_remote_site(&conn, &site_url)?,
                    },
                ),
                None => None,
            };
            let id = db::insert_bio_link(
                &conn,
                &db::BioLinkRow {
                    remote_site_id,
                    title,
                    url,
                    icon,
                    sort_order: sort,
                    is_active: true,
                    expires_at: expires,
                },
            )?;
            println!("Added link #{}", id);
        }
        Commands::Links { json } => {
            let page = bio::build(&conn, chrono::Utc::now())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&page.links)?);
            } else if page.links.is_empty() {
                println!("No links available.");
            } else {
                for (i, link) in page.links.iter().enumerate() {
                    println!(
                        "{:>3} | {} {:<32} | {}",
                        i + 1,
                        link.icon,
                        truncate(&link.title, 32),
                        bio::link_href(link, &page.site)
                    );
                }
            }
        }
        Commands::Profile { json } => {
            let page = bio::build(&conn, chrono::Utc::now())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&page.profile)?);
            } else {
                println!("Name:        {}", page.profile.name);
                println!("Description: {}", page.profile.description);
                println!("Logo:        {}", page.profile.logo_url);
                println!("Theme:       {}", page.settings.theme.as_str());
                println!("Color:       {}", page.settings.primary_color());
            }
        }
        Commands::Render { out } => {
            let page = bio::build(&conn, chrono::Utc::now())?;
            let html = render::render_page(&page)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, &html)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Rendered {} links to {}", page.links.len(), path.display());
                }
                None => print!("{}", html),
            }
        }
        Commands::Click { id } => match db::track_click(&conn, id)? {
            Some(url) => {
                let clicks = db::fetch_click_count(&conn, id)?.unwrap_or_default();
                info!("Link #{} now has {} clicks", id, clicks);
                println!("{}", url);
            }
            None => anyhow::bail!("No stored link with id {}", id),
        },
        Commands::Settings { key, value } => match (key, value) {
            (Some(key), Some(value)) => {
                settings::set(&conn, &key, &value)?;
                println!("{} = {}", key, value.trim());
            }
            (Some(key), None) => anyhow::bail!("Missing value for setting '{}'", key),
            _ => {
                let s = settings::load(&conn)?;
                println!("{}", serde_json::to_string_pretty(&s)?);
            }
        },
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("Done in {:.1}s", elapsed.as_secs_f64());
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}
