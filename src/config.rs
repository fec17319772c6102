use crate::db::DEFAULT_DB_PATH;

/// Environment override for the database location.
pub const DB_PATH_ENV: &str = "BIO_DB_PATH";

/// `--db` flag, then `BIO_DB_PATH`, then the built-in default.
pub fn db_path(flag: Option<String>) -> String {
    let non_blank = |p: &String| !p.trim().is_empty();
    flag.filter(non_blank)
        .or_else(|| std::env::var(DB_PATH_ENV).ok().filter(non_blank))
        .unwrap_or_else(|| DEFAULT_DB_PATH.to_string())
}
