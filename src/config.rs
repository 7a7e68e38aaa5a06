use anyhow::{bail, Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,
    pub max_connections: u32,

    /// Table holding one row per (entry, locale)
    pub table: String,

    /// Consult the raw, case-tolerant read path when the typed path finds nothing
    pub raw_fallback: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let table = std::env::var("CATALOG_TABLE").unwrap_or_else(|_| "demo_items".to_string());
        if !is_valid_identifier(&table) {
            bail!(
                "CATALOG_TABLE must be a plain SQL identifier (letters, digits, underscores), got '{}'",
                table
            );
        }

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL not set")?,
            max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            table,
            raw_fallback: std::env::var("CATALOG_RAW_FALLBACK")
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(true),
        })
    }
}

/// The table name is interpolated into SQL, so only plain identifiers pass.
fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
