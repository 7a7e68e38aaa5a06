//! Operator CLI for the catalog translation tables.
//!
//! Usage:
//!   catalog-sync init                         # create the table if missing
//!   catalog-sync list <locale> [--visible]    # rows stored for one locale
//!   catalog-sync group <id>                   # all locale rows of an entry
//!   catalog-sync create '<json>'              # new entry (English row)
//!   catalog-sync upsert <id> <locale> '<json>'
//!   catalog-sync delete <id>
//!   catalog-sync audit                        # report shared-field drift
//!   catalog-sync reconcile <id>               # re-apply canonical shared fields
//!
//! Required environment variables:
//! - DATABASE_URL
//!
//! Optional:
//! - CATALOG_TABLE (defaults to demo_items)
//! - DATABASE_MAX_CONNECTIONS (defaults to 5)
//! - CATALOG_RAW_FALLBACK (defaults to true)

use anyhow::{bail, Context, Result};
use catalog_sync::config::Config;
use catalog_sync::store::PgStore;
use catalog_sync::{Catalog, CatalogOptions, Locale, NewTranslation, RowId, TranslationPatch};
use serde::Serialize;
use tracing::{info, warn};

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn arg<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .with_context(|| format!("missing argument <{}>", name))
}

fn parse_id(raw: &str) -> Result<RowId> {
    raw.parse()
        .with_context(|| format!("invalid row id '{}'", raw))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("catalog_sync=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        bail!("usage: catalog-sync <init|list|group|create|upsert|delete|audit|reconcile> ...");
    };

    let config = Config::from_env()?;
    let store = PgStore::connect(&config).await?;

    if command == "init" {
        store.ensure_schema().await?;
        info!("Schema ready for table {}", config.table);
        return Ok(());
    }

    let catalog = Catalog::new(store, CatalogOptions::from(&config));

    match command {
        "list" => {
            let locale = Locale::from_code(arg(&args, 1, "locale")?)?;
            let listing = if args.iter().any(|a| a == "--visible") {
                catalog.list_visible(locale).await?
            } else {
                catalog.list_translations(locale).await?
            };
            if listing.used_fallback() {
                warn!("Listing served from the raw fallback path");
            }
            print_json(&listing)
        }
        "group" => {
            let id = parse_id(arg(&args, 1, "id")?)?;
            print_json(&catalog.get_group(id).await?)
        }
        "create" => {
            let fields: NewTranslation = serde_json::from_str(arg(&args, 1, "json")?)
                .context("create payload is not valid JSON")?;
            print_json(&catalog.create_canonical(fields).await?)
        }
        "upsert" => {
            let id = parse_id(arg(&args, 1, "id")?)?;
            let locale = Locale::from_code(arg(&args, 2, "locale")?)?;
            let patch: TranslationPatch = serde_json::from_str(arg(&args, 3, "json")?)
                .context("upsert payload is not valid JSON")?;
            print_json(&catalog.upsert(id, locale, patch).await?)
        }
        "delete" => {
            let id = parse_id(arg(&args, 1, "id")?)?;
            catalog.delete(id).await?;
            info!("Deleted translation #{}", id);
            Ok(())
        }
        "audit" => {
            let report = catalog.audit().await?;
            print_json(&report)?;
            if !report.is_clean() {
                bail!("audit found {} issue(s)", report.findings.len());
            }
            Ok(())
        }
        "reconcile" => {
            let id = parse_id(arg(&args, 1, "id")?)?;
            let report = catalog.reconcile(id).await?;
            print_json(&report)?;
            if !report.is_complete() {
                bail!("{} sibling(s) could not be reconciled", report.failed.len());
            }
            Ok(())
        }
        other => bail!("unknown command '{}'", other),
    }
}
