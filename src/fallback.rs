//! Raw fallback reader.
//!
//! When the typed read path reports no rows, the rows may still be there
//! under differently-cased column names. This reader asks the store for raw
//! records and rebuilds `TranslationRow`s field by field, accepting both the
//! exact column name (`primaryLabel`) and its lower-cased form
//! (`primarylabel`). The exact name wins when both are present.
//!
//! It is never consulted when the typed path already returned rows.

use crate::error::{StoreError, SyncError, SyncResult};
use crate::model::{RowId, TranslationRow};
use crate::store::{RawRecord, TranslationStore};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use tracing::{debug, warn};

/// Which read path produced a result. Diagnostic only: the rows are complete
/// and correct either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadPath {
    Primary,
    Fallback,
}

/// Rows plus the path that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub rows: Vec<TranslationRow>,
    pub source: ReadPath,
}

impl Listing {
    pub fn primary(rows: Vec<TranslationRow>) -> Self {
        Self {
            rows,
            source: ReadPath::Primary,
        }
    }

    pub fn used_fallback(&self) -> bool {
        self.source == ReadPath::Fallback
    }
}

/// Raw records for one locale, rebuilt into rows.
pub async fn list_raw<S>(store: &S, locale: &str) -> Result<Vec<TranslationRow>, StoreError>
where
    S: TranslationStore + ?Sized,
{
    let records = store.raw_by_locale(locale).await?;
    Ok(rebuild_rows(&records)
        .into_iter()
        .filter(|row| row.locale.eq_ignore_ascii_case(locale))
        .collect())
}

/// Raw records sharing a grouping key, rebuilt into rows.
pub async fn group_raw<S>(store: &S, group_key: &str) -> Result<Vec<TranslationRow>, StoreError>
where
    S: TranslationStore + ?Sized,
{
    let records = store.raw_by_icon(group_key).await?;
    Ok(rebuild_rows(&records)
        .into_iter()
        .filter(|row| row.icon == group_key)
        .collect())
}

/// The raw record with this id, rebuilt into a row.
pub async fn row_raw<S>(store: &S, id: RowId) -> Result<Vec<TranslationRow>, StoreError>
where
    S: TranslationStore + ?Sized,
{
    let records = store.raw_by_id(id).await?;
    Ok(rebuild_rows(&records)
        .into_iter()
        .filter(|row| row.id == id)
        .collect())
}

/// Run the typed read, and only if it came back empty (or failed) try the raw
/// path.
///
/// - typed rows present: returned as-is, raw path untouched
/// - typed empty, raw rows present: raw rows, marked `Fallback`
/// - typed empty, raw empty or failed: empty `Primary` listing
/// - typed failed, raw ok: raw rows (possibly empty), marked `Fallback`
/// - typed failed, raw failed or disabled: `StoreUnavailable`
pub async fn read_with_fallback<F, Fut>(
    what: &str,
    primary: Result<Vec<TranslationRow>, StoreError>,
    fallback_enabled: bool,
    fallback: F,
) -> SyncResult<Listing>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<TranslationRow>, StoreError>>,
{
    let primary_err = match primary {
        Ok(rows) if !rows.is_empty() => return Ok(Listing::primary(rows)),
        Ok(_) => None,
        Err(e) => {
            warn!("{}: primary read failed: {}", what, e);
            Some(e)
        }
    };

    if !fallback_enabled {
        return match primary_err {
            Some(primary) => Err(SyncError::StoreUnavailable {
                primary,
                fallback: "raw fallback disabled".to_string(),
            }),
            None => Ok(Listing::primary(Vec::new())),
        };
    }

    match (fallback().await, primary_err) {
        (Ok(rows), primary_err) => {
            if !rows.is_empty() || primary_err.is_some() {
                warn!(
                    rows = rows.len(),
                    "{}: served from raw fallback path; check column naming against the schema",
                    what
                );
                Ok(Listing {
                    rows,
                    source: ReadPath::Fallback,
                })
            } else {
                debug!("{}: no rows on either read path", what);
                Ok(Listing::primary(rows))
            }
        }
        (Err(fallback_err), None) => {
            warn!("{}: raw fallback read failed: {}", what, fallback_err);
            Ok(Listing::primary(Vec::new()))
        }
        (Err(fallback_err), Some(primary)) => Err(SyncError::StoreUnavailable {
            primary,
            fallback: fallback_err.to_string(),
        }),
    }
}

/// Rebuild rows from raw records, skipping records that cannot form a valid
/// row. Duplicate ids keep the first record; output is ordered by id.
pub fn rebuild_rows(records: &[RawRecord]) -> Vec<TranslationRow> {
    let mut rows = BTreeMap::new();
    for record in records {
        match reconstruct(record) {
            Ok(row) => {
                rows.entry(row.id).or_insert(row);
            }
            Err(reason) => warn!("Skipping raw record: {}", reason),
        }
    }
    rows.into_values().collect()
}

/// Look up a column by its exact name, then by its lower-cased name.
fn column<'a>(record: &'a RawRecord, name: &str) -> Option<&'a Value> {
    record
        .get(name)
        .filter(|v| !v.is_null())
        .or_else(|| record.get(&name.to_lowercase()).filter(|v| !v.is_null()))
}

fn text(record: &RawRecord, name: &str) -> Option<String> {
    match column(record, name)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn required_text(record: &RawRecord, name: &str) -> Result<String, String> {
    text(record, name)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| format!("missing column {}", name))
}

fn list(record: &RawRecord, name: &str) -> Option<Vec<String>> {
    match column(record, name)? {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
        ),
        _ => None,
    }
}

fn flag(record: &RawRecord, name: &str) -> bool {
    match column(record, name) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().map(|v| v != 0).unwrap_or(false),
        Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "t" | "1"),
        _ => false,
    }
}

/// Parse a timestamp as rendered by the database's JSON encoder. Values
/// without an offset are taken as UTC.
fn timestamp(record: &RawRecord, name: &str) -> Option<DateTime<Utc>> {
    let raw = text(record, name)?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f%#z"]
        .iter()
        .find_map(|fmt| {
            DateTime::parse_from_str(&raw, fmt)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(&raw, fmt)
                        .ok()
                        .map(|dt| Utc.from_utc_datetime(&dt))
                })
        })
}

/// Rebuild one row from a raw record.
pub fn reconstruct(record: &RawRecord) -> Result<TranslationRow, String> {
    let id = match column(record, "id") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| "missing or non-numeric id".to_string())?;

    let locale = required_text(record, "locale")
        .map_err(|e| format!("row {}: {}", id, e))?
        .trim()
        .to_ascii_lowercase();
    let primary_label =
        required_text(record, "primaryLabel").map_err(|e| format!("row {}: {}", id, e))?;
    let secondary_label =
        required_text(record, "secondaryLabel").map_err(|e| format!("row {}: {}", id, e))?;

    // Present but possibly empty: a blank icon is a valid group of one.
    let icon = text(record, "icon").ok_or_else(|| format!("row {}: missing column icon", id))?;
    let image = text(record, "image").ok_or_else(|| format!("row {}: missing column image", id))?;

    let created_at = timestamp(record, "createdAt");
    let updated_at = timestamp(record, "updatedAt").or(created_at);
    let (created_at, updated_at) = match (created_at, updated_at) {
        (Some(c), Some(u)) => (c, u),
        _ => return Err(format!("row {}: missing timestamps", id)),
    };

    Ok(TranslationRow {
        id,
        locale,
        icon,
        image,
        title: text(record, "title"),
        visible: flag(record, "visible"),
        primary_label,
        primary_features: list(record, "primaryFeatures"),
        secondary_label,
        secondary_features: list(record, "secondaryFeatures"),
        created_at,
        updated_at,
    })
}
