//! Row accessor: validated single-row reads and writes.
//!
//! Every write is stamped here (`createdAt`/`updatedAt`), required labels are
//! enforced here, and a blank title is always replaced by the primary label
//! so that no stored row carries an empty title.

use crate::error::{SyncError, SyncResult};
use crate::fallback::{self, Listing};
use crate::locale::Locale;
use crate::model::{
    NewTranslation, RowDraft, RowId, RowUpdate, TranslationPatch, TranslationRow, UpdateOutcome,
};
use crate::store::TranslationStore;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn require(value: Option<String>, field: &str) -> SyncResult<String> {
    non_blank(value).ok_or_else(|| SyncError::Validation(format!("{} is required", field)))
}

/// Fetch one row. A typed read that fails or finds nothing is retried on the
/// raw path, as for listings.
pub async fn get_by_id<S>(store: &S, id: RowId, fallback_enabled: bool) -> SyncResult<TranslationRow>
where
    S: TranslationStore + ?Sized,
{
    let primary = store
        .fetch(id)
        .await
        .map(|row| row.into_iter().collect::<Vec<_>>());
    let listing = fallback::read_with_fallback(
        &format!("get(#{})", id),
        primary,
        fallback_enabled,
        || fallback::row_raw(store, id),
    )
    .await?;

    listing
        .rows
        .into_iter()
        .next()
        .ok_or_else(|| SyncError::NotFound(format!("translation #{} does not exist", id)))
}

/// Fetch a row and check that it belongs to `locale`.
pub async fn get<S>(
    store: &S,
    id: RowId,
    locale: Locale,
    fallback_enabled: bool,
) -> SyncResult<TranslationRow>
where
    S: TranslationStore + ?Sized,
{
    let row = get_by_id(store, id, fallback_enabled).await?;
    if !locale.matches(&row.locale) {
        return Err(SyncError::NotFound(format!(
            "translation #{} is not a '{}' row",
            id, locale
        )));
    }
    Ok(row)
}

/// Rows stored under `locale`. Rows of other locales in the same group are
/// not included.
pub async fn list<S>(store: &S, locale: Locale, fallback_enabled: bool) -> SyncResult<Listing>
where
    S: TranslationStore + ?Sized,
{
    let primary = store.fetch_by_locale(locale.code()).await;
    fallback::read_with_fallback(
        &format!("list({})", locale),
        primary,
        fallback_enabled,
        || fallback::list_raw(store, locale.code()),
    )
    .await
}

/// Validate and insert a new row for `locale`.
pub async fn create<S>(store: &S, locale: Locale, fields: NewTranslation) -> SyncResult<TranslationRow>
where
    S: TranslationStore + ?Sized,
{
    let icon = require(fields.icon, "icon")?;
    let image = require(fields.image, "image")?;
    let primary_label = require(fields.primary_label, "primaryLabel")?;
    let secondary_label = require(fields.secondary_label, "secondaryLabel")?;
    let title = non_blank(fields.title).unwrap_or_else(|| primary_label.clone());

    let now = Utc::now();
    let row = store
        .insert(RowDraft {
            locale: locale.code().to_string(),
            icon,
            image,
            title: Some(title),
            visible: fields.visible.unwrap_or(false),
            primary_label,
            primary_features: fields.primary_features,
            secondary_label,
            secondary_features: fields.secondary_features,
            created_at: now,
            updated_at: now,
        })
        .await?;

    info!(id = row.id, locale = %row.locale, icon = %row.icon, "Created translation");
    Ok(row)
}

/// Reject blank values for columns that must never be empty, and turn a blank
/// title into the row's existing primary label.
pub fn normalize_patch(current: &TranslationRow, mut patch: TranslationPatch) -> SyncResult<TranslationPatch> {
    for (field, value) in [
        ("icon", &patch.icon),
        ("image", &patch.image),
        ("primaryLabel", &patch.primary_label),
        ("secondaryLabel", &patch.secondary_label),
    ] {
        if matches!(value, Some(v) if v.trim().is_empty()) {
            return Err(SyncError::Validation(format!("{} cannot be blank", field)));
        }
    }

    if matches!(&patch.title, Some(t) if t.trim().is_empty()) {
        debug!(id = current.id, "Blank title replaced by primary label");
        patch.title = Some(current.primary_label.clone());
    }

    Ok(patch)
}

/// Apply `patch` to `current`. With `expected_updated_at` set, the write only
/// happens if the stored row has not changed since `current` was read.
pub async fn apply_update<S>(
    store: &S,
    current: &TranslationRow,
    patch: TranslationPatch,
    expected_updated_at: Option<DateTime<Utc>>,
) -> SyncResult<UpdateOutcome>
where
    S: TranslationStore + ?Sized,
{
    let patch = normalize_patch(current, patch)?;
    let outcome = store
        .update(
            current.id,
            RowUpdate {
                patch,
                updated_at: Utc::now(),
                expected_updated_at,
            },
        )
        .await?;
    Ok(outcome)
}

/// Partial update of one row; unmentioned fields keep their stored values.
pub async fn update<S>(
    store: &S,
    id: RowId,
    patch: TranslationPatch,
    fallback_enabled: bool,
) -> SyncResult<TranslationRow>
where
    S: TranslationStore + ?Sized,
{
    let current = get_by_id(store, id, fallback_enabled).await?;
    match apply_update(store, &current, patch, None).await? {
        UpdateOutcome::Updated(row) => Ok(row),
        UpdateOutcome::NotFound | UpdateOutcome::Stale => Err(SyncError::NotFound(format!(
            "translation #{} does not exist",
            id
        ))),
    }
}

/// Delete one row. Siblings in other locales are not touched.
pub async fn delete<S>(store: &S, id: RowId) -> SyncResult<()>
where
    S: TranslationStore + ?Sized,
{
    if store.delete(id).await? {
        info!(id, "Deleted translation");
        Ok(())
    } else {
        Err(SyncError::NotFound(format!("translation #{} does not exist", id)))
    }
}
