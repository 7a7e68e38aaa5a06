//! Upsert resolution: update the translation for a locale if the group has
//! one, otherwise seed a new one from the canonical row.

use crate::accessor;
use crate::error::{SyncError, SyncResult};
use crate::group::{resolve_group, TranslationGroup};
use crate::locale::Locale;
use crate::model::{NewTranslation, RowId, TranslationPatch, TranslationRow, UpdateOutcome};
use crate::store::TranslationStore;
use crate::sync::{propagate_shared_fields, FanOutReport};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Upserted {
    pub row: TranslationRow,
    pub action: UpsertAction,
    /// Present when the write triggered a shared-field fan-out.
    pub fan_out: Option<FanOutReport>,
}

/// Write `patch` as the `locale` translation of the entry that row `id`
/// belongs to.
///
/// Errors: `Validation` (blank required field, missing labels for a new
/// translation), `NotFound` (unknown id, or no canonical row to seed from),
/// `PartialFailure` (canonical row saved, some siblings not synchronised).
pub async fn upsert_translation<S>(
    store: &S,
    id: RowId,
    locale: Locale,
    patch: TranslationPatch,
    fallback_enabled: bool,
) -> SyncResult<Upserted>
where
    S: TranslationStore + ?Sized,
{
    // Snapshot before any write: the fan-out depends on it.
    let group = resolve_group(store, id, fallback_enabled).await?;

    match group.find_locale(locale).cloned() {
        Some(existing) => update_existing(store, &group, existing, locale, patch).await,
        None => create_translation(store, &group, locale, patch).await,
    }
}

async fn update_existing<S>(
    store: &S,
    group: &TranslationGroup,
    existing: TranslationRow,
    locale: Locale,
    mut patch: TranslationPatch,
) -> SyncResult<Upserted>
where
    S: TranslationStore + ?Sized,
{
    let owns_shared = locale.is_canonical() && group.authoritative;
    if !owns_shared && patch.has_shared_fields() {
        debug!(
            id = existing.id,
            locale = %locale,
            "Ignoring shared fields on a non-canonical write"
        );
        patch = patch.without_shared();
    }

    if patch.is_empty() {
        return Ok(Upserted {
            row: existing,
            action: UpsertAction::Updated,
            fan_out: None,
        });
    }

    let requested = patch.shared_changes();
    let row = match accessor::apply_update(store, &existing, patch, None).await? {
        UpdateOutcome::Updated(row) => row,
        UpdateOutcome::NotFound | UpdateOutcome::Stale => {
            return Err(SyncError::NotFound(format!(
                "translation #{} was deleted during the update",
                existing.id
            )))
        }
    };
    info!(id = row.id, locale = %locale, "Updated translation");

    if !owns_shared || requested.is_empty() {
        return Ok(Upserted {
            row,
            action: UpsertAction::Updated,
            fan_out: None,
        });
    }

    let changes = requested.resolved_against(&row);
    let report = propagate_shared_fields(store, &group.fan_out_targets(), &changes).await;
    if !report.is_complete() {
        return Err(SyncError::PartialFailure {
            row: Box::new(row),
            failures: report.failed,
        });
    }

    Ok(Upserted {
        row,
        action: UpsertAction::Updated,
        fan_out: Some(report),
    })
}

async fn create_translation<S>(
    store: &S,
    group: &TranslationGroup,
    locale: Locale,
    patch: TranslationPatch,
) -> SyncResult<Upserted>
where
    S: TranslationStore + ?Sized,
{
    if !group.authoritative {
        return Err(SyncError::NotFound(format!(
            "entry '{}' has no '{}' translation; create the {} translation first",
            group.group_key(),
            Locale::CANONICAL,
            Locale::CANONICAL.config().name
        )));
    }
    if patch.has_shared_fields() {
        debug!(locale = %locale, "Shared fields on a new translation are taken from the canonical row");
    }

    // Shared fields come verbatim from the canonical row.
    let canonical = &group.canonical;
    let fields = NewTranslation {
        icon: Some(canonical.icon.clone()),
        image: Some(canonical.image.clone()),
        title: canonical.title.clone(),
        visible: Some(canonical.visible),
        primary_label: patch.primary_label,
        primary_features: patch.primary_features,
        secondary_label: patch.secondary_label,
        secondary_features: patch.secondary_features,
    };

    let row = accessor::create(store, locale, fields).await?;
    Ok(Upserted {
        row,
        action: UpsertAction::Created,
        fan_out: None,
    })
}
