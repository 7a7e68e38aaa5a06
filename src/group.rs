//! Translation group resolution.
//!
//! Rows of one logical entry are tied together by their shared `icon` value;
//! there is no group table. A blank icon cannot group anything, so such a row
//! forms a group on its own.

use crate::accessor;
use crate::error::SyncResult;
use crate::fallback::{self, ReadPath};
use crate::locale::Locale;
use crate::model::{RowId, SharedFields, TranslationRow};
use crate::store::TranslationStore;
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

/// All locale rows of one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationGroup {
    pub canonical: TranslationRow,
    /// Every other row of the group, ordered by id.
    pub siblings: Vec<TranslationRow>,
    /// `false` when no canonical-locale row exists and `canonical` is only the
    /// lowest-id row standing in for display. Such a row is never used as the
    /// seed for new translations.
    pub authoritative: bool,
    pub source: ReadPath,
}

impl TranslationGroup {
    /// Build a group from its rows (any order, at least one row).
    pub fn from_rows(mut rows: Vec<TranslationRow>, source: ReadPath) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }
        rows.sort_by_key(|row| row.id);
        rows.dedup_by_key(|row| row.id);

        let canonical_pos = rows
            .iter()
            .position(|row| Locale::CANONICAL.matches(&row.locale));
        let authoritative = canonical_pos.is_some();
        let canonical = rows.remove(canonical_pos.unwrap_or(0));

        Some(Self {
            canonical,
            siblings: rows,
            authoritative,
            source,
        })
    }

    pub fn group_key(&self) -> &str {
        &self.canonical.icon
    }

    pub fn shared(&self) -> SharedFields {
        self.canonical.shared()
    }

    /// Canonical row first, then siblings.
    pub fn rows(&self) -> impl Iterator<Item = &TranslationRow> {
        std::iter::once(&self.canonical).chain(self.siblings.iter())
    }

    pub fn row_count(&self) -> usize {
        1 + self.siblings.len()
    }

    /// The row stored for `locale`, lowest id first if the locale is
    /// duplicated.
    pub fn find_locale(&self, locale: Locale) -> Option<&TranslationRow> {
        if self.authoritative && locale.is_canonical() {
            return Some(&self.canonical);
        }
        self.rows()
            .filter(|row| locale.matches(&row.locale))
            .min_by_key(|row| row.id)
    }

    pub fn contains(&self, id: RowId) -> bool {
        self.rows().any(|row| row.id == id)
    }

    /// Siblings that receive shared-field fan-out: every non-canonical-locale
    /// row.
    pub fn fan_out_targets(&self) -> Vec<TranslationRow> {
        self.siblings
            .iter()
            .filter(|row| !Locale::CANONICAL.matches(&row.locale))
            .cloned()
            .collect()
    }

    /// Locales stored more than once, with the ids involved.
    pub fn duplicate_locales(&self) -> Vec<(String, Vec<RowId>)> {
        let mut by_locale: HashMap<String, Vec<RowId>> = HashMap::new();
        for row in self.rows() {
            by_locale
                .entry(row.locale.to_ascii_lowercase())
                .or_default()
                .push(row.id);
        }
        let mut duplicates: Vec<_> = by_locale
            .into_iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(locale, mut ids)| {
                ids.sort_unstable();
                (locale, ids)
            })
            .collect();
        duplicates.sort();
        duplicates
    }

    /// The group as it should be displayed: every sibling carries the
    /// canonical row's shared fields, whatever is stored on the sibling.
    pub fn normalized(mut self) -> Self {
        let shared = self.canonical.shared();
        self.siblings = self
            .siblings
            .into_iter()
            .map(|row| row.with_shared(&shared))
            .collect();
        self
    }
}

/// Resolve the group of the row `id`. The result is a snapshot; callers that
/// go on to mutate must take it before their first write.
pub async fn resolve_group<S>(store: &S, id: RowId, fallback_enabled: bool) -> SyncResult<TranslationGroup>
where
    S: TranslationStore + ?Sized,
{
    let row = accessor::get_by_id(store, id, fallback_enabled).await?;

    if row.icon.trim().is_empty() {
        warn!(id, "Row has a blank icon; treating it as a group of one");
        return Ok(single(row));
    }

    let icon = row.icon.clone();
    let primary = store.fetch_by_icon(&icon).await;
    let listing = fallback::read_with_fallback(
        &format!("group({})", icon),
        primary,
        fallback_enabled,
        || fallback::group_raw(store, &icon),
    )
    .await?;

    let mut rows = listing.rows;
    if !rows.iter().any(|r| r.id == row.id) {
        rows.push(row.clone());
    }

    let group = match TranslationGroup::from_rows(rows, listing.source) {
        Some(group) => group,
        None => single(row),
    };

    if !group.authoritative {
        warn!(
            icon = %group.group_key(),
            stand_in = group.canonical.id,
            "Group has no canonical-locale row; lowest id used for display only"
        );
    }
    for (locale, ids) in group.duplicate_locales() {
        warn!(icon = %group.group_key(), %locale, ?ids, "Group holds duplicate locale rows");
    }

    Ok(group)
}

fn single(row: TranslationRow) -> TranslationGroup {
    let authoritative = Locale::CANONICAL.matches(&row.locale);
    TranslationGroup {
        canonical: row,
        siblings: Vec::new(),
        authoritative,
        source: ReadPath::Primary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::model::fixtures::row;
    use crate::store::MemoryStore;

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.put_row(row(1, "fr", "rocket"));
        store.put_row(row(2, "en", "rocket"));
        store.put_row(row(3, "de", "rocket"));
        store.put_row(row(4, "en", "star"));
        store
    }

    #[tokio::test]
    async fn test_resolve_from_any_member() {
        let store = seeded();

        for id in [1, 2, 3] {
            let group = resolve_group(&store, id, true).await.unwrap();
            assert_eq!(group.canonical.id, 2);
            assert!(group.authoritative);
            assert_eq!(group.siblings.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 3]);
            assert_eq!(group.source, ReadPath::Primary);
        }
    }

    #[tokio::test]
    async fn test_resolve_missing_row() {
        let store = seeded();
        assert!(matches!(
            resolve_group(&store, 42, true).await,
            Err(SyncError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_blank_icon_is_group_of_one() {
        let store = seeded();
        store.put_row(row(5, "en", "  "));
        store.put_row(row(6, "fr", "  "));

        let group = resolve_group(&store, 6, true).await.unwrap();
        assert_eq!(group.row_count(), 1);
        assert_eq!(group.canonical.id, 6);
        assert!(!group.authoritative);
    }

    #[tokio::test]
    async fn test_missing_canonical_picks_lowest_id() {
        let store = MemoryStore::new();
        store.put_row(row(9, "de", "moon"));
        store.put_row(row(7, "fr", "moon"));

        let group = resolve_group(&store, 9, true).await.unwrap();
        assert!(!group.authoritative);
        assert_eq!(group.canonical.id, 7);
        assert_eq!(group.find_locale(Locale::CANONICAL), None);
    }

    #[tokio::test]
    async fn test_resolve_uses_fallback_under_drift() {
        let store = seeded();
        store.set_schema_drift(true);

        let group = resolve_group(&store, 3, true).await.unwrap();
        assert_eq!(group.source, ReadPath::Fallback);
        assert_eq!(group.canonical.id, 2);
        assert_eq!(group.row_count(), 3);
    }

    #[tokio::test]
    async fn test_resolve_uses_fallback_during_primary_outage() {
        let store = seeded();
        store.set_primary_outage(true);

        let group = resolve_group(&store, 1, true).await.unwrap();
        assert_eq!(group.source, ReadPath::Fallback);
        assert_eq!(group.canonical, row(2, "en", "rocket"));
        assert_eq!(group.siblings, vec![row(1, "fr", "rocket"), row(3, "de", "rocket")]);
    }

    #[tokio::test]
    async fn test_resolve_with_both_paths_down() {
        let store = seeded();
        store.set_primary_outage(true);
        store.set_raw_outage(true);

        assert!(matches!(
            resolve_group(&store, 1, true).await,
            Err(SyncError::StoreUnavailable { .. })
        ));
    }

    #[test]
    fn test_normalized_copies_canonical_shared_fields() {
        let mut drifted = row(3, "de", "rocket");
        drifted.image = "old.png".to_string();
        drifted.visible = true;
        let group =
            TranslationGroup::from_rows(vec![row(2, "en", "rocket"), drifted], ReadPath::Primary)
                .unwrap();

        let normalized = group.normalized();
        assert_eq!(normalized.siblings[0].image, "img.png");
        assert!(!normalized.siblings[0].visible);
        assert_eq!(normalized.siblings[0].primary_label, "Primary de");
    }

    #[test]
    fn test_find_locale_and_duplicates() {
        let group = TranslationGroup::from_rows(
            vec![
                row(4, "fr", "rocket"),
                row(2, "en", "rocket"),
                row(3, "fr", "rocket"),
            ],
            ReadPath::Primary,
        )
        .unwrap();

        let french = Locale::from_code("fr").unwrap();
        assert_eq!(group.find_locale(french).unwrap().id, 3);
        assert_eq!(group.duplicate_locales(), vec![("fr".to_string(), vec![3, 4])]);
        assert!(group.contains(4));
        assert!(!group.contains(5));
    }

    #[test]
    fn test_fan_out_targets_skip_duplicate_canonical_rows() {
        let group = TranslationGroup::from_rows(
            vec![row(1, "en", "rocket"), row(2, "en", "rocket"), row(3, "es", "rocket")],
            ReadPath::Primary,
        )
        .unwrap();

        assert_eq!(group.canonical.id, 1);
        let targets: Vec<_> = group.fan_out_targets().iter().map(|r| r.id).collect();
        assert_eq!(targets, vec![3]);
    }

    #[test]
    fn test_from_rows_empty() {
        assert!(TranslationGroup::from_rows(vec![], ReadPath::Primary).is_none());
    }
}
