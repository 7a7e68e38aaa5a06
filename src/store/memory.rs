//! In-process store backed by a mutex-guarded map.
//!
//! Besides plain storage it can simulate the failure modes the engine has to
//! survive: a typed path that silently returns nothing (schema drift), outages
//! of either read path, and per-row write failures.

use super::{RawRecord, TranslationStore};
use crate::error::StoreError;
use crate::model::{RowDraft, RowId, RowUpdate, TranslationRow, UpdateOutcome};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    rows: BTreeMap<RowId, TranslationRow>,
    last_id: RowId,
    failing_updates: HashSet<RowId>,
    schema_drift: bool,
    primary_outage: bool,
    raw_outage: bool,
    raw_reads: usize,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryState) -> T) -> T {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    /// Store a row exactly as given, bypassing validation. Used to stage
    /// legacy or inconsistent data.
    pub fn put_row(&self, row: TranslationRow) {
        self.with_state(|state| {
            state.last_id = state.last_id.max(row.id);
            state.rows.insert(row.id, row);
        });
    }

    /// All rows, ordered by id.
    pub fn rows(&self) -> Vec<TranslationRow> {
        self.with_state(|state| state.rows.values().cloned().collect())
    }

    /// Make every update of `id` fail with a store error.
    pub fn fail_updates_for(&self, id: RowId) {
        self.with_state(|state| {
            state.failing_updates.insert(id);
        });
    }

    /// Undo every `fail_updates_for`.
    pub fn clear_failures(&self) {
        self.with_state(|state| state.failing_updates.clear());
    }

    /// While enabled, typed list reads return no rows, typed single-row reads
    /// fail on the missing columns, and raw records carry lower-cased column
    /// names, as after a case-folding migration.
    pub fn set_schema_drift(&self, enabled: bool) {
        self.with_state(|state| state.schema_drift = enabled);
    }

    /// While enabled, every typed read fails.
    pub fn set_primary_outage(&self, enabled: bool) {
        self.with_state(|state| state.primary_outage = enabled);
    }

    /// While enabled, raw reads fail.
    pub fn set_raw_outage(&self, enabled: bool) {
        self.with_state(|state| state.raw_outage = enabled);
    }

    /// Number of raw-path reads served so far.
    pub fn raw_reads(&self) -> usize {
        self.with_state(|state| state.raw_reads)
    }
}

impl MemoryState {
    fn typed_read(
        &self,
        filter: impl Fn(&TranslationRow) -> bool,
    ) -> Result<Vec<TranslationRow>, StoreError> {
        if self.primary_outage {
            return Err(StoreError::Unavailable("primary read path is down".to_string()));
        }
        if self.schema_drift {
            return Ok(Vec::new());
        }
        Ok(self.rows.values().filter(|r| filter(r)).cloned().collect())
    }

    fn typed_fetch(&self, id: RowId) -> Result<Option<TranslationRow>, StoreError> {
        if self.primary_outage {
            return Err(StoreError::Unavailable("primary read path is down".to_string()));
        }
        if self.schema_drift {
            return Err(StoreError::Decode(
                "column \"primaryLabel\" does not exist".to_string(),
            ));
        }
        Ok(self.rows.get(&id).cloned())
    }

    fn raw_read(
        &mut self,
        filter: impl Fn(&TranslationRow) -> bool,
    ) -> Result<Vec<RawRecord>, StoreError> {
        if self.raw_outage {
            return Err(StoreError::Unavailable("raw read path is down".to_string()));
        }
        self.raw_reads += 1;
        let lowercase = self.schema_drift;
        self.rows
            .values()
            .filter(|r| filter(r))
            .map(|row| to_record(row, lowercase))
            .collect()
    }
}

fn to_record(row: &TranslationRow, lowercase_keys: bool) -> Result<RawRecord, StoreError> {
    match serde_json::to_value(row).map_err(|e| StoreError::Decode(e.to_string()))? {
        serde_json::Value::Object(map) if lowercase_keys => Ok(map
            .into_iter()
            .map(|(key, value)| (key.to_lowercase(), value))
            .collect()),
        serde_json::Value::Object(map) => Ok(map),
        other => Err(StoreError::Decode(format!("expected object, got {}", other))),
    }
}

#[async_trait]
impl TranslationStore for MemoryStore {
    async fn fetch(&self, id: RowId) -> Result<Option<TranslationRow>, StoreError> {
        self.state()?.typed_fetch(id)
    }

    async fn fetch_by_locale(&self, locale: &str) -> Result<Vec<TranslationRow>, StoreError> {
        self.state()?.typed_read(|row| row.locale == locale)
    }

    async fn fetch_by_icon(&self, icon: &str) -> Result<Vec<TranslationRow>, StoreError> {
        self.state()?.typed_read(|row| row.icon == icon)
    }

    async fn insert(&self, draft: RowDraft) -> Result<TranslationRow, StoreError> {
        let mut state = self.state()?;
        state.last_id += 1;
        let row = TranslationRow {
            id: state.last_id,
            locale: draft.locale,
            icon: draft.icon,
            image: draft.image,
            title: draft.title,
            visible: draft.visible,
            primary_label: draft.primary_label,
            primary_features: draft.primary_features,
            secondary_label: draft.secondary_label,
            secondary_features: draft.secondary_features,
            created_at: draft.created_at,
            updated_at: draft.updated_at,
        };
        state.rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update(&self, id: RowId, update: RowUpdate) -> Result<UpdateOutcome, StoreError> {
        let mut state = self.state()?;
        if state.failing_updates.contains(&id) {
            return Err(StoreError::Unavailable(format!("write to row {} rejected", id)));
        }
        let Some(current) = state.rows.get(&id) else {
            return Ok(UpdateOutcome::NotFound);
        };
        if let Some(expected) = update.expected_updated_at {
            if current.updated_at != expected {
                return Ok(UpdateOutcome::Stale);
            }
        }

        let mut next = update.patch.apply_to(current);
        next.updated_at = update.updated_at;
        state.rows.insert(id, next.clone());
        Ok(UpdateOutcome::Updated(next))
    }

    async fn delete(&self, id: RowId) -> Result<bool, StoreError> {
        Ok(self.state()?.rows.remove(&id).is_some())
    }

    async fn raw_by_id(&self, id: RowId) -> Result<Vec<RawRecord>, StoreError> {
        self.state()?.raw_read(|row| row.id == id)
    }

    async fn raw_by_locale(&self, locale: &str) -> Result<Vec<RawRecord>, StoreError> {
        self.state()?
            .raw_read(|row| row.locale.eq_ignore_ascii_case(locale))
    }

    async fn raw_by_icon(&self, icon: &str) -> Result<Vec<RawRecord>, StoreError> {
        self.state()?.raw_read(|row| row.icon == icon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::row;
    use crate::model::TranslationPatch;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_put_row_advances_id_sequence() {
        let store = MemoryStore::new();
        store.put_row(row(10, "en", "rocket"));

        let draft_row = row(0, "fr", "rocket");
        let inserted = store
            .insert(RowDraft {
                locale: draft_row.locale,
                icon: draft_row.icon,
                image: draft_row.image,
                title: draft_row.title,
                visible: draft_row.visible,
                primary_label: draft_row.primary_label,
                primary_features: draft_row.primary_features,
                secondary_label: draft_row.secondary_label,
                secondary_features: draft_row.secondary_features,
                created_at: draft_row.created_at,
                updated_at: draft_row.updated_at,
            })
            .await
            .unwrap();

        assert_eq!(inserted.id, 11);
    }

    #[tokio::test]
    async fn test_guarded_update_detects_stale_snapshot() {
        let store = MemoryStore::new();
        let original = row(1, "fr", "rocket");
        store.put_row(original.clone());

        let outcome = store
            .update(
                1,
                RowUpdate {
                    patch: TranslationPatch {
                        visible: Some(true),
                        ..Default::default()
                    },
                    updated_at: Utc::now(),
                    expected_updated_at: Some(original.updated_at - Duration::seconds(1)),
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome, UpdateOutcome::Stale);
        assert!(!store.rows()[0].visible);
    }

    #[tokio::test]
    async fn test_update_missing_row() {
        let store = MemoryStore::new();
        let outcome = store
            .update(
                42,
                RowUpdate {
                    patch: TranslationPatch::default(),
                    updated_at: Utc::now(),
                    expected_updated_at: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_failing_update_is_store_error() {
        let store = MemoryStore::new();
        store.put_row(row(1, "fr", "rocket"));
        store.fail_updates_for(1);

        let result = store
            .update(
                1,
                RowUpdate {
                    patch: TranslationPatch::default(),
                    updated_at: Utc::now(),
                    expected_updated_at: None,
                },
            )
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_schema_drift_hides_typed_rows_and_lowercases_raw_keys() {
        let store = MemoryStore::new();
        store.put_row(row(1, "en", "rocket"));
        store.set_schema_drift(true);

        assert!(store.fetch_by_locale("en").await.unwrap().is_empty());
        assert!(store.fetch(1).await.is_err());
        let raw = store.raw_by_locale("EN").await.unwrap();
        assert_eq!(raw.len(), 1);
        assert!(raw[0].contains_key("primarylabel"));
        assert!(!raw[0].contains_key("primaryLabel"));
        assert_eq!(store.raw_reads(), 1);
    }

    #[tokio::test]
    async fn test_outages() {
        let store = MemoryStore::new();
        store.put_row(row(1, "en", "rocket"));
        store.set_primary_outage(true);
        store.set_raw_outage(true);

        assert!(store.fetch_by_icon("rocket").await.is_err());
        assert!(store.fetch(1).await.is_err());
        assert!(store.raw_by_icon("rocket").await.is_err());
        assert!(store.raw_by_id(1).await.is_err());
        assert_eq!(store.raw_reads(), 0);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryStore::new();
        store.put_row(row(1, "en", "rocket"));
        assert!(store.delete(1).await.unwrap());
        assert!(!store.delete(1).await.unwrap());
        assert!(store.fetch(1).await.unwrap().is_none());
    }
}
