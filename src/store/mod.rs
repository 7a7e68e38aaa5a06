//! Storage seam for translation rows.
//!
//! A backend offers two read paths. The typed path (`fetch_*`) maps columns by
//! their exact names and is the one every operation uses first. The raw path
//! (`raw_*`) returns each row as a column-name → value record without assuming
//! any column casing; `crate::fallback` rebuilds rows from those records when
//! the typed path comes back empty or fails.

pub mod memory;
pub mod postgres;

use crate::error::StoreError;
use crate::model::{RowDraft, RowId, RowUpdate, TranslationRow, UpdateOutcome};
use async_trait::async_trait;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// A row as returned by the raw path: column name → JSON value.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

#[async_trait]
pub trait TranslationStore: Send + Sync {
    async fn fetch(&self, id: RowId) -> Result<Option<TranslationRow>, StoreError>;

    /// Rows whose stored locale equals `locale`, ordered by id.
    async fn fetch_by_locale(&self, locale: &str) -> Result<Vec<TranslationRow>, StoreError>;

    /// Rows of any locale whose icon equals `icon`, ordered by id.
    async fn fetch_by_icon(&self, icon: &str) -> Result<Vec<TranslationRow>, StoreError>;

    async fn insert(&self, draft: RowDraft) -> Result<TranslationRow, StoreError>;

    async fn update(&self, id: RowId, update: RowUpdate) -> Result<UpdateOutcome, StoreError>;

    /// Returns `false` if no row had this id.
    async fn delete(&self, id: RowId) -> Result<bool, StoreError>;

    /// The raw record with this id, if any.
    async fn raw_by_id(&self, id: RowId) -> Result<Vec<RawRecord>, StoreError>;

    /// Raw records whose locale matches `locale` ignoring case.
    async fn raw_by_locale(&self, locale: &str) -> Result<Vec<RawRecord>, StoreError>;

    /// Raw records whose icon equals `icon`.
    async fn raw_by_icon(&self, icon: &str) -> Result<Vec<RawRecord>, StoreError>;
}
