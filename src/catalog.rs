//! Catalog façade: the operations exposed to request handlers.
//!
//! Holds no per-request state. Every call reads what it needs from the store,
//! so two calls never observe each other except through stored rows.

use crate::accessor;
use crate::audit::{self, AuditReport};
use crate::config::Config;
use crate::error::SyncResult;
use crate::fallback::Listing;
use crate::group::{resolve_group, TranslationGroup};
use crate::locale::Locale;
use crate::model::{NewTranslation, RowId, TranslationPatch, TranslationRow};
use crate::store::TranslationStore;
use crate::sync::FanOutReport;
use crate::upsert::{self, Upserted};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogOptions {
    /// Consult the raw read path when the typed path finds nothing.
    pub raw_fallback: bool,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self { raw_fallback: true }
    }
}

impl From<&Config> for CatalogOptions {
    fn from(config: &Config) -> Self {
        Self {
            raw_fallback: config.raw_fallback,
        }
    }
}

pub struct Catalog<S> {
    store: S,
    options: CatalogOptions,
}

impl<S: TranslationStore> Catalog<S> {
    pub fn new(store: S, options: CatalogOptions) -> Self {
        Self { store, options }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Every row stored under `locale`.
    pub async fn list_translations(&self, locale: Locale) -> SyncResult<Listing> {
        accessor::list(&self.store, locale, self.options.raw_fallback).await
    }

    /// Rows under `locale` that are flagged for the public listing.
    pub async fn list_visible(&self, locale: Locale) -> SyncResult<Listing> {
        let mut listing = self.list_translations(locale).await?;
        listing.rows.retain(|row| row.visible);
        Ok(listing)
    }

    /// The group of `id`, with every sibling showing the canonical row's
    /// shared fields.
    pub async fn get_group(&self, id: RowId) -> SyncResult<TranslationGroup> {
        let group = resolve_group(&self.store, id, self.options.raw_fallback).await?;
        Ok(group.normalized())
    }

    /// Start a new entry with its canonical-locale row.
    pub async fn create_canonical(&self, fields: NewTranslation) -> SyncResult<TranslationRow> {
        accessor::create(&self.store, Locale::canonical(), fields).await
    }

    pub async fn upsert(
        &self,
        id: RowId,
        locale: Locale,
        patch: TranslationPatch,
    ) -> SyncResult<Upserted> {
        upsert::upsert_translation(&self.store, id, locale, patch, self.options.raw_fallback).await
    }

    /// Remove one locale's row. Other rows of the group stay.
    pub async fn delete(&self, id: RowId) -> SyncResult<()> {
        accessor::delete(&self.store, id).await
    }

    pub async fn audit(&self) -> SyncResult<AuditReport> {
        audit::audit_catalog(&self.store, self.options.raw_fallback).await
    }

    pub async fn reconcile(&self, id: RowId) -> SyncResult<FanOutReport> {
        audit::reconcile_group(&self.store, id, self.options.raw_fallback).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::row;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_list_visible_filters_hidden_rows() {
        let store = MemoryStore::new();
        let mut shown = row(1, "en", "rocket");
        shown.visible = true;
        store.put_row(shown);
        store.put_row(row(2, "en", "star"));

        let catalog = Catalog::new(store, CatalogOptions::default());
        let listing = catalog.list_visible(Locale::CANONICAL).await.unwrap();
        assert_eq!(listing.rows.len(), 1);
        assert_eq!(listing.rows[0].id, 1);
    }

    #[tokio::test]
    async fn test_get_group_is_normalized() {
        let store = MemoryStore::new();
        store.put_row(row(1, "en", "rocket"));
        let mut drifted = row(2, "fr", "rocket");
        drifted.image = "stale.png".to_string();
        store.put_row(drifted);

        let catalog = Catalog::new(store, CatalogOptions::default());
        let group = catalog.get_group(2).await.unwrap();
        assert_eq!(group.siblings[0].image, "img.png");
        // Stored data is left as it is.
        assert_eq!(catalog.store().rows()[1].image, "stale.png");
    }

    #[tokio::test]
    async fn test_create_canonical_uses_canonical_locale() {
        let catalog = Catalog::new(MemoryStore::new(), CatalogOptions::default());
        let created = catalog
            .create_canonical(NewTranslation {
                icon: Some("rocket".to_string()),
                image: Some("img.png".to_string()),
                primary_label: Some("Admin View".to_string()),
                secondary_label: Some("Partner View".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(created.locale, "en");
    }

    #[test]
    fn test_options_from_config() {
        let config = Config {
            database_url: "postgres://localhost/catalog".to_string(),
            max_connections: 5,
            table: "demo_items".to_string(),
            raw_fallback: false,
        };
        assert!(!CatalogOptions::from(&config).raw_fallback);
    }
}
