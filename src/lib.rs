//! Multi-locale consistency engine for admin-managed catalog entries.
//!
//! Each entry is stored as one row per locale. `icon`, `image`, `title` and
//! `visible` are shared by all rows of an entry and owned by the canonical
//! (English) row; labels and feature lists belong to each locale.
//!
//! Entry point is [`Catalog`]; storage backends implement
//! [`store::TranslationStore`].

pub mod accessor;
pub mod audit;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fallback;
pub mod group;
pub mod locale;
pub mod model;
pub mod store;
pub mod sync;
pub mod upsert;

pub use catalog::{Catalog, CatalogOptions};
pub use error::{StoreError, SyncError, SyncResult};
pub use locale::Locale;
pub use model::{NewTranslation, RowId, TranslationPatch, TranslationRow};
