//! Row types for per-locale catalog entries.
//!
//! A logical entry (a demo item, a service FAQ, ...) is stored as one
//! `TranslationRow` per locale. `icon`, `image`, `title` and `visible` are
//! shared: every row of the entry carries the same values. The labels and
//! feature lists are independent per locale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Row identifier. Unique per row, meaningful for its own locale only.
pub type RowId = i64;

/// Names of the shared columns, in the order they are reported.
pub const SHARED_FIELDS: [&str; 4] = ["icon", "image", "title", "visible"];

/// One locale's translation of a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRow {
    pub id: RowId,
    pub locale: String,

    // Shared across the group
    pub icon: String,
    pub image: String,
    pub title: Option<String>,
    pub visible: bool,

    // Independent per locale
    #[sqlx(rename = "primaryLabel")]
    pub primary_label: String,
    #[sqlx(rename = "primaryFeatures")]
    pub primary_features: Option<Vec<String>>,
    #[sqlx(rename = "secondaryLabel")]
    pub secondary_label: String,
    #[sqlx(rename = "secondaryFeatures")]
    pub secondary_features: Option<Vec<String>>,

    #[sqlx(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[sqlx(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl TranslationRow {
    pub fn shared(&self) -> SharedFields {
        SharedFields {
            icon: self.icon.clone(),
            image: self.image.clone(),
            title: self.title.clone(),
            visible: self.visible,
        }
    }

    /// Overwrite this row's shared fields.
    pub fn with_shared(mut self, shared: &SharedFields) -> Self {
        self.icon = shared.icon.clone();
        self.image = shared.image.clone();
        self.title = shared.title.clone();
        self.visible = shared.visible;
        self
    }

    /// Patch that re-supplies this row's independent fields unchanged.
    pub fn independent_patch(&self) -> TranslationPatch {
        TranslationPatch {
            primary_label: Some(self.primary_label.clone()),
            primary_features: self.primary_features.clone(),
            secondary_label: Some(self.secondary_label.clone()),
            secondary_features: self.secondary_features.clone(),
            ..TranslationPatch::default()
        }
    }
}

/// The fields that must be identical across every row of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedFields {
    pub icon: String,
    pub image: String,
    pub title: Option<String>,
    pub visible: bool,
}

impl SharedFields {
    /// Names of the fields on which `self` and `other` disagree.
    pub fn diff(&self, other: &SharedFields) -> Vec<&'static str> {
        let differs = [
            self.icon != other.icon,
            self.image != other.image,
            self.title != other.title,
            self.visible != other.visible,
        ];
        SHARED_FIELDS
            .into_iter()
            .zip(differs)
            .filter_map(|(name, differs)| differs.then_some(name))
            .collect()
    }
}

/// Caller-supplied fields for a new row. Required-ness is checked by the
/// row accessor so that a missing field surfaces as a validation error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewTranslation {
    pub icon: Option<String>,
    pub image: Option<String>,
    pub title: Option<String>,
    pub visible: Option<bool>,
    pub primary_label: Option<String>,
    pub primary_features: Option<Vec<String>>,
    pub secondary_label: Option<String>,
    pub secondary_features: Option<Vec<String>>,
}

/// Partial update. `None` means "leave the stored value alone".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranslationPatch {
    pub icon: Option<String>,
    pub image: Option<String>,
    pub title: Option<String>,
    pub visible: Option<bool>,
    pub primary_label: Option<String>,
    pub primary_features: Option<Vec<String>>,
    pub secondary_label: Option<String>,
    pub secondary_features: Option<Vec<String>>,
    /// Store a null title. Never read from payloads; only set when a null
    /// canonical title is fanned out.
    #[serde(skip)]
    pub clear_title: bool,
}

impl TranslationPatch {
    pub fn is_empty(&self) -> bool {
        *self == TranslationPatch::default()
    }

    pub fn has_shared_fields(&self) -> bool {
        self.icon.is_some()
            || self.image.is_some()
            || self.title.is_some()
            || self.clear_title
            || self.visible.is_some()
    }

    /// The shared-field part of this patch.
    pub fn shared_changes(&self) -> SharedFieldChanges {
        SharedFieldChanges {
            icon: self.icon.clone(),
            image: self.image.clone(),
            title: match (&self.title, self.clear_title) {
                (Some(title), _) => Some(Some(title.clone())),
                (None, true) => Some(None),
                (None, false) => None,
            },
            visible: self.visible,
        }
    }

    /// This patch with every shared field removed.
    pub fn without_shared(self) -> Self {
        Self {
            icon: None,
            image: None,
            title: None,
            clear_title: false,
            visible: None,
            ..self
        }
    }

    /// Apply the patch on top of `row`, leaving unmentioned fields as they are.
    pub fn apply_to(&self, row: &TranslationRow) -> TranslationRow {
        let mut next = row.clone();
        if let Some(icon) = &self.icon {
            next.icon = icon.clone();
        }
        if let Some(image) = &self.image {
            next.image = image.clone();
        }
        if let Some(title) = &self.title {
            next.title = Some(title.clone());
        } else if self.clear_title {
            next.title = None;
        }
        if let Some(visible) = self.visible {
            next.visible = visible;
        }
        if let Some(label) = &self.primary_label {
            next.primary_label = label.clone();
        }
        if let Some(features) = &self.primary_features {
            next.primary_features = Some(features.clone());
        }
        if let Some(label) = &self.secondary_label {
            next.secondary_label = label.clone();
        }
        if let Some(features) = &self.secondary_features {
            next.secondary_features = Some(features.clone());
        }
        next
    }
}

/// Shared-field values to fan out from the canonical row to its siblings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SharedFieldChanges {
    pub icon: Option<String>,
    pub image: Option<String>,
    /// `Some(None)` writes a null title.
    pub title: Option<Option<String>>,
    pub visible: Option<bool>,
}

impl SharedFieldChanges {
    /// Every shared field of `shared`, used when re-aligning a whole group.
    pub fn all(shared: &SharedFields) -> Self {
        Self {
            icon: Some(shared.icon.clone()),
            image: Some(shared.image.clone()),
            title: Some(shared.title.clone()),
            visible: Some(shared.visible),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == SharedFieldChanges::default()
    }

    /// Same set of fields, with values read back from the stored canonical row.
    /// Stored values win over requested ones because the accessor may have
    /// normalised them (a blank title becomes the primary label).
    pub fn resolved_against(&self, stored: &TranslationRow) -> Self {
        Self {
            icon: self.icon.as_ref().map(|_| stored.icon.clone()),
            image: self.image.as_ref().map(|_| stored.image.clone()),
            title: self.title.as_ref().map(|_| stored.title.clone()),
            visible: self.visible.map(|_| stored.visible),
        }
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.icon.is_some() {
            names.push("icon");
        }
        if self.image.is_some() {
            names.push("image");
        }
        if self.title.is_some() {
            names.push("title");
        }
        if self.visible.is_some() {
            names.push("visible");
        }
        names
    }

    pub fn into_patch(self) -> TranslationPatch {
        TranslationPatch {
            icon: self.icon,
            image: self.image,
            clear_title: matches!(self.title, Some(None)),
            title: self.title.flatten(),
            visible: self.visible,
            ..TranslationPatch::default()
        }
    }
}

/// A validated, timestamped row ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDraft {
    pub locale: String,
    pub icon: String,
    pub image: String,
    pub title: Option<String>,
    pub visible: bool,
    pub primary_label: String,
    pub primary_features: Option<Vec<String>>,
    pub secondary_label: String,
    pub secondary_features: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated patch ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowUpdate {
    pub patch: TranslationPatch,
    pub updated_at: DateTime<Utc>,
    /// Only write if the stored `updated_at` still equals this value.
    pub expected_updated_at: Option<DateTime<Utc>>,
}

/// Result of a guarded update at the storage layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated(TranslationRow),
    NotFound,
    /// The row changed after the caller's snapshot was taken.
    Stale,
}
