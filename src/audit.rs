//! Consistency audit and manual reconciliation.
//!
//! Fan-out is best effort, so a group can end up with siblings whose shared
//! fields no longer match the canonical row. The audit finds such groups;
//! `reconcile_group` pushes the canonical values out again.

use crate::accessor;
use crate::error::{SyncError, SyncResult};
use crate::fallback::ReadPath;
use crate::group::{resolve_group, TranslationGroup};
use crate::locale::{Locale, LocaleRegistry};
use crate::model::{RowId, SharedFieldChanges, TranslationRow};
use crate::store::TranslationStore;
use crate::sync::{propagate_shared_fields, FanOutReport};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditFinding {
    /// A sibling's shared fields differ from the canonical row's.
    SharedFieldDrift {
        icon: String,
        canonical_id: RowId,
        row_id: RowId,
        locale: String,
        fields: Vec<&'static str>,
    },
    /// More than one row for the same locale in one group.
    DuplicateLocale {
        icon: String,
        locale: String,
        row_ids: Vec<RowId>,
    },
    /// No canonical-locale row; new translations cannot be seeded.
    MissingCanonical { icon: String, row_ids: Vec<RowId> },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub groups_scanned: usize,
    pub rows_scanned: usize,
    pub findings: Vec<AuditFinding>,
    /// Set when any locale listing had to use the raw fallback path.
    pub used_fallback: bool,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    /// Findings that break shared-field consistency.
    pub fn drift_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| matches!(f, AuditFinding::SharedFieldDrift { .. }))
            .count()
    }
}

/// Check one group for drift, duplicate locales and a missing canonical row.
pub fn audit_group(group: &TranslationGroup) -> Vec<AuditFinding> {
    let icon = group.group_key().to_string();
    let mut findings = Vec::new();

    if !group.authoritative {
        findings.push(AuditFinding::MissingCanonical {
            icon: icon.clone(),
            row_ids: group.rows().map(|r| r.id).collect(),
        });
    }

    for (locale, row_ids) in group.duplicate_locales() {
        findings.push(AuditFinding::DuplicateLocale {
            icon: icon.clone(),
            locale,
            row_ids,
        });
    }

    let shared = group.shared();
    for sibling in &group.siblings {
        let fields = shared.diff(&sibling.shared());
        if !fields.is_empty() {
            findings.push(AuditFinding::SharedFieldDrift {
                icon: icon.clone(),
                canonical_id: group.canonical.id,
                row_id: sibling.id,
                locale: sibling.locale.clone(),
                fields,
            });
        }
    }

    findings
}

/// Scan every supported locale and audit the groups found.
///
/// Rows are grouped by icon as stored. A row whose icon drifted away from its
/// canonical row therefore shows up as its own group, usually with a
/// `MissingCanonical` finding.
pub async fn audit_catalog<S>(store: &S, fallback_enabled: bool) -> SyncResult<AuditReport>
where
    S: TranslationStore + ?Sized,
{
    let mut report = AuditReport::default();
    let mut by_icon: BTreeMap<String, Vec<TranslationRow>> = BTreeMap::new();
    let mut blank = Vec::new();

    for config in LocaleRegistry::supported().list_all() {
        let locale = Locale::from_code(config.code)?;
        let listing = accessor::list(store, locale, fallback_enabled).await?;
        report.used_fallback |= listing.used_fallback();
        report.rows_scanned += listing.rows.len();

        for row in listing.rows {
            if row.icon.trim().is_empty() {
                blank.push(row);
            } else {
                by_icon.entry(row.icon.clone()).or_default().push(row);
            }
        }
    }

    let source = if report.used_fallback {
        ReadPath::Fallback
    } else {
        ReadPath::Primary
    };
    for rows in by_icon.into_values() {
        if let Some(group) = TranslationGroup::from_rows(rows, source) {
            report.groups_scanned += 1;
            report.findings.extend(audit_group(&group));
        }
    }
    // Rows without a grouping key are groups of one and cannot drift.
    report.groups_scanned += blank.len();

    info!(
        groups = report.groups_scanned,
        rows = report.rows_scanned,
        findings = report.findings.len(),
        "Catalog audit finished"
    );
    Ok(report)
}

/// Copy the canonical row's shared fields onto every sibling of `id`'s group
/// that disagrees with them.
pub async fn reconcile_group<S>(store: &S, id: RowId, fallback_enabled: bool) -> SyncResult<FanOutReport>
where
    S: TranslationStore + ?Sized,
{
    let group = resolve_group(store, id, fallback_enabled).await?;
    if !group.authoritative {
        return Err(SyncError::NotFound(format!(
            "entry '{}' has no '{}' row to reconcile from",
            group.group_key(),
            Locale::CANONICAL
        )));
    }

    let shared = group.shared();
    let drifted: Vec<TranslationRow> = group
        .fan_out_targets()
        .into_iter()
        .filter(|row| row.shared() != shared)
        .collect();

    if drifted.is_empty() {
        info!(icon = %group.group_key(), "Group already consistent");
        return Ok(FanOutReport::default());
    }

    info!(
        icon = %group.group_key(),
        drifted = drifted.len(),
        "Reconciling shared fields"
    );
    let changes = SharedFieldChanges::all(&shared);
    Ok(propagate_shared_fields(store, &drifted, &changes).await)
}
