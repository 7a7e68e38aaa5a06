//! Shared-field fan-out from the canonical row to its siblings.
//!
//! The sibling list must come from a snapshot taken *before* the canonical
//! row was written. Siblings are found through the shared `icon`, so once a
//! new icon is stored on the canonical row the old siblings can no longer be
//! looked up by it.

use crate::accessor;
use crate::error::{FailureReason, SiblingFailure};
use crate::model::{RowId, SharedFieldChanges, TranslationRow, UpdateOutcome};
use crate::store::TranslationStore;
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

/// What happened to each sibling during one fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FanOutReport {
    pub updated: Vec<RowId>,
    pub failed: Vec<SiblingFailure>,
}

impl FanOutReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Write `changes` to every sibling in `siblings_before_update`.
///
/// Each sibling's independent fields are re-supplied unchanged alongside the
/// shared ones. Every write is guarded by the sibling's snapshot `updatedAt`,
/// so a sibling edited concurrently is reported as a conflict instead of being
/// overwritten. Writes run concurrently; a failed sibling does not stop the
/// others and nothing is rolled back. No rows are created.
pub async fn propagate_shared_fields<S>(
    store: &S,
    siblings_before_update: &[TranslationRow],
    changes: &SharedFieldChanges,
) -> FanOutReport
where
    S: TranslationStore + ?Sized,
{
    let mut report = FanOutReport::default();
    if changes.is_empty() || siblings_before_update.is_empty() {
        return report;
    }

    debug!(
        fields = ?changes.field_names(),
        siblings = siblings_before_update.len(),
        "Propagating shared fields"
    );

    let writes = siblings_before_update.iter().map(|sibling| async move {
        let mut patch = sibling.independent_patch();
        let shared = changes.clone().into_patch();
        patch.icon = shared.icon;
        patch.image = shared.image;
        patch.title = shared.title;
        patch.clear_title = shared.clear_title;
        patch.visible = shared.visible;

        let outcome = accessor::apply_update(store, sibling, patch, Some(sibling.updated_at)).await;
        (sibling, outcome)
    });

    for (sibling, outcome) in join_all(writes).await {
        let reason = match outcome {
            Ok(UpdateOutcome::Updated(_)) => {
                report.updated.push(sibling.id);
                continue;
            }
            Ok(UpdateOutcome::Stale) => FailureReason::Conflict,
            Ok(UpdateOutcome::NotFound) => FailureReason::Missing,
            Err(e) => FailureReason::Store(e.to_string()),
        };
        warn!(
            id = sibling.id,
            locale = %sibling.locale,
            %reason,
            "Sibling not synchronised"
        );
        report.failed.push(SiblingFailure {
            id: sibling.id,
            locale: sibling.locale.clone(),
            reason,
        });
    }

    info!(
        updated = report.updated.len(),
        failed = report.failed.len(),
        "Shared-field fan-out finished"
    );
    report
}
