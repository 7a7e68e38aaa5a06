use crate::locale::UnsupportedLocale;
use crate::model::{RowId, TranslationRow};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Failures raised by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Could not decode stored row: {0}")]
    Decode(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Why a single sibling could not be brought in line with the canonical row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// The sibling changed after the group snapshot was taken.
    Conflict,
    /// The sibling was deleted after the group snapshot was taken.
    Missing,
    Store(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Conflict => f.write_str("modified since snapshot"),
            FailureReason::Missing => f.write_str("row no longer exists"),
            FailureReason::Store(msg) => write!(f, "store error: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiblingFailure {
    pub id: RowId,
    pub locale: String,
    pub reason: FailureReason,
}

impl fmt::Display for SiblingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{}): {}", self.locale, self.id, self.reason)
    }
}

fn describe(failures: &[SiblingFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors returned by catalog operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The triggering write committed, but fan-out to some siblings failed.
    /// `row` is the committed row.
    #[error(
        "Row #{} saved but {} sibling update(s) failed: {}",
        .row.id,
        .failures.len(),
        describe(.failures)
    )]
    PartialFailure {
        row: Box<TranslationRow>,
        failures: Vec<SiblingFailure>,
    },

    #[error("Store unavailable (primary: {primary}; fallback: {fallback})")]
    StoreUnavailable {
        #[source]
        primary: StoreError,
        fallback: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<UnsupportedLocale> for SyncError {
    fn from(err: UnsupportedLocale) -> Self {
        SyncError::Validation(err.to_string())
    }
}

pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::row;

    #[test]
    fn test_partial_failure_names_failed_siblings() {
        let err = SyncError::PartialFailure {
            row: Box::new(row(1, "en", "rocket")),
            failures: vec![SiblingFailure {
                id: 3,
                locale: "de".to_string(),
                reason: FailureReason::Store("disk full".to_string()),
            }],
        };

        let msg = err.to_string();
        assert!(msg.contains("Row #1"));
        assert!(msg.contains("1 sibling"));
        assert!(msg.contains("de (#3): store error: disk full"));
    }

    #[test]
    fn test_unsupported_locale_is_validation_error() {
        let err: SyncError = UnsupportedLocale("xx".to_string()).into();
        assert!(matches!(err, SyncError::Validation(_)));
    }

    #[test]
    fn test_store_unavailable_mentions_both_paths() {
        let err = SyncError::StoreUnavailable {
            primary: StoreError::Unavailable("connection refused".to_string()),
            fallback: "timeout".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("connection refused"));
        assert!(msg.contains("timeout"));
    }

    #[test]
    fn test_failure_reason_serializes_tagged() {
        let json = serde_json::to_value(FailureReason::Conflict).unwrap();
        assert_eq!(json["kind"], "conflict");
    }
}
