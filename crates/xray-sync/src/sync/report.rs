//! Outcome of synchronizing one feature file.
//!
//! Synchronization never fails as a whole. Everything that went wrong along
//! the way is recorded as a [`SyncProblem`] so that callers can print or
//! serialize it, while the synchronizer logs each problem as it happens.

use super::overlap::OverlapResult;
use crate::domain::{IssueKey, JiraField};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

/// How a synchronization ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum SyncOutcome {
    /// All steps ran. Individual problems may still have occurred.
    Completed,
    /// The feature file could not be processed; Jira was not modified.
    Aborted {
        /// Why the file was skipped.
        reason: String,
    },
}

/// A non-fatal problem encountered during synchronization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SyncProblem {
    /// Referenced issues the import did not report as updated.
    ReferencesNotUpdated {
        /// The affected issues.
        keys: Vec<IssueKey>,
    },

    /// Issues the import updated or created without being referenced.
    UnexpectedUpdates {
        /// The affected issues.
        keys: Vec<IssueKey>,
    },

    /// A problem Xray reported while importing.
    ImportError {
        /// Xray's message.
        message: String,
    },

    /// No pre-import value is known, so the field cannot be restored.
    MissingSnapshot {
        /// The affected issue.
        key: IssueKey,
        /// The field that could not be restored.
        field: JiraField,
    },

    /// Writing the pre-import value back failed.
    RestoreFailed {
        /// The affected issue.
        key: IssueKey,
        /// The field that could not be restored.
        field: JiraField,
        /// The value before the import.
        previous: Value,
        /// The value written by the import.
        imported: Value,
        /// Why the edit failed.
        error: String,
    },
}

impl SyncProblem {
    /// Returns a human-readable, possibly multi-line, description.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::ReferencesNotUpdated { keys } => format!(
                "Referenced issues were not updated by the import: {}\n\
                 Make sure the issues exist and that the configured tag prefixes match the feature file.",
                join(keys)
            ),
            Self::UnexpectedUpdates { keys } => format!(
                "The import updated or created issues that are not referenced: {}\n\
                 They may have been created by the import and are not tracked locally.",
                join(keys)
            ),
            Self::ImportError { message } => format!("Xray reported an import error: {message}"),
            Self::MissingSnapshot { key, field } => format!(
                "Cannot restore {field} of issue {key}: its value before the import is unknown\n\
                 Check the issue in Jira and restore its {field} manually if needed."
            ),
            Self::RestoreFailed {
                key,
                field,
                previous,
                imported,
                error,
            } => format!(
                "Failed to restore {field} of issue {key}: {error}\n\
                 Value before import: {previous}\n\
                 Value after import:  {imported}\n\
                 Restore the value manually if needed."
            ),
        }
    }

    /// The issues this problem concerns.
    #[must_use]
    pub fn keys(&self) -> Vec<&IssueKey> {
        match self {
            Self::ReferencesNotUpdated { keys } | Self::UnexpectedUpdates { keys } => {
                keys.iter().collect()
            }
            Self::ImportError { .. } => Vec::new(),
            Self::MissingSnapshot { key, .. } | Self::RestoreFailed { key, .. } => vec![key],
        }
    }
}

impl fmt::Display for SyncProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

/// A field written back to its pre-import value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestoredField {
    /// The issue.
    pub key: IssueKey,
    /// The restored field.
    pub field: JiraField,
    /// The value written.
    pub value: Value,
}

/// Everything that happened while synchronizing one feature file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// The synchronized file, as passed in.
    pub file: PathBuf,
    /// How the synchronization ended.
    pub outcome: SyncOutcome,
    /// Expected against updated issues, once the import ran.
    pub overlap: Option<OverlapResult>,
    /// Fields written back.
    pub restored: Vec<RestoredField>,
    /// Non-fatal problems, in the order they occurred.
    pub problems: Vec<SyncProblem>,
}

impl SyncReport {
    pub(crate) fn new(file: PathBuf) -> Self {
        Self {
            file,
            outcome: SyncOutcome::Completed,
            overlap: None,
            restored: Vec::new(),
            problems: Vec::new(),
        }
    }

    pub(crate) fn aborted(file: PathBuf, reason: String) -> Self {
        Self {
            outcome: SyncOutcome::Aborted { reason },
            ..Self::new(file)
        }
    }

    /// Whether all steps ran.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.outcome == SyncOutcome::Completed
    }

    /// Whether all steps ran without any problem.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.is_completed() && self.problems.is_empty()
    }
}

fn join(keys: &[IssueKey]) -> String {
    keys.iter()
        .map(IssueKey::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
