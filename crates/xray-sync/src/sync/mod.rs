//! Feature file synchronization.
//!
//! Importing a feature file into Xray overwrites the summaries and labels of
//! the referenced issues with the scenario names and tags. The synchronizer
//! keeps those fields stable:
//!
//! 1. extract the issue references of the feature file
//! 2. snapshot summaries and labels through the [`IssueRepository`]
//! 3. import the file
//! 4. compare the referenced issues with the issues Xray reports as updated
//! 5. write the snapshot values back where the import changed them
//!
//! Only a feature file that cannot be processed, or an import request that
//! fails, stops a synchronization early. Every other problem is logged,
//! recorded in the [`SyncReport`] and skipped.

pub mod overlap;
pub mod report;

pub use overlap::OverlapResult;
pub use report::{RestoredField, SyncOutcome, SyncProblem, SyncReport};

use crate::client::{FeatureFilePreprocessor, JiraClient, XrayClient};
use crate::domain::{IssueEdit, IssueKey, JiraField};
use crate::error::Result;
use crate::repository::IssueRepository;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use xray_gherkin::references::TagPrefixes;

/// Synchronizes feature files of one Jira project with Xray.
pub struct FeatureFileSynchronizer {
    jira: Arc<dyn JiraClient>,
    repository: Arc<IssueRepository>,
    xray: Arc<dyn XrayClient>,
    preprocessor: Arc<dyn FeatureFilePreprocessor>,
    project_key: String,
    cloud: bool,
    prefixes: TagPrefixes,
}

impl FeatureFileSynchronizer {
    /// Create a synchronizer for Xray server without tag prefixes.
    ///
    /// `repository` must be backed by `jira`, restores are written through it.
    pub fn new(
        jira: Arc<dyn JiraClient>,
        repository: Arc<IssueRepository>,
        xray: Arc<dyn XrayClient>,
        preprocessor: Arc<dyn FeatureFilePreprocessor>,
        project_key: impl Into<String>,
    ) -> Self {
        Self {
            jira,
            repository,
            xray,
            preprocessor,
            project_key: project_key.into(),
            cloud: false,
            prefixes: TagPrefixes::default(),
        }
    }

    /// Whether Xray runs in the cloud. Only affects diagnostics.
    #[must_use]
    pub fn with_cloud(mut self, cloud: bool) -> Self {
        self.cloud = cloud;
        self
    }

    /// Prefixes of test tags and precondition comments.
    #[must_use]
    pub fn with_prefixes(mut self, prefixes: TagPrefixes) -> Self {
        self.prefixes = prefixes;
        self
    }

    /// Synchronize a feature file and return its path unchanged.
    ///
    /// Relative paths are resolved against `project_root`. All side effects
    /// have happened when this returns; problems are logged, never returned.
    pub async fn synchronize_feature_file(&self, file: &Path, project_root: &Path) -> PathBuf {
        let report = self.synchronize(file, project_root).await;
        let shown_path = display_path(file, project_root);
        match &report.outcome {
            SyncOutcome::Completed => info!(
                file = %shown_path,
                restored = report.restored.len(),
                problems = report.problems.len(),
                "Feature file synchronized"
            ),
            SyncOutcome::Aborted { .. } => info!(file = %shown_path, "Feature file skipped"),
        }
        file.to_path_buf()
    }

    /// Synchronize a feature file and report what happened.
    pub async fn synchronize(&self, file: &Path, project_root: &Path) -> SyncReport {
        let shown_path = display_path(file, project_root);
        let location = if file.is_relative() {
            project_root.join(file)
        } else {
            file.to_path_buf()
        };
        info!(file = %shown_path, "Synchronizing feature file");

        let references = match self
            .preprocessor
            .extract_issue_references(&location, &self.project_key, self.cloud, &self.prefixes)
            .await
        {
            Ok(references) => references,
            Err(e) => {
                error!(file = %shown_path, "Failed to extract issue references, skipping synchronization\n\n{e}");
                return SyncReport::aborted(file.to_path_buf(), e.to_string());
            }
        };
        let keys = references.keys();
        debug!(
            file = %shown_path,
            tests = references.tests.len(),
            preconditions = references.preconditions.len(),
            "Extracted issue references"
        );

        let summaries = self.repository.get_summaries(&keys).await;
        let labels = self.repository.get_labels(&keys).await;

        let response = match self.xray.import_feature(&location, &self.project_key).await {
            Ok(response) => response,
            Err(e) => {
                error!(file = %shown_path, "Failed to import feature file\n\n{e}");
                return SyncReport::aborted(file.to_path_buf(), e.to_string());
            }
        };

        let mut report = SyncReport::new(file.to_path_buf());
        for message in response.errors {
            let problem = SyncProblem::ImportError { message };
            warn!(file = %shown_path, "{problem}");
            report.problems.push(problem);
        }

        let overlap = OverlapResult::compute(&keys, &response.updated_or_created_issues);
        if !overlap.left_only.is_empty() {
            let problem = SyncProblem::ReferencesNotUpdated {
                keys: overlap.left_only.clone(),
            };
            warn!(file = %shown_path, "{problem}");
            report.problems.push(problem);
        }
        if !overlap.right_only.is_empty() {
            let problem = SyncProblem::UnexpectedUpdates {
                keys: overlap.right_only.clone(),
            };
            warn!(file = %shown_path, "{problem}");
            report.problems.push(problem);
        }

        let updated: HashSet<&IssueKey> = overlap.intersection.iter().collect();
        let mut done: HashSet<(IssueKey, JiraField)> = HashSet::new();

        for test in references.tests.iter().filter(|t| updated.contains(&t.key)) {
            if done.insert((test.key.clone(), JiraField::Summary)) {
                self.restore_summary(&test.key, &test.summary, &summaries, &mut report)
                    .await;
            }
            if done.insert((test.key.clone(), JiraField::Labels)) {
                self.restore_labels(&test.key, &test.tags, &labels, &mut report)
                    .await;
            }
        }
        for precondition in references
            .preconditions
            .iter()
            .filter(|p| updated.contains(&p.key))
        {
            if done.insert((precondition.key.clone(), JiraField::Summary)) {
                self.restore_summary(&precondition.key, &precondition.summary, &summaries, &mut report)
                    .await;
            }
        }

        report.overlap = Some(overlap);
        report
    }

    async fn restore_summary(
        &self,
        key: &IssueKey,
        synced: &str,
        snapshot: &HashMap<IssueKey, String>,
        report: &mut SyncReport,
    ) {
        let Some(previous) = snapshot.get(key) else {
            missing_snapshot(key, JiraField::Summary, report);
            return;
        };
        if previous == synced {
            debug!(issue = %key, "Summary unchanged by import");
            return;
        }
        self.restore(key, JiraField::Summary, json!(previous), json!(synced), report)
            .await;
    }

    async fn restore_labels(
        &self,
        key: &IssueKey,
        synced: &[String],
        snapshot: &HashMap<IssueKey, Vec<String>>,
        report: &mut SyncReport,
    ) {
        let Some(previous) = snapshot.get(key) else {
            missing_snapshot(key, JiraField::Labels, report);
            return;
        };
        if synced.iter().all(|label| previous.contains(label)) {
            debug!(issue = %key, "Labels unchanged by import");
            return;
        }
        self.restore(key, JiraField::Labels, json!(previous), json!(synced), report)
            .await;
    }

    async fn restore(
        &self,
        key: &IssueKey,
        field: JiraField,
        previous: Value,
        imported: Value,
        report: &mut SyncReport,
    ) {
        match self.write_field(key, field, &previous).await {
            Ok(()) => {
                info!(issue = %key, field = %field, value = %previous, "Restored field");
                report.restored.push(RestoredField {
                    key: key.clone(),
                    field,
                    value: previous,
                });
            }
            Err(e) => {
                let problem = SyncProblem::RestoreFailed {
                    key: key.clone(),
                    field,
                    previous,
                    imported,
                    error: e.to_string(),
                };
                error!(issue = %key, field = %field, "{problem}");
                report.problems.push(problem);
            }
        }
    }

    async fn write_field(&self, key: &IssueKey, field: JiraField, value: &Value) -> Result<()> {
        let field_id = self.repository.field_id(field).await?;
        self.jira
            .edit_issue(key, &IssueEdit::single(field_id, value.clone()))
            .await
    }
}

impl std::fmt::Debug for FeatureFileSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureFileSynchronizer")
            .field("project_key", &self.project_key)
            .field("cloud", &self.cloud)
            .field("prefixes", &self.prefixes)
            .finish_non_exhaustive()
    }
}

fn missing_snapshot(key: &IssueKey, field: JiraField, report: &mut SyncReport) {
    let problem = SyncProblem::MissingSnapshot {
        key: key.clone(),
        field,
    };
    error!(issue = %key, field = %field, "{problem}");
    report.problems.push(problem);
}

fn display_path(file: &Path, project_root: &Path) -> String {
    file.strip_prefix(project_root)
        .unwrap_or(file)
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::GherkinPreprocessor;
    use crate::repository::FieldIdOverrides;
    use crate::testing::{standard_fields, MockJiraClient, MockXrayClient, StaticPreprocessor};
    use tempfile::TempDir;

    struct Fixture {
        jira: Arc<MockJiraClient>,
        xray: Arc<MockXrayClient>,
        synchronizer: FeatureFileSynchronizer,
    }

    fn fixture(
        jira: MockJiraClient,
        xray: impl FnOnce(&Arc<MockJiraClient>) -> MockXrayClient,
        preprocessor: impl FeatureFilePreprocessor + 'static,
    ) -> Fixture {
        let jira = Arc::new(jira.with_fields(standard_fields()));
        let xray = Arc::new(xray(&jira));
        let repository = Arc::new(IssueRepository::new(jira.clone(), FieldIdOverrides::default()));
        let synchronizer = FeatureFileSynchronizer::new(
            jira.clone(),
            repository,
            xray.clone(),
            Arc::new(preprocessor),
            "CYP",
        );
        Fixture {
            jira,
            xray,
            synchronizer,
        }
    }

    fn keys(keys: &[&str]) -> Vec<IssueKey> {
        keys.iter().copied().map(IssueKey::from).collect()
    }

    #[tokio::test]
    async fn test_restores_only_updated_references() {
        let f = fixture(
            MockJiraClient::new()
                .with_issue("CYP-1", json!({"summary": "Old", "labels": []}))
                .with_issue("CYP-2", json!({"summary": "Old2", "labels": []})),
            |jira| MockXrayClient::updating(&["CYP-1"]).overwriting(jira, "CYP-1", json!({"summary": "New"})),
            StaticPreprocessor::default()
                .with_test("CYP-1", "New", &[])
                .with_test("CYP-2", "New2", &[]),
        );

        let report = f
            .synchronizer
            .synchronize(Path::new("a.feature"), Path::new("/project"))
            .await;

        assert!(report.is_completed());
        assert_eq!(
            f.jira.edits(),
            vec![(IssueKey::new("CYP-1"), IssueEdit::single("summary", "Old"))]
        );
        assert_eq!(f.jira.issue_field("CYP-1", "summary"), Some(json!("Old")));
        assert_eq!(f.jira.issue_field("CYP-2", "summary"), Some(json!("Old2")));

        let overlap = report.overlap.unwrap();
        assert_eq!(overlap.intersection, keys(&["CYP-1"]));
        assert_eq!(overlap.left_only, keys(&["CYP-2"]));
        assert_eq!(
            report.problems,
            vec![SyncProblem::ReferencesNotUpdated {
                keys: keys(&["CYP-2"])
            }]
        );
    }

    #[tokio::test]
    async fn test_matching_snapshot_issues_no_edit() {
        let f = fixture(
            MockJiraClient::new().with_issue("CYP-1", json!({"summary": "Same", "labels": ["a"]})),
            |_| MockXrayClient::updating(&["CYP-1"]),
            StaticPreprocessor::default().with_test("CYP-1", "Same", &["a"]),
        );

        let report = f
            .synchronizer
            .synchronize(Path::new("a.feature"), Path::new("."))
            .await;

        assert!(report.is_clean());
        assert!(f.jira.edits().is_empty());
    }

    #[tokio::test]
    async fn test_labels_restored_only_when_not_subset() {
        let f = fixture(
            MockJiraClient::new()
                .with_issue("CYP-1", json!({"summary": "s", "labels": ["a", "b"]}))
                .with_issue("CYP-2", json!({"summary": "t", "labels": ["a"]})),
            |_| MockXrayClient::updating(&["CYP-1", "CYP-2"]),
            StaticPreprocessor::default()
                .with_test("CYP-1", "s", &["a"])
                .with_test("CYP-2", "t", &["a", "c"]),
        );

        let report = f
            .synchronizer
            .synchronize(Path::new("a.feature"), Path::new("."))
            .await;

        assert_eq!(
            f.jira.edits(),
            vec![(IssueKey::new("CYP-2"), IssueEdit::single("labels", json!(["a"])))]
        );
        assert_eq!(report.restored.len(), 1);
        assert_eq!(report.restored[0].field, JiraField::Labels);
    }

    #[tokio::test]
    async fn test_restore_failure_does_not_stop_other_issues() {
        let f = fixture(
            MockJiraClient::new()
                .with_issue("CYP-1", json!({"summary": "Old1", "labels": []}))
                .with_issue("CYP-2", json!({"summary": "Old2", "labels": []}))
                .with_failing_edit("CYP-1"),
            |_| MockXrayClient::updating(&["CYP-1", "CYP-2"]),
            StaticPreprocessor::default()
                .with_test("CYP-1", "New1", &[])
                .with_test("CYP-2", "New2", &[]),
        );

        let report = f
            .synchronizer
            .synchronize(Path::new("a.feature"), Path::new("."))
            .await;

        assert!(report.is_completed());
        assert_eq!(f.jira.edits().len(), 2);
        assert_eq!(f.jira.issue_field("CYP-2", "summary"), Some(json!("Old2")));
        assert_eq!(report.restored.len(), 1);
        assert_eq!(report.restored[0].key, IssueKey::new("CYP-2"));
        match &report.problems[..] {
            [SyncProblem::RestoreFailed { key, previous, imported, .. }] => {
                assert_eq!(key, &IssueKey::new("CYP-1"));
                assert_eq!(previous, &json!("Old1"));
                assert_eq!(imported, &json!("New1"));
            }
            other => panic!("Expected one restore failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_reported() {
        let f = fixture(
            MockJiraClient::new(),
            |_| MockXrayClient::updating(&["CYP-3"]),
            StaticPreprocessor::default().with_test("CYP-3", "New", &["tag"]),
        );

        let report = f
            .synchronizer
            .synchronize(Path::new("a.feature"), Path::new("."))
            .await;

        assert!(f.jira.edits().is_empty());
        assert_eq!(
            report.problems,
            vec![
                SyncProblem::MissingSnapshot {
                    key: IssueKey::new("CYP-3"),
                    field: JiraField::Summary,
                },
                SyncProblem::MissingSnapshot {
                    key: IssueKey::new("CYP-3"),
                    field: JiraField::Labels,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_preconditions_restore_summary_only() {
        let f = fixture(
            MockJiraClient::new().with_issue("CYP-5", json!({"summary": "Setup", "labels": ["x"]})),
            |_| MockXrayClient::updating(&["CYP-5"]),
            StaticPreprocessor::default().with_precondition("CYP-5", "Background"),
        );

        f.synchronizer
            .synchronize(Path::new("a.feature"), Path::new("."))
            .await;

        assert_eq!(
            f.jira.edits(),
            vec![(IssueKey::new("CYP-5"), IssueEdit::single("summary", "Setup"))]
        );
    }

    #[tokio::test]
    async fn test_unexpected_updates_are_only_reported() {
        let f = fixture(
            MockJiraClient::new().with_issue("CYP-1", json!({"summary": "s", "labels": []})),
            |_| MockXrayClient::updating(&["CYP-1", "CYP-7"]),
            StaticPreprocessor::default().with_test("CYP-1", "s", &[]),
        );

        let report = f
            .synchronizer
            .synchronize(Path::new("a.feature"), Path::new("."))
            .await;

        assert!(f.jira.edits().is_empty());
        assert_eq!(
            report.problems,
            vec![SyncProblem::UnexpectedUpdates {
                keys: keys(&["CYP-7"])
            }]
        );
    }

    #[tokio::test]
    async fn test_import_errors_are_warnings() {
        let f = fixture(
            MockJiraClient::new().with_issue("CYP-1", json!({"summary": "s", "labels": []})),
            |_| {
                MockXrayClient::with_response(crate::domain::ImportFeatureResponse {
                    updated_or_created_issues: keys(&["CYP-1"]),
                    errors: vec!["Scenario 2: unknown step".to_string()],
                })
            },
            StaticPreprocessor::default().with_test("CYP-1", "s", &[]),
        );

        let report = f
            .synchronizer
            .synchronize(Path::new("a.feature"), Path::new("."))
            .await;

        assert!(report.is_completed());
        assert_eq!(
            report.problems,
            vec![SyncProblem::ImportError {
                message: "Scenario 2: unknown step".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_failed_import_aborts() {
        let f = fixture(
            MockJiraClient::new().with_issue("CYP-1", json!({"summary": "s", "labels": []})),
            |_| MockXrayClient::failing(),
            StaticPreprocessor::default().with_test("CYP-1", "New", &[]),
        );

        let report = f
            .synchronizer
            .synchronize(Path::new("a.feature"), Path::new("."))
            .await;

        assert!(matches!(report.outcome, SyncOutcome::Aborted { .. }));
        assert!(f.jira.edits().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_feature_file_aborts_and_returns_path() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("broken.feature"), "Scenario: no feature\n").unwrap();
        let f = fixture(MockJiraClient::new(), |_| MockXrayClient::updating(&[]), GherkinPreprocessor);

        let report = f
            .synchronizer
            .synchronize(Path::new("broken.feature"), dir.path())
            .await;
        assert!(!report.is_completed());
        assert!(f.xray.imports().is_empty());

        let returned = f
            .synchronizer
            .synchronize_feature_file(Path::new("broken.feature"), dir.path())
            .await;
        assert_eq!(returned, PathBuf::from("broken.feature"));
    }

    #[tokio::test]
    async fn test_relative_files_resolve_against_project_root() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("features")).unwrap();
        std::fs::write(
            dir.path().join("features/login.feature"),
            "Feature: Login\n  @CYP-1\n  Scenario: Logs in\n    Given a user\n",
        )
        .unwrap();
        let f = fixture(
            MockJiraClient::new().with_issue("CYP-1", json!({"summary": "Logs in", "labels": []})),
            |_| MockXrayClient::updating(&["CYP-1"]),
            GherkinPreprocessor,
        );

        let report = f
            .synchronizer
            .synchronize(Path::new("features/login.feature"), dir.path())
            .await;

        assert!(report.is_clean(), "{report:?}");
        let imports = f.xray.imports();
        assert_eq!(imports[0].file, dir.path().join("features/login.feature"));
        assert_eq!(imports[0].project_key, "CYP");
    }
}
