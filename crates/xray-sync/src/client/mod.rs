//! Client abstractions for Jira, Xray and feature file preprocessing.
//!
//! The metadata layer and the synchronizer only talk to the outside world
//! through the traits in this module. HTTP implementations live in [`jira`]
//! and [`xray`]; in-process mocks for tests live in `crate::testing`.
//!
//! # Architecture
//!
//! All traits are async and object-safe so that they can be shared as
//! `Arc<dyn JiraClient>` between the resolver, the repository and the
//! synchronizer.

use crate::domain::{
    FeatureFileReferences, FieldDescriptor, ImportFeatureResponse, IssueEdit, IssueKey, SearchIssue,
};
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;
use xray_gherkin::references::TagPrefixes;

pub mod auth;
pub mod jira;
pub mod xray;

pub use auth::{Credentials, XrayCloudCredentials};
pub use jira::JiraHttpClient;
pub use xray::{XrayHttpClient, XrayMode};

/// Access to the Jira REST API.
///
/// # Error Handling
///
/// `Ok(None)` means the server answered but returned no data at all, which
/// callers distinguish from an empty list. Transport failures and non-success
/// statuses are errors.
#[async_trait]
pub trait JiraClient: Send + Sync {
    /// Search issues matching a JQL filter, returning only the given fields.
    async fn search_issues(&self, jql: &str, fields: &[String])
    -> Result<Option<Vec<SearchIssue>>>;

    /// List every field known to the Jira instance.
    async fn list_fields(&self) -> Result<Option<Vec<FieldDescriptor>>>;

    /// Write field values of an issue.
    async fn edit_issue(&self, key: &IssueKey, edit: &IssueEdit) -> Result<()>;
}

/// Access to the Xray import endpoints.
#[async_trait]
pub trait XrayClient: Send + Sync {
    /// Import a feature file into a project.
    ///
    /// Xray creates or updates the referenced tests and preconditions and
    /// overwrites their summaries and labels from the file content.
    async fn import_feature(&self, file: &Path, project_key: &str)
    -> Result<ImportFeatureResponse>;
}

/// Derives the issue references of a feature file.
#[async_trait]
pub trait FeatureFilePreprocessor: Send + Sync {
    /// Extract the test and precondition references of a feature file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed, or if a scenario or
    /// background lacks exactly one issue reference.
    async fn extract_issue_references(
        &self,
        file: &Path,
        project_key: &str,
        cloud: bool,
        prefixes: &TagPrefixes,
    ) -> Result<FeatureFileReferences>;
}

/// Preprocessor reading feature files with `xray-gherkin`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GherkinPreprocessor;

#[async_trait]
impl FeatureFilePreprocessor for GherkinPreprocessor {
    async fn extract_issue_references(
        &self,
        file: &Path,
        project_key: &str,
        cloud: bool,
        prefixes: &TagPrefixes,
    ) -> Result<FeatureFileReferences> {
        let references = xray_gherkin::extract_from_file(file, project_key, cloud, prefixes).await?;
        Ok(references.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_gherkin_preprocessor_maps_references() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.feature");
        std::fs::write(
            &path,
            "Feature: a\n  Background: bg\n    #@CYP-1\n    Given x\n  @CYP-2 @tag\n  Scenario: s\n    Given y\n",
        )
        .unwrap();

        let references = GherkinPreprocessor
            .extract_issue_references(&path, "CYP", false, &TagPrefixes::default())
            .await
            .unwrap();

        assert_eq!(references.preconditions[0].key, IssueKey::new("CYP-1"));
        assert_eq!(references.tests[0].key, IssueKey::new("CYP-2"));
        assert_eq!(references.tests[0].tags, vec!["tag"]);
    }

    #[tokio::test]
    async fn test_gherkin_preprocessor_reports_parse_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.feature");
        std::fs::write(&path, "no feature here\n").unwrap();

        let result = GherkinPreprocessor
            .extract_issue_references(&path, "CYP", false, &TagPrefixes::default())
            .await;

        assert!(matches!(
            result,
            Err(crate::error::Error::FeatureFile(xray_gherkin::Error::MissingFeature))
        ));
    }
}
