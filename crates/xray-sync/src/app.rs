//! Application wiring.
//!
//! Builds the HTTP clients, the issue repository and the synchronizer from a
//! configuration file and the environment.

use crate::client::{GherkinPreprocessor, JiraClient, JiraHttpClient, XrayHttpClient};
use crate::config::{jira_credentials, process_env, SyncConfig};
use crate::domain::IssueKey;
use crate::error::Result;
use crate::repository::IssueRepository;
use crate::sync::FeatureFileSynchronizer;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Everything known about one issue, for the `issues` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueMetadata {
    /// The issue key.
    pub key: IssueKey,
    /// The summary, if it could be fetched.
    pub summary: Option<String>,
    /// The labels, if they could be fetched.
    pub labels: Option<Vec<String>>,
    /// The description, if it could be fetched.
    pub description: Option<String>,
    /// The Xray test type, if it could be fetched.
    pub test_type: Option<String>,
}

/// The configured application.
pub struct App {
    config: SyncConfig,
    repository: Arc<IssueRepository>,
    synchronizer: FeatureFileSynchronizer,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("repository", &"<IssueRepository>")
            .finish_non_exhaustive()
    }
}

impl App {
    /// Load the configuration file and read credentials from the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Fails if the configuration cannot be loaded, credentials are missing or
    /// the HTTP clients cannot be built.
    pub async fn load(config_path: &Path) -> Result<Self> {
        debug!(path = %config_path.display(), "Loading configuration");
        let config = SyncConfig::load(config_path).await?;
        Self::from_config(config, process_env)
    }

    /// Build the application from a configuration and an environment lookup.
    ///
    /// # Errors
    ///
    /// Fails if credentials are missing or the HTTP clients cannot be built.
    pub fn from_config(config: SyncConfig, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let credentials = jira_credentials(&env)?;
        let xray = XrayHttpClient::new(config.xray_mode(&credentials, &env)?)?;
        // Xray cloud only runs on Jira cloud.
        let jira: Arc<dyn JiraClient> = Arc::new(
            JiraHttpClient::new(&config.jira.url, credentials)?.with_cloud(config.xray.cloud),
        );
        let repository = Arc::new(IssueRepository::new(
            jira.clone(),
            config.jira.fields.clone(),
        ));
        let synchronizer = FeatureFileSynchronizer::new(
            jira,
            repository.clone(),
            Arc::new(xray),
            Arc::new(GherkinPreprocessor),
            config.jira.project_key.clone(),
        )
        .with_cloud(config.xray.cloud)
        .with_prefixes(config.tag_prefixes());

        Ok(Self {
            config,
            repository,
            synchronizer,
        })
    }

    /// The loaded configuration.
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The issue metadata repository.
    #[must_use]
    pub fn repository(&self) -> &IssueRepository {
        &self.repository
    }

    /// The feature file synchronizer.
    #[must_use]
    pub fn synchronizer(&self) -> &FeatureFileSynchronizer {
        &self.synchronizer
    }

    /// Summary, labels, description and test type of each issue.
    ///
    /// Fields that cannot be fetched are `None`; the reason is logged.
    pub async fn issue_metadata(&self, keys: &[IssueKey]) -> Vec<IssueMetadata> {
        let repository = &self.repository;
        let (summaries, labels, descriptions, test_types) = tokio::join!(
            repository.get_summaries(keys),
            repository.get_labels(keys),
            repository.get_descriptions(keys),
            repository.get_test_types(keys),
        );
        keys.iter()
            .map(|key| IssueMetadata {
                key: key.clone(),
                summary: summaries.get(key).cloned(),
                labels: labels.get(key).cloned(),
                description: descriptions.get(key).cloned(),
                test_type: test_types.get(key).cloned(),
            })
            .collect()
    }
}
