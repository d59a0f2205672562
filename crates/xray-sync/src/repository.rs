//! Cached issue metadata.
//!
//! The repository keeps one cache per semantic field (summary, description,
//! labels, test type), keyed by issue key. Every getter serves cached entries
//! and fetches only the keys it has not seen yet.
//!
//! # Error Boundary
//!
//! The `lookup_*` methods return a [`FieldLookup`] carrying the values found,
//! the error that stopped the fetch (if any) and the keys that remain
//! unresolved. The `get_*` methods log that diagnostic and return the partial
//! values, so callers never have to handle tracker errors. A failing field
//! never affects the caches of the other fields.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use xray_sync::client::{Credentials, JiraHttpClient};
//! use xray_sync::domain::IssueKey;
//! use xray_sync::repository::{FieldIdOverrides, IssueRepository};
//!
//! # async fn example() -> xray_sync::Result<()> {
//! let jira = JiraHttpClient::new("https://jira.example.com", Credentials::pat("token"))?;
//! let repository = IssueRepository::new(Arc::new(jira), FieldIdOverrides::default());
//!
//! let summaries = repository.get_summaries(&[IssueKey::new("CYP-1")]).await;
//! # Ok(())
//! # }
//! ```

use crate::client::JiraClient;
use crate::domain::{IssueKey, JiraField};
use crate::error::{Error, Result};
use crate::fields::{extract, fetch_field_values, FieldExtractor, FieldResolver};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt::Write;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};

/// Field ids configured explicitly, bypassing name resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FieldIdOverrides {
    /// Id of the summary field.
    pub summary: Option<String>,
    /// Id of the description field.
    pub description: Option<String>,
    /// Id of the labels field.
    pub labels: Option<String>,
    /// Id of the Xray test type field.
    pub test_type: Option<String>,
}

impl FieldIdOverrides {
    /// The configured id of a field, if any.
    #[must_use]
    pub fn get(&self, field: JiraField) -> Option<&str> {
        match field {
            JiraField::Summary => self.summary.as_deref(),
            JiraField::Description => self.description.as_deref(),
            JiraField::Labels => self.labels.as_deref(),
            JiraField::TestType => self.test_type.as_deref(),
        }
    }
}

/// Outcome of a repository lookup before it is reduced to a plain map.
#[derive(Debug)]
pub struct FieldLookup<T> {
    /// Values of every requested issue that is known.
    pub values: HashMap<IssueKey, T>,
    /// What prevented fetching the missing issues, if anything did.
    pub error: Option<Error>,
    /// Requested issues that are still unknown, in request order.
    pub missing: Vec<IssueKey>,
}

impl<T> FieldLookup<T> {
    /// Whether every requested issue was resolved without errors.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.missing.is_empty()
    }

    /// The diagnostic logged by the `get_*` getters, `None` if complete.
    #[must_use]
    pub fn diagnostic(&self, field: JiraField) -> Option<String> {
        if self.is_complete() {
            return None;
        }
        let mut message = format!("Failed to fetch issue {}", field.plural());
        if let Some(error) = &self.error {
            let _ = write!(message, "\n\n{error}");
        }
        if !self.missing.is_empty() {
            let keys: Vec<&str> = self.missing.iter().map(IssueKey::as_str).collect();
            let _ = write!(
                message,
                "\n\nThe following issues do not exist or could not be resolved: {}",
                keys.join(", ")
            );
        }
        Some(message)
    }

    /// Log the diagnostic, if any, and keep only the values.
    #[must_use]
    pub fn into_values_logged(self, field: JiraField) -> HashMap<IssueKey, T> {
        if let Some(message) = self.diagnostic(field) {
            error!(field = %field, "{message}");
        }
        self.values
    }
}

/// Per-field caches of issue metadata, backed by Jira.
pub struct IssueRepository {
    client: Arc<dyn JiraClient>,
    resolver: FieldResolver,
    overrides: FieldIdOverrides,
    summaries: Mutex<HashMap<IssueKey, String>>,
    descriptions: Mutex<HashMap<IssueKey, String>>,
    labels: Mutex<HashMap<IssueKey, Vec<String>>>,
    test_types: Mutex<HashMap<IssueKey, String>>,
}

impl IssueRepository {
    /// Create a repository with empty caches.
    pub fn new(client: Arc<dyn JiraClient>, overrides: FieldIdOverrides) -> Self {
        Self {
            resolver: FieldResolver::new(client.clone()),
            client,
            overrides,
            summaries: Mutex::new(HashMap::new()),
            descriptions: Mutex::new(HashMap::new()),
            labels: Mutex::new(HashMap::new()),
            test_types: Mutex::new(HashMap::new()),
        }
    }

    /// The id of a semantic field: the configured override, or the id
    /// resolved from the field's display name.
    ///
    /// # Errors
    ///
    /// Returns the resolver's error if the name cannot be resolved uniquely.
    pub async fn field_id(&self, field: JiraField) -> Result<String> {
        match self.overrides.get(field) {
            Some(id) => Ok(id.to_string()),
            None => self.resolver.resolve(field.display_name()).await,
        }
    }

    /// Resolve an arbitrary field name with the repository's resolver.
    ///
    /// # Errors
    ///
    /// Returns the resolver's error if the name cannot be resolved uniquely.
    pub async fn resolve_field_name(&self, name: &str) -> Result<String> {
        self.resolver.resolve(name).await
    }

    /// Summaries of the given issues. Never fails, see the module docs.
    pub async fn get_summaries(&self, keys: &[IssueKey]) -> HashMap<IssueKey, String> {
        self.lookup_summaries(keys)
            .await
            .into_values_logged(JiraField::Summary)
    }

    /// Descriptions of the given issues. Never fails, see the module docs.
    pub async fn get_descriptions(&self, keys: &[IssueKey]) -> HashMap<IssueKey, String> {
        self.lookup_descriptions(keys)
            .await
            .into_values_logged(JiraField::Description)
    }

    /// Labels of the given issues. Never fails, see the module docs.
    pub async fn get_labels(&self, keys: &[IssueKey]) -> HashMap<IssueKey, Vec<String>> {
        self.lookup_labels(keys)
            .await
            .into_values_logged(JiraField::Labels)
    }

    /// Xray test types of the given issues. Never fails, see the module docs.
    pub async fn get_test_types(&self, keys: &[IssueKey]) -> HashMap<IssueKey, String> {
        self.lookup_test_types(keys)
            .await
            .into_values_logged(JiraField::TestType)
    }

    /// Summaries with the full lookup diagnostics.
    pub async fn lookup_summaries(&self, keys: &[IssueKey]) -> FieldLookup<String> {
        self.merge_remaining(JiraField::Summary, &self.summaries, &extract::string(), keys)
            .await
    }

    /// Descriptions with the full lookup diagnostics.
    pub async fn lookup_descriptions(&self, keys: &[IssueKey]) -> FieldLookup<String> {
        self.merge_remaining(
            JiraField::Description,
            &self.descriptions,
            &extract::nullable_string(),
            keys,
        )
        .await
    }

    /// Labels with the full lookup diagnostics.
    pub async fn lookup_labels(&self, keys: &[IssueKey]) -> FieldLookup<Vec<String>> {
        self.merge_remaining(JiraField::Labels, &self.labels, &extract::string_array(), keys)
            .await
    }

    /// Test types with the full lookup diagnostics.
    pub async fn lookup_test_types(&self, keys: &[IssueKey]) -> FieldLookup<String> {
        self.merge_remaining(
            JiraField::TestType,
            &self.test_types,
            &extract::option_value(),
            keys,
        )
        .await
    }

    /// Serve cached keys and fetch the rest.
    ///
    /// The cache lock is held across the fetch, so concurrent calls for the
    /// same field never fetch the same issues twice.
    async fn merge_remaining<T: Clone>(
        &self,
        field: JiraField,
        cache: &Mutex<HashMap<IssueKey, T>>,
        extractor: &FieldExtractor<T>,
        keys: &[IssueKey],
    ) -> FieldLookup<T> {
        let requested = unique(keys);
        let mut cache = cache.lock().await;

        let missing: Vec<IssueKey> = requested
            .iter()
            .filter(|key| !cache.contains_key(*key))
            .cloned()
            .collect();

        let mut error = None;
        if !missing.is_empty() {
            debug!(
                field = %field,
                cached = requested.len() - missing.len(),
                missing = missing.len(),
                "Fetching missing issue fields"
            );
            match self.fetch(field, extractor, &missing).await {
                Ok(fetched) => cache.extend(fetched),
                Err(e) => error = Some(e),
            }
        }

        let mut values = HashMap::new();
        let mut unresolved = Vec::new();
        for key in requested {
            match cache.get(&key) {
                Some(value) => {
                    values.insert(key, value.clone());
                }
                None => unresolved.push(key),
            }
        }

        FieldLookup {
            values,
            error,
            missing: unresolved,
        }
    }

    async fn fetch<T>(
        &self,
        field: JiraField,
        extractor: &FieldExtractor<T>,
        keys: &[IssueKey],
    ) -> Result<HashMap<IssueKey, T>> {
        let field_id = self.field_id(field).await?;
        fetch_field_values(self.client.as_ref(), &field_id, extractor, keys).await
    }
}

impl std::fmt::Debug for IssueRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssueRepository")
            .field("overrides", &self.overrides)
            .finish_non_exhaustive()
    }
}

fn unique(keys: &[IssueKey]) -> Vec<IssueKey> {
    let mut seen = HashSet::new();
    keys.iter()
        .filter(|key| seen.insert(*key))
        .cloned()
        .collect()
}
