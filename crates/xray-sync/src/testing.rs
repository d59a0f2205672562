//! In-process client mocks for tests.
//!
//! Compiled for unit tests and behind the `test-util` feature for
//! integration tests and downstream crates.

use crate::client::{FeatureFilePreprocessor, JiraClient, XrayClient};
use crate::domain::{
    CucumberPrecondition, CucumberTest, FeatureFileReferences, FieldDescriptor,
    ImportFeatureResponse, IssueEdit, IssueKey, SearchIssue,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use xray_gherkin::references::TagPrefixes;

/// A field descriptor with the given id and display name.
#[must_use]
pub fn field(id: &str, name: &str) -> FieldDescriptor {
    FieldDescriptor {
        id: id.to_string(),
        name: name.to_string(),
        custom: id.starts_with("customfield_"),
        clause_names: vec![name.to_lowercase()],
        schema: None,
    }
}

/// The fields used by the repository getters, with system ids and a custom
/// test type field.
#[must_use]
pub fn standard_fields() -> Vec<FieldDescriptor> {
    vec![
        field("summary", "Summary"),
        field("description", "Description"),
        field("labels", "Labels"),
        field("customfield_10100", "Test Type"),
    ]
}

/// A search issued against [`MockJiraClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSearch {
    /// The JQL filter.
    pub jql: String,
    /// The requested fields.
    pub fields: Vec<String>,
}

#[derive(Default)]
struct JiraState {
    fields: Option<Vec<FieldDescriptor>>,
    issues: BTreeMap<IssueKey, Map<String, Value>>,
    raw_results: Vec<SearchIssue>,
    search_unavailable: bool,
    search_failure: bool,
    failing_edits: HashSet<IssueKey>,
    list_fields_calls: usize,
    searches: Vec<RecordedSearch>,
    edits: Vec<(IssueKey, IssueEdit)>,
}

/// In-memory Jira with stored issues, recording every call.
///
/// Searches understand the `issue in (...)` filter produced by the field
/// fetcher and project the requested fields. Edits are applied to the stored
/// issues.
#[derive(Default)]
pub struct MockJiraClient {
    state: Mutex<JiraState>,
}

impl MockJiraClient {
    /// A client without fields or issues. `list_fields` returns no data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve the given field list.
    #[must_use]
    pub fn with_fields(self, fields: Vec<FieldDescriptor>) -> Self {
        self.set_fields(Some(fields));
        self
    }

    /// Store an issue with the given fields object.
    #[must_use]
    pub fn with_issue(self, key: &str, fields: Value) -> Self {
        self.set_issue(key, fields);
        self
    }

    /// Append an issue to every search result, regardless of the filter.
    #[must_use]
    pub fn with_raw_search_issue(self, issue: SearchIssue) -> Self {
        self.lock().raw_results.push(issue);
        self
    }

    /// Make searches answer without any data.
    #[must_use]
    pub fn with_search_unavailable(self) -> Self {
        self.lock().search_unavailable = true;
        self
    }

    /// Make searches fail with an API error.
    #[must_use]
    pub fn with_search_failure(self) -> Self {
        self.lock().search_failure = true;
        self
    }

    /// Make edits of the given issue fail with an API error.
    #[must_use]
    pub fn with_failing_edit(self, key: &str) -> Self {
        self.lock().failing_edits.insert(IssueKey::from(key));
        self
    }

    /// Replace the served field list.
    pub fn set_fields(&self, fields: Option<Vec<FieldDescriptor>>) {
        self.lock().fields = fields;
    }

    /// Store or replace an issue.
    ///
    /// # Panics
    ///
    /// Panics if `fields` is not a JSON object.
    pub fn set_issue(&self, key: &str, fields: Value) {
        let Value::Object(fields) = fields else {
            panic!("issue fields must be a JSON object");
        };
        self.lock().issues.insert(IssueKey::from(key), fields);
    }

    /// Current value of a stored issue field.
    #[must_use]
    pub fn issue_field(&self, key: &str, field_id: &str) -> Option<Value> {
        self.lock()
            .issues
            .get(&IssueKey::from(key))
            .and_then(|fields| fields.get(field_id).cloned())
    }

    /// How often the field list was requested.
    #[must_use]
    pub fn list_fields_calls(&self) -> usize {
        self.lock().list_fields_calls
    }

    /// Every search, in call order.
    #[must_use]
    pub fn searches(&self) -> Vec<RecordedSearch> {
        self.lock().searches.clone()
    }

    /// Every edit, in call order, including failed ones.
    #[must_use]
    pub fn edits(&self) -> Vec<(IssueKey, IssueEdit)> {
        self.lock().edits.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, JiraState> {
        self.state
            .lock()
            .expect("mock jira mutex should not be poisoned")
    }
}

/// Keys listed in an `issue in (...)` filter.
fn filter_keys(jql: &str) -> Vec<IssueKey> {
    jql.trim()
        .strip_prefix("issue in (")
        .and_then(|rest| rest.strip_suffix(')'))
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(IssueKey::from)
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl JiraClient for MockJiraClient {
    async fn search_issues(
        &self,
        jql: &str,
        fields: &[String],
    ) -> Result<Option<Vec<SearchIssue>>> {
        let mut state = self.lock();
        state.searches.push(RecordedSearch {
            jql: jql.to_string(),
            fields: fields.to_vec(),
        });
        if state.search_failure {
            return Err(Error::Api {
                url: "mock://jira/rest/api/2/search".to_string(),
                status: 500,
                body: "search failed".to_string(),
            });
        }
        if state.search_unavailable {
            return Ok(None);
        }

        let mut results: Vec<SearchIssue> = filter_keys(jql)
            .into_iter()
            .filter_map(|key| {
                let stored = state.issues.get(&key)?;
                let projected = fields
                    .iter()
                    .filter_map(|id| stored.get(id).map(|value| (id.clone(), value.clone())))
                    .collect();
                Some(SearchIssue {
                    key: Some(key),
                    fields: projected,
                })
            })
            .collect();
        results.extend(state.raw_results.iter().cloned());
        Ok(Some(results))
    }

    async fn list_fields(&self) -> Result<Option<Vec<FieldDescriptor>>> {
        let mut state = self.lock();
        state.list_fields_calls += 1;
        Ok(state.fields.clone())
    }

    async fn edit_issue(&self, key: &IssueKey, edit: &IssueEdit) -> Result<()> {
        let mut state = self.lock();
        state.edits.push((key.clone(), edit.clone()));
        if state.failing_edits.contains(key) {
            return Err(Error::Api {
                url: format!("mock://jira/rest/api/2/issue/{key}"),
                status: 400,
                body: "edit rejected".to_string(),
            });
        }
        let issue = state.issues.entry(key.clone()).or_default();
        for (id, value) in &edit.fields {
            issue.insert(id.clone(), value.clone());
        }
        Ok(())
    }
}

/// An import recorded by [`MockXrayClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedImport {
    /// The imported file.
    pub file: PathBuf,
    /// The target project.
    pub project_key: String,
}

/// In-memory Xray returning a fixed import response.
///
/// Optionally overwrites issue fields of a [`MockJiraClient`] on import, the
/// way a real import rewrites summaries and labels.
pub struct MockXrayClient {
    response: Option<ImportFeatureResponse>,
    jira: Option<Arc<MockJiraClient>>,
    overwrites: Vec<(String, Value)>,
    imports: Mutex<Vec<RecordedImport>>,
}

impl MockXrayClient {
    /// Report the given keys as updated or created.
    #[must_use]
    pub fn updating(keys: &[&str]) -> Self {
        Self::with_response(ImportFeatureResponse {
            updated_or_created_issues: keys.iter().copied().map(IssueKey::from).collect(),
            errors: Vec::new(),
        })
    }

    /// Return the given response on every import.
    #[must_use]
    pub fn with_response(response: ImportFeatureResponse) -> Self {
        Self {
            response: Some(response),
            jira: None,
            overwrites: Vec::new(),
            imports: Mutex::new(Vec::new()),
        }
    }

    /// Fail every import with an API error.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            response: None,
            ..Self::updating(&[])
        }
    }

    /// On import, replace the fields of `key` in `jira` with `fields`.
    #[must_use]
    pub fn overwriting(mut self, jira: &Arc<MockJiraClient>, key: &str, fields: Value) -> Self {
        self.jira = Some(jira.clone());
        self.overwrites.push((key.to_string(), fields));
        self
    }

    /// Every import, in call order.
    #[must_use]
    pub fn imports(&self) -> Vec<RecordedImport> {
        self.imports
            .lock()
            .expect("mock xray mutex should not be poisoned")
            .clone()
    }
}

#[async_trait]
impl XrayClient for MockXrayClient {
    async fn import_feature(&self, file: &Path, project_key: &str) -> Result<ImportFeatureResponse> {
        self.imports
            .lock()
            .expect("mock xray mutex should not be poisoned")
            .push(RecordedImport {
                file: file.to_path_buf(),
                project_key: project_key.to_string(),
            });

        let Some(response) = &self.response else {
            return Err(Error::Api {
                url: "mock://xray/import/feature".to_string(),
                status: 500,
                body: "import failed".to_string(),
            });
        };
        if let Some(jira) = &self.jira {
            for (key, fields) in &self.overwrites {
                for (id, value) in fields.as_object().into_iter().flatten() {
                    jira.edit_issue(&IssueKey::from(key.as_str()), &IssueEdit::single(id.clone(), value.clone()))
                        .await?;
                }
            }
        }
        Ok(response.clone())
    }
}

/// Preprocessor returning fixed references without reading the file.
#[derive(Debug, Clone, Default)]
pub struct StaticPreprocessor {
    references: FeatureFileReferences,
}

impl StaticPreprocessor {
    /// Return the given references for every file.
    #[must_use]
    pub fn new(references: FeatureFileReferences) -> Self {
        Self { references }
    }

    /// Add a test reference.
    #[must_use]
    pub fn with_test(mut self, key: &str, summary: &str, tags: &[&str]) -> Self {
        self.references.tests.push(CucumberTest {
            key: IssueKey::from(key),
            summary: summary.to_string(),
            tags: tags.iter().map(ToString::to_string).collect(),
        });
        self
    }

    /// Add a precondition reference.
    #[must_use]
    pub fn with_precondition(mut self, key: &str, summary: &str) -> Self {
        self.references.preconditions.push(CucumberPrecondition {
            key: IssueKey::from(key),
            summary: summary.to_string(),
        });
        self
    }
}

#[async_trait]
impl FeatureFilePreprocessor for StaticPreprocessor {
    async fn extract_issue_references(
        &self,
        _file: &Path,
        _project_key: &str,
        _cloud: bool,
        _prefixes: &TagPrefixes,
    ) -> Result<FeatureFileReferences> {
        Ok(self.references.clone())
    }
}
