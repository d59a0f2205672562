//! Domain types shared by the clients, the metadata layer and the synchronizer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A project-scoped Jira issue key, e.g. `CYP-123`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueKey(pub String);

impl IssueKey {
    /// Create a new issue key
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IssueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for IssueKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for IssueKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Schema information of a Jira field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// The value type, e.g. `string`, `array` or `option`.
    #[serde(rename = "type", default)]
    pub field_type: String,

    /// Item type for array fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<String>,

    /// System field name, set for built-in fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Custom field type identifier, set for custom fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<String>,
}

/// A field as listed by the Jira field endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    /// Opaque field identifier, e.g. `summary` or `customfield_10100`.
    pub id: String,

    /// Display name, e.g. `Test Type`.
    pub name: String,

    /// Whether this is a custom field.
    #[serde(default)]
    pub custom: bool,

    /// Names usable in JQL clauses.
    #[serde(default)]
    pub clause_names: Vec<String>,

    /// Value schema, absent for some internal fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<FieldSchema>,
}

/// An issue as returned by a search, restricted to the requested fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchIssue {
    /// The issue key. Jira omits it in some malformed responses.
    #[serde(default)]
    pub key: Option<IssueKey>,

    /// Raw field values by field id.
    #[serde(default)]
    pub fields: Map<String, Value>,
}

/// An edit request: new values by field id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueEdit {
    /// Field values to write.
    pub fields: Map<String, Value>,
}

impl IssueEdit {
    /// An edit writing a single field.
    pub fn single(field_id: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut fields = Map::new();
        fields.insert(field_id.into(), value.into());
        Self { fields }
    }
}

/// What Xray reports after importing a feature file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportFeatureResponse {
    /// Tests and preconditions that were updated or created.
    pub updated_or_created_issues: Vec<IssueKey>,

    /// Problems Xray reported without failing the import.
    pub errors: Vec<String>,
}

/// The semantic fields cached by the issue repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JiraField {
    /// The issue summary.
    Summary,
    /// The issue description.
    Description,
    /// The issue labels.
    Labels,
    /// The Xray test type (a custom field).
    TestType,
}

impl JiraField {
    /// The display name used to look the field up in Jira.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Description => "description",
            Self::Labels => "labels",
            Self::TestType => "test type",
        }
    }

    /// The plural used in log messages, e.g. "Failed to fetch issue summaries".
    #[must_use]
    pub fn plural(self) -> &'static str {
        match self {
            Self::Summary => "summaries",
            Self::Description => "descriptions",
            Self::Labels => "labels",
            Self::TestType => "test types",
        }
    }
}

impl fmt::Display for JiraField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A scenario linked to a test issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CucumberTest {
    /// The test issue key.
    pub key: IssueKey,
    /// The scenario name Xray writes into the summary.
    pub summary: String,
    /// The scenario tags Xray writes into the labels.
    pub tags: Vec<String>,
}

/// A background linked to a precondition issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CucumberPrecondition {
    /// The precondition issue key.
    pub key: IssueKey,
    /// The background name Xray writes into the summary.
    pub summary: String,
}

/// Every issue reference found in one feature file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureFileReferences {
    /// Test references.
    pub tests: Vec<CucumberTest>,
    /// Precondition references.
    pub preconditions: Vec<CucumberPrecondition>,
}

impl FeatureFileReferences {
    /// Union of all referenced keys in document order, without duplicates.
    #[must_use]
    pub fn keys(&self) -> Vec<IssueKey> {
        let mut keys: Vec<IssueKey> = Vec::new();
        let all = self
            .tests
            .iter()
            .map(|t| &t.key)
            .chain(self.preconditions.iter().map(|p| &p.key));
        for key in all {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        keys
    }
}

impl From<xray_gherkin::references::IssueReferences> for FeatureFileReferences {
    fn from(references: xray_gherkin::references::IssueReferences) -> Self {
        Self {
            tests: references
                .tests
                .into_iter()
                .map(|t| CucumberTest {
                    key: IssueKey::from(t.key),
                    summary: t.summary,
                    tags: t.tags,
                })
                .collect(),
            preconditions: references
                .preconditions
                .into_iter()
                .map(|p| CucumberPrecondition {
                    key: IssueKey::from(p.key),
                    summary: p.summary,
                })
                .collect(),
        }
    }
}
