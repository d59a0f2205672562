//! Issue reference extraction.
//!
//! A scenario references its Jira test issue through a tag such as
//! `@TestName:CYP-123`, where `TestName:` is the configured test prefix. A
//! background references its precondition issue through a comment such as
//! `#@Precondition:CYP-100`. Every other scenario tag becomes a label of the
//! test issue when Xray imports the feature file.

use crate::document::{Background, FeatureDocument, Scenario};
use crate::error::{Error, Result};
use regex::Regex;
use tracing::debug;

/// Tag prefixes configured for test and precondition references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagPrefixes {
    /// Prefix between `@` and the issue key of test tags.
    pub test: Option<String>,
    /// Prefix between `#@` and the issue key of precondition comments.
    pub precondition: Option<String>,
}

impl TagPrefixes {
    /// Create prefixes from optional string slices.
    #[must_use]
    pub fn new(test: Option<&str>, precondition: Option<&str>) -> Self {
        Self {
            test: test.map(str::to_string),
            precondition: precondition.map(str::to_string),
        }
    }
}

/// A scenario linked to a Jira test issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestReference {
    /// The referenced issue key.
    pub key: String,
    /// The scenario name, which Xray writes into the issue summary.
    pub summary: String,
    /// The remaining scenario tags without `@`, which Xray writes into the labels.
    pub tags: Vec<String>,
}

/// A background linked to a Jira precondition issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreconditionReference {
    /// The referenced issue key.
    pub key: String,
    /// The background name, which Xray writes into the issue summary.
    pub summary: String,
}

/// All references found in one feature file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueReferences {
    /// Test references in document order.
    pub tests: Vec<TestReference>,
    /// Precondition references in document order.
    pub preconditions: Vec<PreconditionReference>,
}

impl IssueReferences {
    /// Every referenced issue key, tests first, without duplicates.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
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

/// Matches tags and comment tokens against the issue key patterns of a project.
#[derive(Debug, Clone)]
pub struct ReferenceMatcher {
    project_key: String,
    test: Regex,
    precondition: Regex,
}

impl ReferenceMatcher {
    /// Build the patterns for a project key and its tag prefixes.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidProjectKey` if the key is not an uppercase
    /// letter followed by uppercase letters, digits or underscores.
    pub fn new(project_key: &str, prefixes: &TagPrefixes) -> Result<Self> {
        if !is_valid_project_key(project_key) {
            return Err(Error::InvalidProjectKey(project_key.to_string()));
        }
        Ok(Self {
            project_key: project_key.to_string(),
            test: key_pattern(project_key, prefixes.test.as_deref()),
            precondition: key_pattern(project_key, prefixes.precondition.as_deref()),
        })
    }

    /// The issue key referenced by a scenario tag, if any.
    #[must_use]
    pub fn test_key<'a>(&self, tag: &'a str) -> Option<&'a str> {
        capture_key(&self.test, tag)
    }

    /// The issue key referenced by a background comment token, if any.
    #[must_use]
    pub fn precondition_key<'a>(&self, token: &'a str) -> Option<&'a str> {
        capture_key(&self.precondition, token)
    }
}

fn capture_key<'a>(pattern: &Regex, text: &'a str) -> Option<&'a str> {
    pattern
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|key| key.as_str())
}

fn key_pattern(project_key: &str, prefix: Option<&str>) -> Regex {
    let pattern = format!(
        r"^@{}({}-\d+)$",
        regex::escape(prefix.unwrap_or_default()),
        regex::escape(project_key)
    );
    // Both parts are escaped, the remaining pattern is constant.
    Regex::new(&pattern).expect("escaped issue key pattern is a valid regex")
}

/// Whether a string is usable as a Jira project key.
#[must_use]
pub fn is_valid_project_key(key: &str) -> bool {
    let mut chars = key.chars();
    chars.next().is_some_and(|c| c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Extract test and precondition references from a parsed feature file.
///
/// `cloud` only changes the remediation hints in error messages, since Xray
/// cloud and Xray server configure tag prefixes in different places.
///
/// # Errors
///
/// - `Error::InvalidProjectKey` if the project key is malformed
/// - `Error::MissingTestTag` / `Error::MultipleTestTags` if a scenario does not
///   carry exactly one test tag
/// - `Error::MissingPreconditionComment` / `Error::MultiplePreconditionComments`
///   if a background with steps does not carry exactly one precondition comment
pub fn extract_issue_references(
    document: &FeatureDocument,
    project_key: &str,
    cloud: bool,
    prefixes: &TagPrefixes,
) -> Result<IssueReferences> {
    let matcher = ReferenceMatcher::new(project_key, prefixes)?;
    let mut references = IssueReferences::default();

    for background in &document.backgrounds {
        if let Some(precondition) = precondition_reference(background, &matcher, cloud, prefixes)? {
            references.preconditions.push(precondition);
        }
    }

    for scenario in &document.scenarios {
        references
            .tests
            .push(test_reference(scenario, &matcher, cloud, prefixes)?);
    }

    debug!(
        feature = %document.name,
        tests = references.tests.len(),
        preconditions = references.preconditions.len(),
        "Extracted issue references"
    );
    Ok(references)
}

fn test_reference(
    scenario: &Scenario,
    matcher: &ReferenceMatcher,
    cloud: bool,
    prefixes: &TagPrefixes,
) -> Result<TestReference> {
    let mut keys = Vec::new();
    let mut tags = Vec::new();
    for tag in &scenario.tags {
        match matcher.test_key(&tag.name) {
            Some(key) => keys.push(key.to_string()),
            None => tags.push(tag.name.trim_start_matches('@').to_string()),
        }
    }

    match keys.len() {
        0 => Err(Error::MissingTestTag {
            scenario: scenario.name.clone(),
            line: scenario.line,
            hint: test_tag_hint(&scenario.name, &matcher.project_key, cloud, prefixes),
        }),
        1 => Ok(TestReference {
            key: keys.remove(0),
            summary: scenario.name.clone(),
            tags,
        }),
        _ => Err(Error::MultipleTestTags {
            scenario: scenario.name.clone(),
            line: scenario.line,
            keys,
        }),
    }
}

fn precondition_reference(
    background: &Background,
    matcher: &ReferenceMatcher,
    cloud: bool,
    prefixes: &TagPrefixes,
) -> Result<Option<PreconditionReference>> {
    let mut keys: Vec<String> = background
        .comments
        .iter()
        .flat_map(|comment| comment.text.split_whitespace())
        .filter_map(|token| matcher.precondition_key(token))
        .map(str::to_string)
        .collect();

    match keys.len() {
        // A background without steps has nothing to import.
        0 if background.step_count == 0 => Ok(None),
        0 => Err(Error::MissingPreconditionComment {
            background: background.name.clone(),
            line: background.line,
            hint: precondition_hint(&background.name, &matcher.project_key, cloud, prefixes),
        }),
        1 => Ok(Some(PreconditionReference {
            key: keys.remove(0),
            summary: background.name.clone(),
        })),
        _ => Err(Error::MultiplePreconditionComments {
            background: background.name.clone(),
            line: background.line,
            keys,
        }),
    }
}

fn test_tag_hint(scenario: &str, project_key: &str, cloud: bool, prefixes: &TagPrefixes) -> String {
    let prefix = prefixes.test.as_deref().unwrap_or_default();
    let location = if cloud {
        "Make sure the test prefix matches the Cucumber test prefix configured in the Xray cloud project settings."
    } else {
        "Make sure the test prefix matches the Cucumber test prefix configured in the Xray server settings (Jira administration)."
    };
    format!(
        "You can target existing test issues by adding a corresponding tag:\n\n  @{prefix}{project_key}-123\n  Scenario: {scenario}\n    Given ...\n\n{location}"
    )
}

fn precondition_hint(
    background: &str,
    project_key: &str,
    cloud: bool,
    prefixes: &TagPrefixes,
) -> String {
    let prefix = prefixes.precondition.as_deref().unwrap_or_default();
    let location = if cloud {
        "Make sure the precondition prefix matches the Cucumber precondition prefix configured in the Xray cloud project settings."
    } else {
        "Make sure the precondition prefix matches the Cucumber precondition prefix configured in the Xray server settings (Jira administration)."
    };
    format!(
        "You can target existing precondition issues by adding a corresponding comment:\n\n  Background: {background}\n    #@{prefix}{project_key}-123\n    Given ...\n\n{location}"
    )
}
