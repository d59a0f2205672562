//! Batched retrieval of a single field for a set of issues.

use super::extract::FieldExtractor;
use crate::client::JiraClient;
use crate::domain::IssueKey;
use crate::error::{Error, FieldParseFailure, Result};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Build the JQL filter selecting exactly the given issues.
#[must_use]
pub fn issue_keys_jql(keys: &[IssueKey]) -> String {
    let keys: Vec<&str> = keys.iter().map(IssueKey::as_str).collect();
    format!("issue in ({})", keys.join(","))
}

/// Fetch the values of one field for the given issues with a single search.
///
/// Issues Jira does not return are simply absent from the result, and a search
/// that returns no data at all yields an empty map. Every returned issue is
/// inspected before failing, so the error lists all offending issues at once.
///
/// # Errors
///
/// - `Error::FieldParse` if any returned issue lacks a key or has a value the
///   extractor rejects
/// - client errors from the search request
pub async fn fetch_field_values<T>(
    client: &dyn JiraClient,
    field_id: &str,
    extractor: &FieldExtractor<T>,
    keys: &[IssueKey],
) -> Result<HashMap<IssueKey, T>> {
    let mut values = HashMap::new();
    if keys.is_empty() {
        return Ok(values);
    }

    let jql = issue_keys_jql(keys);
    debug!(field = %field_id, jql = %jql, "Searching issues");
    let Some(issues) = client.search_issues(&jql, &[field_id.to_string()]).await? else {
        debug!(field = %field_id, "Search returned no data");
        return Ok(values);
    };

    let mut failures = Vec::new();
    for issue in issues {
        let raw = issue.fields.get(field_id).cloned().unwrap_or(Value::Null);
        match (issue.key, extractor.extract(&raw)) {
            (Some(key), Some(value)) => {
                values.insert(key, value);
            }
            (key, _) => failures.push(FieldParseFailure { key, raw }),
        }
    }

    if failures.is_empty() {
        return Ok(values);
    }

    failures.sort_by(|a, b| a.key.cmp(&b.key));
    Err(Error::FieldParse {
        field_id: field_id.to_string(),
        expected: extractor.expected(),
        failures,
    })
}
