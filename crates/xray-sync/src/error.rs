//! Error types for xray-sync operations.
//!
//! Field errors render multi-line diagnostics naming the field, the affected
//! issues and a remediation hint, since they end up in logs that operators
//! read without further context.

use crate::domain::{FieldDescriptor, IssueKey};
use serde_json::Value;
use std::fmt::Write;
use std::io;
use thiserror::Error;

/// The error type for xray-sync operations.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The HTTP request could not be sent or its response not read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Request to {url} failed with status {status}: {body}")]
    Api {
        /// The requested URL.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// The response body, for diagnostics.
        body: String,
    },

    /// Credentials are missing or were rejected.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The feature file could not be parsed or lacks issue references.
    #[error("Feature file error: {0}")]
    FeatureFile(#[from] xray_gherkin::Error),

    /// No field has the requested name.
    #[error("{}", unknown_field_message(.name, .known))]
    UnknownField {
        /// The requested field name.
        name: String,
        /// Every known field as (name, id), for diagnostics.
        known: Vec<(String, String)>,
    },

    /// More than one field has the requested name.
    #[error("{}", ambiguous_field_message(.name, .duplicates))]
    AmbiguousField {
        /// The requested field name.
        name: String,
        /// All fields sharing the name.
        duplicates: Vec<FieldDescriptor>,
    },

    /// The field list could not be retrieved at all.
    #[error("Failed to fetch Jira field list: {reason}")]
    FieldFetch {
        /// Why the list is unavailable.
        reason: String,
    },

    /// One or more issues returned values of an unexpected shape.
    #[error("{}", field_parse_message(.field_id, .expected, .failures))]
    FieldParse {
        /// The field whose values were fetched.
        field_id: String,
        /// The expected value shape, e.g. "a string".
        expected: &'static str,
        /// Every offending issue, sorted by key.
        failures: Vec<FieldParseFailure>,
    },
}

/// A single issue whose field value could not be interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldParseFailure {
    /// The issue key, absent if Jira returned an issue without one.
    pub key: Option<IssueKey>,
    /// The raw field value.
    pub raw: Value,
}

/// A specialized Result type for xray-sync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The configuration key suggested for a field name, e.g. "test-type".
pub(crate) fn config_key_for(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "-")
}

fn unknown_field_message(name: &str, known: &[(String, String)]) -> String {
    let mut message = format!(
        "Failed to find Jira field ID for field with name: {name}\n\
         Make sure the field actually exists and that your user has access to it."
    );
    if known.is_empty() {
        message.push_str("\n\nJira did not return any fields.");
        return message;
    }

    let mut sorted: Vec<&(String, String)> = known.iter().collect();
    sorted.sort();
    let width = sorted.iter().map(|(n, _)| n.len()).max().unwrap_or(0);
    message.push_str("\n\nAvailable fields:");
    for (field_name, id) in sorted {
        let _ = write!(message, "\n  name: {field_name:<width$}  id: {id}");
    }
    message
}

fn ambiguous_field_message(name: &str, duplicates: &[FieldDescriptor]) -> String {
    let mut message = format!(
        "Failed to find a unique Jira field ID for field with name: {name}\n\
         There are multiple fields with this name:\n"
    );
    for field in duplicates {
        let _ = write!(
            message,
            "\n  id: {}  name: {}  custom: {}  clause names: {}",
            field.id,
            field.name,
            field.custom,
            field.clause_names.join(", ")
        );
    }
    let example = duplicates.first().map_or("customfield_12345", |f| f.id.as_str());
    let _ = write!(
        message,
        "\n\nConfigure the field ID explicitly in the configuration file:\n\n  \
         jira:\n    fields:\n      {}: {example}",
        config_key_for(name)
    );
    message
}

fn field_parse_message(field_id: &str, expected: &str, failures: &[FieldParseFailure]) -> String {
    let mut message = format!(
        "Failed to parse values of field {field_id} (expected {expected}) for issues:\n"
    );
    for failure in failures {
        let key = failure
            .key
            .as_ref()
            .map_or("<issue without key>", IssueKey::as_str);
        let _ = write!(message, "\n  {key}: {}", failure.raw);
    }
    message
}
