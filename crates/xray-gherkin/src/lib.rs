//! Issue reference extraction for Gherkin feature files.
//!
//! Xray links Cucumber scenarios to Jira test issues through scenario tags and
//! links backgrounds to precondition issues through comments. This crate reads
//! a feature file into a light document model ([`document`]) and derives the
//! referenced issues from it ([`references`]).
//!
//! # Example
//!
//! ```
//! use xray_gherkin::{document::parse_feature, references::{extract_issue_references, TagPrefixes}};
//!
//! let text = "\
//! Feature: Login
//!
//!   @TestName:CYP-12 @smoke
//!   Scenario: Valid credentials
//!     Given a registered user
//! ";
//!
//! let document = parse_feature(text).unwrap();
//! let prefixes = TagPrefixes::new(Some("TestName:"), None);
//! let references = extract_issue_references(&document, "CYP", false, &prefixes).unwrap();
//!
//! assert_eq!(references.tests[0].key, "CYP-12");
//! assert_eq!(references.tests[0].tags, vec!["smoke".to_string()]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod document;
pub mod error;
pub mod references;

pub use error::{Error, Result};

use std::path::Path;

/// Read a feature file from disk and extract every issue reference in it.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not a valid feature file,
/// or contains scenarios or backgrounds without exactly one issue reference.
pub async fn extract_from_file(
    path: &Path,
    project_key: &str,
    cloud: bool,
    prefixes: &references::TagPrefixes,
) -> Result<references::IssueReferences> {
    let document = document::read_feature_file(path).await?;
    references::extract_issue_references(&document, project_key, cloud, prefixes)
}
