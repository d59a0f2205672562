//! File-based extraction tests.

use std::path::PathBuf;
use tempfile::TempDir;
use xray_gherkin::references::TagPrefixes;
use xray_gherkin::{extract_from_file, Error};

fn write_feature(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn test_extract_from_file() {
    let dir = TempDir::new().unwrap();
    let path = write_feature(
        &dir,
        "search.feature",
        "\
# language: en
@epic
Feature: Search

  Background: Index populated
    #@CYP-300
    Given the search index contains 10 documents

  @CYP-301 @fast
  Scenario: Exact match
    When the user searches for \"rust\"
    Then 1 result is shown
",
    );

    let references = extract_from_file(&path, "CYP", true, &TagPrefixes::default())
        .await
        .unwrap();

    assert_eq!(references.preconditions.len(), 1);
    assert_eq!(references.preconditions[0].key, "CYP-300");
    assert_eq!(references.preconditions[0].summary, "Index populated");
    assert_eq!(references.tests.len(), 1);
    assert_eq!(references.tests[0].key, "CYP-301");
    assert_eq!(references.tests[0].summary, "Exact match");
    assert_eq!(references.tests[0].tags, vec!["fast"]);
}

#[tokio::test]
async fn test_commented_out_scenario_after_background_is_ignored() {
    let dir = TempDir::new().unwrap();
    let path = write_feature(
        &dir,
        "disabled.feature",
        "\
Feature: Disabled scenarios
  Background: b
    #@CYP-1
    Given x

    #@CYP-2
    #Scenario: disabled

  @CYP-3
  Scenario: s
    Given y
",
    );

    let references = extract_from_file(&path, "CYP", false, &TagPrefixes::default())
        .await
        .unwrap();

    assert_eq!(references.preconditions.len(), 1);
    assert_eq!(references.preconditions[0].key, "CYP-1");
    assert_eq!(references.tests.len(), 1);
    assert_eq!(references.tests[0].key, "CYP-3");
}

#[tokio::test]
async fn test_extract_from_missing_file() {
    let dir = TempDir::new().unwrap();
    let result = extract_from_file(
        &dir.path().join("missing.feature"),
        "CYP",
        false,
        &TagPrefixes::default(),
    )
    .await;

    assert!(matches!(result, Err(Error::Io(_))));
}

#[tokio::test]
async fn test_extract_from_file_reports_untagged_scenario() {
    let dir = TempDir::new().unwrap();
    let path = write_feature(
        &dir,
        "untagged.feature",
        "Feature: Untagged\n\n  Scenario: Forgotten\n    Given nothing\n",
    );

    let error = extract_from_file(&path, "CYP", false, &TagPrefixes::default())
        .await
        .unwrap_err();

    let message = error.to_string();
    assert!(message.contains("Forgotten"), "unexpected message: {message}");
    assert!(message.contains("@CYP-123"), "unexpected message: {message}");
}
