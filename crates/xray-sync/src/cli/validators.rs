//! CLI input validation functions.
//!
//! These validators are used by clap's `value_parser` attribute to validate
//! user input at parse time.

use std::path::PathBuf;
use xray_gherkin::references::is_valid_project_key;

/// Validate a Jira issue key such as `CYP-123`.
pub fn validate_issue_key(s: &str) -> Result<String, String> {
    let s = s.trim();
    let Some((project, number)) = s.rsplit_once('-') else {
        return Err(format!(
            "Invalid issue key '{s}'. Expected format: PROJECT-NUMBER (e.g., CYP-123)"
        ));
    };
    if !is_valid_project_key(project) {
        return Err(format!(
            "Invalid project key '{project}' in issue key '{s}': expected uppercase letters, digits or underscores"
        ));
    }
    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("Invalid issue number '{number}' in issue key '{s}'"));
    }
    Ok(s.to_string())
}

/// Validate a field name, which must not be blank.
pub fn validate_field_name(s: &str) -> Result<String, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err("Field name cannot be empty".to_string());
    }
    Ok(trimmed.to_string())
}

/// Validate a feature file path by its extension.
pub fn validate_feature_file(s: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(s);
    if path.extension().is_some_and(|ext| ext == "feature") {
        Ok(path)
    } else {
        Err(format!("'{s}' is not a feature file (expected a .feature extension)"))
    }
}
