//! CLI argument structs for all commands.

use clap::Parser;
use std::path::PathBuf;

use super::validators::{validate_feature_file, validate_field_name, validate_issue_key};

/// Arguments for the `sync` command
#[derive(Parser, Debug, Clone)]
pub struct SyncArgs {
    /// Feature files to synchronize
    ///
    /// Relative paths are resolved against the project root.
    #[arg(required = true, value_parser = validate_feature_file)]
    pub files: Vec<PathBuf>,

    /// Project root the feature file paths are relative to
    ///
    /// Defaults to the current directory.
    #[arg(long)]
    pub project_root: Option<PathBuf>,
}

/// Arguments for the `field` command
#[derive(Parser, Debug, Clone)]
pub struct FieldArgs {
    /// Field names to resolve, e.g. "Test Type"
    #[arg(required = true, value_parser = validate_field_name)]
    pub names: Vec<String>,
}

/// Arguments for the `issues` command
#[derive(Parser, Debug, Clone)]
pub struct IssuesArgs {
    /// Issue keys, e.g. CYP-123
    #[arg(required = true, value_parser = validate_issue_key)]
    pub keys: Vec<String>,
}
