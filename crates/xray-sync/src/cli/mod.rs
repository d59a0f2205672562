//! CLI argument parsing and command dispatch.
//!
//! # Commands
//!
//! - `sync`: Synchronize feature files with Xray, restoring overwritten fields
//! - `field`: Resolve Jira field names to field ids
//! - `issues`: Show the cached metadata of issues
//!
//! # Global Flags
//!
//! - `--config`: Configuration file (default `xray-sync.yaml`)
//! - `--json`: Output in JSON format (applies to all commands)
//!
//! # Example
//!
//! ```bash
//! xray-sync sync features/login.feature features/search.feature
//! xray-sync field "Test Type"
//! xray-sync --json issues CYP-1 CYP-2
//! ```

mod args;
mod execute;
mod validators;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use args::{FieldArgs, IssuesArgs, SyncArgs};
pub use validators::{validate_feature_file, validate_field_name, validate_issue_key};

use crate::app::App;
use crate::output::OutputMode;

/// Synchronize Cucumber feature files with Jira issues through Xray
///
/// Imports feature files into Xray and restores the summaries and labels the
/// import overwrites. Credentials are read from the environment.
#[derive(Parser, Debug)]
#[command(name = "xray-sync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Synchronize feature files with Xray
    ///
    /// Imports each file and restores the summaries and labels of referenced
    /// issues that the import overwrote. Problems are reported per file.
    Sync(SyncArgs),

    /// Resolve Jira field names to field ids
    ///
    /// Useful for finding the id to configure when a field name is ambiguous.
    Field(FieldArgs),

    /// Show summary, labels, description and test type of issues
    Issues(IssuesArgs),
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing)
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// The output mode selected by the global flags
    pub fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        }
    }

    /// Execute the CLI command
    pub async fn execute(&self) -> Result<()> {
        let config_path = self.config.clone().unwrap_or_else(execute::default_config_path);
        let app = App::load(&config_path).await?;
        let output_mode = self.output_mode();

        match &self.command {
            Commands::Sync(args) => execute::execute_sync(&app, args, output_mode).await,
            Commands::Field(args) => execute::execute_field(&app, args, output_mode).await,
            Commands::Issues(args) => execute::execute_issues(&app, args, output_mode).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sync() {
        let cli = Cli::try_parse_from([
            "xray-sync",
            "sync",
            "a.feature",
            "b.feature",
            "--project-root",
            "/repo",
        ])
        .unwrap();

        match cli.command {
            Commands::Sync(args) => {
                assert_eq!(args.files, vec![PathBuf::from("a.feature"), PathBuf::from("b.feature")]);
                assert_eq!(args.project_root, Some(PathBuf::from("/repo")));
            }
            other => panic!("Expected Sync command, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["xray-sync", "issues", "CYP-1", "--json", "--config", "c.yaml"])
            .unwrap();

        assert!(cli.json);
        assert_eq!(cli.output_mode(), OutputMode::Json);
        assert_eq!(cli.config, Some(PathBuf::from("c.yaml")));
    }

    #[test]
    fn test_parse_field_names() {
        let cli = Cli::try_parse_from(["xray-sync", "field", "Test Type", "summary"]).unwrap();
        match cli.command {
            Commands::Field(args) => assert_eq!(args.names, vec!["Test Type", "summary"]),
            other => panic!("Expected Field command, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_invalid_input() {
        assert!(Cli::try_parse_from(["xray-sync", "issues", "cyp-1"]).is_err());
        assert!(Cli::try_parse_from(["xray-sync", "sync", "notes.txt"]).is_err());
        assert!(Cli::try_parse_from(["xray-sync", "sync"]).is_err());
        assert!(Cli::try_parse_from(["xray-sync"]).is_err());
    }
}
