//! Command execution logic.

use anyhow::{bail, Result};
use std::path::PathBuf;

use super::args::{FieldArgs, IssuesArgs, SyncArgs};
use crate::app::App;
use crate::domain::IssueKey;
use crate::output::{self, FieldResolution, OutputMode};

/// Execute the sync command
pub async fn execute_sync(app: &App, args: &SyncArgs, output_mode: OutputMode) -> Result<()> {
    let project_root = match &args.project_root {
        Some(root) => root.clone(),
        None => std::env::current_dir()?,
    };

    let mut reports = Vec::with_capacity(args.files.len());
    for file in &args.files {
        reports.push(app.synchronizer().synchronize(file, &project_root).await);
    }

    output::print_sync_reports(&reports, output_mode)?;
    Ok(())
}

/// Execute the field command
pub async fn execute_field(app: &App, args: &FieldArgs, output_mode: OutputMode) -> Result<()> {
    let mut resolutions = Vec::with_capacity(args.names.len());
    for name in &args.names {
        let resolution = match app.repository().resolve_field_name(name).await {
            Ok(id) => FieldResolution::Resolved {
                name: name.clone(),
                id,
            },
            Err(e) => FieldResolution::Failed {
                name: name.clone(),
                error: e.to_string(),
            },
        };
        resolutions.push(resolution);
    }

    output::print_field_resolutions(&resolutions, output_mode)?;

    let failed = resolutions
        .iter()
        .filter(|r| matches!(r, FieldResolution::Failed { .. }))
        .count();
    if failed > 0 {
        bail!("{failed} field name(s) could not be resolved");
    }
    Ok(())
}

/// Execute the issues command
pub async fn execute_issues(app: &App, args: &IssuesArgs, output_mode: OutputMode) -> Result<()> {
    let keys: Vec<IssueKey> = args.keys.iter().map(|k| IssueKey::new(k.as_str())).collect();
    let issues = app.issue_metadata(&keys).await;
    output::print_issue_metadata(&issues, output_mode)?;
    Ok(())
}

/// The configuration file used when `--config` is absent.
pub fn default_config_path() -> PathBuf {
    PathBuf::from(crate::config::DEFAULT_CONFIG_FILE)
}
