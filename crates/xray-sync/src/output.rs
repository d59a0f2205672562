//! Output formatting for CLI commands.
//!
//! Every command prints either human-readable text or pretty JSON for
//! programmatic use.

use crate::app::IssueMetadata;
use crate::sync::{SyncOutcome, SyncReport};
use colored::Colorize;
use serde::Serialize;
use std::io::{self, Write};

/// Output format mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text format
    Text,
    /// JSON format for programmatic use
    Json,
}

/// The outcome of resolving one field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldResolution {
    /// The name resolved to an id.
    Resolved {
        /// The requested name.
        name: String,
        /// The field id.
        id: String,
    },
    /// The name could not be resolved.
    Failed {
        /// The requested name.
        name: String,
        /// Why resolution failed.
        error: String,
    },
}

/// Print a JSON-formatted result for any serializable value
pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(handle, "{json}")
}

/// Print synchronization reports in the specified format
pub fn print_sync_reports(reports: &[SyncReport], mode: OutputMode) -> io::Result<()> {
    match mode {
        OutputMode::Json => print_json(&reports),
        OutputMode::Text => write_sync_reports(&mut io::stdout().lock(), reports),
    }
}

/// Print field resolutions in the specified format
pub fn print_field_resolutions(resolutions: &[FieldResolution], mode: OutputMode) -> io::Result<()> {
    match mode {
        OutputMode::Json => print_json(&resolutions),
        OutputMode::Text => write_field_resolutions(&mut io::stdout().lock(), resolutions),
    }
}

/// Print issue metadata in the specified format
pub fn print_issue_metadata(issues: &[IssueMetadata], mode: OutputMode) -> io::Result<()> {
    match mode {
        OutputMode::Json => print_json(&issues),
        OutputMode::Text => write_issue_metadata(&mut io::stdout().lock(), issues),
    }
}

// ============================================================================
// Text Formatting
// ============================================================================

fn write_sync_reports<W: Write>(w: &mut W, reports: &[SyncReport]) -> io::Result<()> {
    for report in reports {
        let file = report.file.display().to_string();
        match &report.outcome {
            SyncOutcome::Aborted { reason } => {
                writeln!(w, "{} {}", "✗".red(), file.bold())?;
                for line in reason.lines() {
                    writeln!(w, "    {line}")?;
                }
                continue;
            }
            SyncOutcome::Completed if report.problems.is_empty() => {
                writeln!(w, "{} {}", "✓".green(), file.bold())?;
            }
            SyncOutcome::Completed => {
                writeln!(w, "{} {}", "!".yellow(), file.bold())?;
            }
        }

        for restored in &report.restored {
            writeln!(
                w,
                "  {} {} {} to {}",
                "restored".dimmed(),
                restored.key.as_str().cyan(),
                restored.field,
                restored.value
            )?;
        }
        for problem in &report.problems {
            let description = problem.description();
            let mut lines = description.lines();
            if let Some(first) = lines.next() {
                writeln!(w, "  {} {first}", "warning:".yellow())?;
            }
            for line in lines {
                writeln!(w, "    {line}")?;
            }
        }
    }

    let completed = reports.iter().filter(|r| r.is_completed()).count();
    writeln!(w)?;
    writeln!(
        w,
        "Synchronized {completed} of {} feature file(s)",
        reports.len()
    )
}

fn write_field_resolutions<W: Write>(w: &mut W, resolutions: &[FieldResolution]) -> io::Result<()> {
    for resolution in resolutions {
        match resolution {
            FieldResolution::Resolved { name, id } => {
                writeln!(w, "{} {name}: {}", "✓".green(), id.cyan())?;
            }
            FieldResolution::Failed { name, error } => {
                writeln!(w, "{} {name}", "✗".red())?;
                for line in error.lines() {
                    writeln!(w, "    {line}")?;
                }
            }
        }
    }
    Ok(())
}

fn write_issue_metadata<W: Write>(w: &mut W, issues: &[IssueMetadata]) -> io::Result<()> {
    let unknown = "<unknown>".dimmed().to_string();
    for (index, issue) in issues.iter().enumerate() {
        if index > 0 {
            writeln!(w)?;
        }
        writeln!(
            w,
            "{}: {}",
            issue.key.as_str().cyan(),
            issue.summary.as_deref().unwrap_or(&unknown)
        )?;
        let labels = issue
            .labels
            .as_ref()
            .map_or_else(|| unknown.clone(), |labels| labels.join(", ").magenta().to_string());
        writeln!(w, "  {} {labels}", "Labels:".dimmed())?;
        writeln!(
            w,
            "  {} {}",
            "Test type:".dimmed(),
            issue.test_type.as_deref().unwrap_or(&unknown)
        )?;
        match issue.description.as_deref() {
            None => writeln!(w, "  {} {unknown}", "Description:".dimmed())?,
            Some("") => {}
            Some(description) => {
                writeln!(w, "  {}", "Description:".dimmed())?;
                for line in description.lines() {
                    writeln!(w, "    {line}")?;
                }
            }
        }
    }
    Ok(())
}
