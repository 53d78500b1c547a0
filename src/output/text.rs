//! Text output formatter for human-readable display
//!
//! This module provides:
//! - Per base project listing of reconciled pairs with their outcomes
//! - Failed pairs and recovered walk warnings
//! - Totals per outcome

use crate::domain::{BaseProjectSummary, RunSummary, SyncOutcome, SyncReport};
use crate::output::{OutputFormatter, Verbosity};
use colored::Colorize;
use std::io::Write;

/// Text formatter for human-readable output
pub struct TextFormatter {
    /// Verbosity level
    verbosity: Verbosity,
    /// Whether to use colors
    color: bool,
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            color: true,
        }
    }

    /// Create a new text formatter with explicit color setting
    pub fn with_color(verbosity: Verbosity, color: bool) -> Self {
        Self { verbosity, color }
    }

    /// Prefix shown on every heading of a check run
    fn check_prefix(&self, check: bool) -> &'static str {
        if check {
            "(check) "
        } else {
            ""
        }
    }

    /// Colorize a single outcome label
    fn outcome_label(&self, outcome: SyncOutcome) -> String {
        if !self.color {
            return outcome.label().to_string();
        }
        match outcome {
            SyncOutcome::Unchanged => outcome.label().dimmed().to_string(),
            SyncOutcome::CreatedBranch | SyncOutcome::OpenedPullRequest => {
                outcome.label().cyan().to_string()
            }
            SyncOutcome::UpdatedFile | SyncOutcome::CreatedFile => {
                outcome.label().green().to_string()
            }
            SyncOutcome::PullRequestAlreadyOpen => outcome.label().yellow().to_string(),
        }
    }

    fn format_report(&self, report: &SyncReport, writer: &mut dyn Write) -> std::io::Result<()> {
        let outcomes: Vec<String> = report
            .outcomes
            .iter()
            .map(|o| self.outcome_label(*o))
            .collect();
        let pair = format!("{}@{}", report.repo, report.branch);

        if self.color {
            let marker = if report.is_unchanged() {
                "=".dimmed()
            } else {
                "~".green()
            };
            writeln!(writer, "  {} {}  {}", marker, pair.bold(), outcomes.join(", "))
        } else {
            let marker = if report.is_unchanged() { "=" } else { "~" };
            writeln!(writer, "  {} {}  {}", marker, pair, outcomes.join(", "))
        }
    }

    fn format_totals(&self, summary: &RunSummary, writer: &mut dyn Write) -> std::io::Result<()> {
        let prefix = self.check_prefix(summary.check);
        let pairs = summary.reports().count();
        let failures = summary.failures().count();

        if self.verbosity == Verbosity::Quiet {
            // Minimal output
            let changed: usize = summary.projects.iter().map(|p| p.changed_count()).sum();
            if self.color {
                write!(writer, "{}{} changed", prefix, changed.to_string().green())?;
                if failures > 0 {
                    write!(writer, ", {} failed", failures.to_string().red())?;
                }
            } else {
                write!(writer, "{}{} changed", prefix, changed)?;
                if failures > 0 {
                    write!(writer, ", {} failed", failures)?;
                }
            }
            return writeln!(writer);
        }

        let parts: Vec<String> = summary
            .outcome_counts()
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(outcome, count)| format!("{} {}", count, self.outcome_label(outcome)))
            .collect();

        if self.color {
            writeln!(writer, "{}{}:", prefix, "Summary".bold())?;
        } else {
            writeln!(writer, "{}Summary:", prefix)?;
        }
        writeln!(
            writer,
            "  {} pair(s) reconciled on {}",
            pairs, summary.working_branch
        )?;
        if !parts.is_empty() {
            writeln!(writer, "  {}", parts.join(", "))?;
        }
        if failures > 0 {
            if self.color {
                writeln!(writer, "  {} pair(s) failed", failures.to_string().red())?;
            } else {
                writeln!(writer, "  {} pair(s) failed", failures)?;
            }
        }
        Ok(())
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, summary: &RunSummary, writer: &mut dyn Write) -> std::io::Result<()> {
        // In quiet mode, failures and totals only
        if self.verbosity != Verbosity::Quiet {
            for project in &summary.projects {
                if summary.check {
                    write!(writer, "{}", self.check_prefix(true))?;
                }
                self.format_project(project, writer)?;
            }
        } else {
            for failure in summary.failures() {
                writeln!(writer, "{}@{}: {}", failure.repo, failure.branch, failure.message)?;
            }
        }

        self.format_totals(summary, writer)
    }

    fn format_project(
        &self,
        project: &BaseProjectSummary,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        if self.color {
            writeln!(
                writer,
                "{} ({} repositories)",
                project.name.bold(),
                project.discovered
            )?;
        } else {
            writeln!(writer, "{} ({} repositories)", project.name, project.discovered)?;
        }

        let mut shown = 0;
        for report in &project.reports {
            if report.is_unchanged() && self.verbosity != Verbosity::Verbose {
                continue;
            }
            self.format_report(report, writer)?;
            shown += 1;
        }
        if shown == 0 && project.failures.is_empty() {
            if self.color {
                writeln!(writer, "  {}", "Everything up to date".dimmed())?;
            } else {
                writeln!(writer, "  Everything up to date")?;
            }
        }

        for failure in &project.failures {
            if self.color {
                writeln!(
                    writer,
                    "  {} {}@{}  {}",
                    "✗".red(),
                    failure.repo,
                    failure.branch,
                    failure.message
                )?;
            } else {
                writeln!(
                    writer,
                    "  ! {}@{}  {}",
                    failure.repo, failure.branch, failure.message
                )?;
            }
        }

        if self.verbosity == Verbosity::Verbose {
            for warning in &project.warnings {
                writeln!(
                    writer,
                    "  warning: {}@{}  {}",
                    warning.repo, warning.branch, warning.message
                )?;
            }
        }

        writeln!(writer)
    }
}
