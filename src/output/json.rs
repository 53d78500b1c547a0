//! JSON output formatter for machine processing
//!
//! This module provides:
//! - JSON serialization of run summaries
//! - Totals per outcome keyed by outcome label

use crate::domain::{BaseProjectSummary, RunSummary};
use crate::output::OutputFormatter;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

/// JSON formatter for machine-readable output
#[derive(Debug, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new() -> Self {
        Self
    }
}

/// JSON representation of the full run
#[derive(Serialize)]
struct JsonOutput<'a> {
    /// Whether mutations were skipped
    check: bool,
    /// Working branch name the per-version branches derive from
    working_branch: &'a str,
    /// Per base project results
    projects: &'a [BaseProjectSummary],
    /// Run totals
    totals: JsonTotals,
}

/// JSON representation of run totals
#[derive(Serialize)]
struct JsonTotals {
    /// Reconciled pairs
    pairs: usize,
    /// Failed pairs
    failures: usize,
    /// Reports containing each outcome
    outcomes: BTreeMap<&'static str, usize>,
}

impl JsonTotals {
    fn from_summary(summary: &RunSummary) -> Self {
        Self {
            pairs: summary.reports().count(),
            failures: summary.failures().count(),
            outcomes: summary
                .outcome_counts()
                .into_iter()
                .map(|(outcome, count)| (outcome.label(), count))
                .collect(),
        }
    }
}

fn to_io_error(e: serde_json::Error) -> std::io::Error {
    std::io::Error::other(e)
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, summary: &RunSummary, writer: &mut dyn Write) -> std::io::Result<()> {
        let output = JsonOutput {
            check: summary.check,
            working_branch: &summary.working_branch,
            projects: &summary.projects,
            totals: JsonTotals::from_summary(summary),
        };
        serde_json::to_writer_pretty(&mut *writer, &output).map_err(to_io_error)?;
        writeln!(writer)
    }

    fn format_project(
        &self,
        project: &BaseProjectSummary,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        serde_json::to_writer_pretty(&mut *writer, project).map_err(to_io_error)?;
        writeln!(writer)
    }
}
