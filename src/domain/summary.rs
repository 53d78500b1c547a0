//! Run summary types
//!
//! Provides structures for tracking results per base project and overall.

use super::{SyncOutcome, SyncReport};
use serde::Serialize;

/// A manifest that could not be read for a reason other than absence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalkWarning {
    /// Repository whose manifest failed
    pub repo: String,
    /// Branch it was requested at
    pub branch: String,
    /// Error description
    pub message: String,
}

/// A (repository, branch) pair whose reconciliation failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairFailure {
    /// Repository name
    pub repo: String,
    /// Version branch
    pub branch: String,
    /// Error description
    pub message: String,
}

/// Results for one base project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BaseProjectSummary {
    /// Base project name
    pub name: String,
    /// Repositories discovered across every base version
    pub discovered: usize,
    /// Reconciled pairs
    pub reports: Vec<SyncReport>,
    /// Failed pairs
    pub failures: Vec<PairFailure>,
    /// Recovered walk failures
    pub warnings: Vec<WalkWarning>,
}

impl BaseProjectSummary {
    /// Creates an empty summary
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            discovered: 0,
            reports: Vec::new(),
            failures: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Returns the number of pairs that needed a change
    pub fn changed_count(&self) -> usize {
        self.reports.iter().filter(|r| !r.is_unchanged()).count()
    }
}

/// Summary of a whole run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Whether mutations were skipped
    pub check: bool,
    /// Configured working branch name; each version branch gets its own derivation
    pub working_branch: String,
    /// Per base project results
    pub projects: Vec<BaseProjectSummary>,
}

impl RunSummary {
    /// Creates an empty summary
    pub fn new(check: bool, working_branch: impl Into<String>) -> Self {
        Self {
            check,
            working_branch: working_branch.into(),
            projects: Vec::new(),
        }
    }

    /// Adds a base project summary
    pub fn add_project(&mut self, project: BaseProjectSummary) {
        self.projects.push(project);
    }

    /// Returns all reports
    pub fn reports(&self) -> impl Iterator<Item = &SyncReport> {
        self.projects.iter().flat_map(|p| p.reports.iter())
    }

    /// Returns all failures
    pub fn failures(&self) -> impl Iterator<Item = &PairFailure> {
        self.projects.iter().flat_map(|p| p.failures.iter())
    }

    /// Returns all walk warnings
    pub fn warnings(&self) -> impl Iterator<Item = &WalkWarning> {
        self.projects.iter().flat_map(|p| p.warnings.iter())
    }

    /// Returns true if any pair failed
    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    /// Number of reports containing each outcome, in step order
    pub fn outcome_counts(&self) -> Vec<(SyncOutcome, usize)> {
        SyncOutcome::ALL
            .iter()
            .map(|outcome| (*outcome, self.reports().filter(|r| r.has(*outcome)).count()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VersionBranch;

    fn report(repo: &str, outcomes: &[SyncOutcome]) -> SyncReport {
        let mut report = SyncReport::new(repo, VersionBranch::new(1));
        for outcome in outcomes {
            report.record(*outcome);
        }
        report
    }

    #[test]
    fn test_changed_count() {
        let mut project = BaseProjectSummary::new("p");
        project.reports.push(report("a", &[SyncOutcome::Unchanged]));
        project.reports.push(report(
            "b",
            &[SyncOutcome::CreatedBranch, SyncOutcome::CreatedFile],
        ));
        assert_eq!(project.changed_count(), 1);
    }

    #[test]
    fn test_outcome_counts() {
        let mut project = BaseProjectSummary::new("p");
        project.reports.push(report("a", &[SyncOutcome::Unchanged]));
        project.reports.push(report(
            "b",
            &[SyncOutcome::UpdatedFile, SyncOutcome::PullRequestAlreadyOpen],
        ));
        let mut summary = RunSummary::new(false, "work");
        summary.add_project(project);

        let counts = summary.outcome_counts();
        assert_eq!(counts.len(), SyncOutcome::ALL.len());
        assert_eq!(counts[0], (SyncOutcome::Unchanged, 1));
        assert_eq!(counts[2], (SyncOutcome::UpdatedFile, 1));
        assert_eq!(counts[3], (SyncOutcome::CreatedFile, 0));
    }

    #[test]
    fn test_has_failures() {
        let mut summary = RunSummary::new(true, "work");
        summary.add_project(BaseProjectSummary::new("p"));
        assert!(!summary.has_failures());

        let mut failed = BaseProjectSummary::new("q");
        failed.failures.push(PairFailure {
            repo: "x".to_string(),
            branch: "1.x".to_string(),
            message: "boom".to_string(),
        });
        summary.add_project(failed);
        assert!(summary.has_failures());
        assert_eq!(summary.failures().count(), 1);
    }
}
