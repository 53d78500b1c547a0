//! Reconciliation outcome types

use super::VersionBranch;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A decision taken while reconciling one (repository, branch) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncOutcome {
    /// Remote workflow already matches the rendered one
    Unchanged,
    /// Working branch was created from the version branch
    CreatedBranch,
    /// Existing workflow file on the working branch was updated
    UpdatedFile,
    /// Workflow file was created on the working branch
    CreatedFile,
    /// A pull request into the version branch was opened
    OpenedPullRequest,
    /// A pull request between the same refs was already open
    PullRequestAlreadyOpen,
}

impl SyncOutcome {
    /// Every outcome, in reconciliation step order
    pub const ALL: [SyncOutcome; 6] = [
        SyncOutcome::Unchanged,
        SyncOutcome::CreatedBranch,
        SyncOutcome::UpdatedFile,
        SyncOutcome::CreatedFile,
        SyncOutcome::OpenedPullRequest,
        SyncOutcome::PullRequestAlreadyOpen,
    ];

    /// Returns the kebab-case label
    pub fn label(&self) -> &'static str {
        match self {
            SyncOutcome::Unchanged => "unchanged",
            SyncOutcome::CreatedBranch => "created-branch",
            SyncOutcome::UpdatedFile => "updated-file",
            SyncOutcome::CreatedFile => "created-file",
            SyncOutcome::OpenedPullRequest => "opened-pull-request",
            SyncOutcome::PullRequestAlreadyOpen => "pull-request-already-open",
        }
    }

    /// Returns true if this outcome corresponds to a remote mutation
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            SyncOutcome::CreatedBranch
                | SyncOutcome::UpdatedFile
                | SyncOutcome::CreatedFile
                | SyncOutcome::OpenedPullRequest
        )
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ordered outcomes of reconciling one (repository, branch) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Repository name
    pub repo: String,
    /// Version branch the workflow targets
    pub branch: VersionBranch,
    /// Outcomes in the order they were decided
    pub outcomes: Vec<SyncOutcome>,
}

impl SyncReport {
    /// Creates an empty report
    pub fn new(repo: impl Into<String>, branch: VersionBranch) -> Self {
        Self {
            repo: repo.into(),
            branch,
            outcomes: Vec::new(),
        }
    }

    /// Appends an outcome
    pub fn record(&mut self, outcome: SyncOutcome) {
        self.outcomes.push(outcome);
    }

    /// Returns true if the report contains the outcome
    pub fn has(&self, outcome: SyncOutcome) -> bool {
        self.outcomes.contains(&outcome)
    }

    /// Returns true if nothing needed to change
    pub fn is_unchanged(&self) -> bool {
        self.outcomes == [SyncOutcome::Unchanged]
    }

    /// Number of mutating outcomes
    pub fn mutation_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_mutation()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(SyncOutcome::Unchanged.to_string(), "unchanged");
        assert_eq!(SyncOutcome::CreatedBranch.to_string(), "created-branch");
        assert_eq!(
            SyncOutcome::PullRequestAlreadyOpen.to_string(),
            "pull-request-already-open"
        );
    }

    #[test]
    fn test_outcome_serde_matches_label() {
        let json = serde_json::to_string(&SyncOutcome::OpenedPullRequest).unwrap();
        assert_eq!(json, "\"opened-pull-request\"");
        let parsed: SyncOutcome = serde_json::from_str("\"updated-file\"").unwrap();
        assert_eq!(parsed, SyncOutcome::UpdatedFile);
    }

    #[test]
    fn test_is_mutation() {
        assert!(!SyncOutcome::Unchanged.is_mutation());
        assert!(!SyncOutcome::PullRequestAlreadyOpen.is_mutation());
        assert!(SyncOutcome::CreatedFile.is_mutation());
    }

    #[test]
    fn test_report_helpers() {
        let mut report = SyncReport::new("q", VersionBranch::new(1));
        report.record(SyncOutcome::CreatedBranch);
        report.record(SyncOutcome::CreatedFile);
        report.record(SyncOutcome::PullRequestAlreadyOpen);
        assert!(report.has(SyncOutcome::CreatedFile));
        assert!(!report.is_unchanged());
        assert_eq!(report.mutation_count(), 2);

        let mut unchanged = SyncReport::new("q", VersionBranch::new(1));
        unchanged.record(SyncOutcome::Unchanged);
        assert!(unchanged.is_unchanged());
    }
}
