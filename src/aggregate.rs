//! Version aggregation
//!
//! Folds the walk tables of one base project (one table per base version)
//! into a single mapping: repository → version branch → `AggregatedProject`.

use std::collections::BTreeMap;

use crate::domain::{AggregatedProject, VersionBranch};
use crate::walker::WalkTable;

/// Aggregated projects keyed by repository, then by version branch
pub type ProjectMap = BTreeMap<String, BTreeMap<VersionBranch, AggregatedProject>>;

/// Accumulates walk tables for one base project
#[derive(Debug, Default)]
pub struct VersionAggregator {
    projects: ProjectMap,
}

impl VersionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the table of one base version walk
    pub fn merge(&mut self, base_version: &str, table: &WalkTable) {
        for record in table.records() {
            let branches = self.projects.entry(record.repo.clone()).or_default();
            for branch in &record.branches {
                branches
                    .entry(branch.clone())
                    .and_modify(|project| {
                        project.base_versions.insert(base_version.to_string());
                    })
                    .or_insert_with(|| {
                        AggregatedProject::from_record(record, branch.clone(), base_version)
                    });
            }
        }
    }

    /// Number of (repository, branch) pairs
    pub fn pair_count(&self) -> usize {
        self.projects.values().map(BTreeMap::len).sum()
    }

    pub fn projects(&self) -> &ProjectMap {
        &self.projects
    }

    pub fn into_projects(self) -> ProjectMap {
        self.projects
    }
}
