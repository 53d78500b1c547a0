//! Dependency graph walker
//!
//! Discovers every organization-owned package reachable from a root
//! (repository, branch) pair by following `composer.json` requirements.
//!
//! The walk is depth-first over an explicit stack. Children are pushed in
//! reverse so they are visited in declaration order, and the revisit guard is
//! evaluated when an entry is popped, after every earlier sibling's subtree has
//! been explored.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{ProjectRecord, VersionBranch, WalkWarning};
use crate::error::ManifestError;
use crate::gateway::RepositoryGateway;
use crate::manifest::fetch_manifest;

/// What to do when a recorded repository is required again at another branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RevisitPolicy {
    /// Register the new branch on the record without walking it
    #[default]
    FirstSeen,
    /// Walk the new branch too; it is registered only if its manifest exists
    ExploreNewBranches,
}

impl RevisitPolicy {
    /// Policy selected by the `explore_new_branches` switch
    pub fn from_flag(explore_new_branches: bool) -> Self {
        if explore_new_branches {
            RevisitPolicy::ExploreNewBranches
        } else {
            RevisitPolicy::FirstSeen
        }
    }
}

/// Repositories discovered by one walk, keyed by repository name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkTable {
    records: BTreeMap<String, ProjectRecord>,
}

impl WalkTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, repo: &str) -> Option<&ProjectRecord> {
        self.records.get(repo)
    }

    pub fn contains(&self, repo: &str) -> bool {
        self.records.contains_key(repo)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in repository name order
    pub fn records(&self) -> impl Iterator<Item = &ProjectRecord> {
        self.records.values()
    }

    /// Repository names in name order
    pub fn repos(&self) -> Vec<&str> {
        self.records.keys().map(String::as_str).collect()
    }

    /// Insert or replace a record
    pub fn insert(&mut self, record: ProjectRecord) {
        self.records.insert(record.repo.clone(), record);
    }

    fn record_mut(&mut self, repo: &str) -> Option<&mut ProjectRecord> {
        self.records.get_mut(repo)
    }

    fn upsert(&mut self, record: ProjectRecord, branch: VersionBranch) {
        let entry = self
            .records
            .entry(record.repo.clone())
            .or_insert_with(|| record.clone());
        entry.name = record.name;
        entry.kind = record.kind;
        entry.add_branch(branch);
    }
}

/// Counters and warnings of one walk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WalkStats {
    /// Manifests requested from the gateway
    pub fetched: usize,
    /// Requested manifests that did not exist
    pub missing: usize,
    /// Recovered failures; their subtrees were not explored
    pub warnings: Vec<WalkWarning>,
}

/// Walks `composer.json` requirements within one organization
pub struct DependencyWalker<'a> {
    gateway: &'a dyn RepositoryGateway,
    organization: String,
    policy: RevisitPolicy,
}

impl<'a> DependencyWalker<'a> {
    /// Create a walker with the `FirstSeen` policy
    pub fn new(gateway: &'a dyn RepositoryGateway, organization: impl Into<String>) -> Self {
        Self {
            gateway,
            organization: organization.into(),
            policy: RevisitPolicy::default(),
        }
    }

    /// Set the revisit policy (builder pattern)
    pub fn with_policy(mut self, policy: RevisitPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RevisitPolicy {
        self.policy
    }

    /// Walk from `repo` at `branch`, merging discoveries into `table`.
    ///
    /// A missing manifest ends that branch of the graph and other failures
    /// are logged and returned in the stats. Only rejected credentials abort
    /// the walk.
    pub async fn walk(
        &self,
        repo: &str,
        branch: VersionBranch,
        table: &mut WalkTable,
    ) -> Result<WalkStats, ManifestError> {
        let mut stats = WalkStats::default();
        let mut visited: HashSet<(String, VersionBranch)> = HashSet::new();
        let mut stack = vec![(repo.to_string(), branch)];

        while let Some((repo, branch)) = stack.pop() {
            match self.policy {
                RevisitPolicy::FirstSeen => {
                    if let Some(record) = table.record_mut(&repo) {
                        if record.add_branch(branch.clone()) {
                            debug!("Registered {} at {} without walking it", repo, branch);
                        }
                        continue;
                    }
                }
                RevisitPolicy::ExploreNewBranches => {
                    if !visited.insert((repo.clone(), branch.clone())) {
                        continue;
                    }
                }
            }

            stats.fetched += 1;
            let manifest = match fetch_manifest(self.gateway, &repo, branch.as_str()).await {
                Ok(manifest) => manifest,
                Err(ManifestError::NotFound { .. }) => {
                    debug!("No composer.json in {} at {}", repo, branch);
                    stats.missing += 1;
                    continue;
                }
                Err(e) if e.is_auth_failure() => return Err(e),
                Err(e) => {
                    warn!("{}", e);
                    stats.warnings.push(WalkWarning {
                        repo: repo.clone(),
                        branch: branch.to_string(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            table.upsert(
                ProjectRecord::new(repo.as_str(), manifest.name(), manifest.kind()),
                branch,
            );
            info!("Found {}", repo);

            let children = manifest.organization_dependencies(&self.organization);
            for (dependency, constraint) in children.into_iter().rev() {
                stack.push((dependency, constraint.to_branch()));
            }
        }

        Ok(stats)
    }
}
