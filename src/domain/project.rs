//! Discovered project records and their per-branch aggregation

use super::VersionBranch;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

/// Known composer package types and the directory they install into
const KIND_INSTALL_DIRS: &[(ProjectKind, &str)] = &[
    (ProjectKind::DrupalModule, "web/modules/contrib"),
    (ProjectKind::DrupalProfile, "web/profiles/contrib"),
    (ProjectKind::DrupalTheme, "web/themes/contrib"),
];

/// Declared package type of a project
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProjectKind {
    /// `drupal-module`
    DrupalModule,
    /// `drupal-profile`
    DrupalProfile,
    /// `drupal-theme`
    DrupalTheme,
    /// Any other type, including an empty one
    Other(String),
}

impl ProjectKind {
    /// Parses the `type` field of a composer.json
    pub fn from_type(package_type: &str) -> Self {
        match package_type {
            "drupal-module" => ProjectKind::DrupalModule,
            "drupal-profile" => ProjectKind::DrupalProfile,
            "drupal-theme" => ProjectKind::DrupalTheme,
            other => ProjectKind::Other(other.to_string()),
        }
    }

    /// Returns the composer type string
    pub fn as_str(&self) -> &str {
        match self {
            ProjectKind::DrupalModule => "drupal-module",
            ProjectKind::DrupalProfile => "drupal-profile",
            ProjectKind::DrupalTheme => "drupal-theme",
            ProjectKind::Other(other) => other,
        }
    }

    /// Path the project is installed at inside a site build.
    ///
    /// Unknown kinds have no install path and yield an empty string.
    pub fn install_path(&self, repo: &str) -> String {
        KIND_INSTALL_DIRS
            .iter()
            .find(|(kind, _)| kind == self)
            .map(|(_, dir)| format!("{}/{}", dir, repo))
            .unwrap_or_default()
    }
}

impl Default for ProjectKind {
    fn default() -> Self {
        ProjectKind::Other(String::new())
    }
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ProjectKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A repository discovered while walking the dependency graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRecord {
    /// Repository name within the organization
    pub repo: String,
    /// Declared package name (e.g. `localgovdrupal/localgov_news`)
    pub name: String,
    /// Declared package type
    pub kind: ProjectKind,
    /// Every branch the repository was encountered at
    pub branches: BTreeSet<VersionBranch>,
}

impl ProjectRecord {
    /// Creates a record without any branches
    pub fn new(repo: impl Into<String>, name: impl Into<String>, kind: ProjectKind) -> Self {
        Self {
            repo: repo.into(),
            name: name.into(),
            kind,
            branches: BTreeSet::new(),
        }
    }

    /// Registers a branch; returns false if it was already present
    pub fn add_branch(&mut self, branch: VersionBranch) -> bool {
        self.branches.insert(branch)
    }
}

/// A project narrowed to one branch, with the base versions that require it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedProject {
    /// Repository name within the organization
    pub repo: String,
    /// Declared package name
    pub name: String,
    /// Declared package type
    pub kind: ProjectKind,
    /// The branch this entry describes
    pub branch: VersionBranch,
    /// Base project versions that pulled this branch in
    pub base_versions: BTreeSet<String>,
}

impl AggregatedProject {
    /// Narrows a record to one branch for a first base version
    pub fn from_record(
        record: &ProjectRecord,
        branch: VersionBranch,
        base_version: impl Into<String>,
    ) -> Self {
        Self {
            repo: record.repo.clone(),
            name: record.name.clone(),
            kind: record.kind.clone(),
            branch,
            base_versions: BTreeSet::from([base_version.into()]),
        }
    }

    /// Install path derived from the project kind
    pub fn install_path(&self) -> String {
        self.kind.install_path(&self.repo)
    }
}
