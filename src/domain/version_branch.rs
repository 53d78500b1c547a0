//! Dependency constraints and version branches

use serde::{Serialize, Serializer};
use std::fmt;

/// Suffix appended to the major version to form a branch name
const BRANCH_SUFFIX: &str = ".x";

/// A raw version constraint as declared in a manifest (e.g. `^2.1`, `~3.0`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DependencyConstraint(String);

impl DependencyConstraint {
    /// Creates a new constraint from its raw text
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the raw constraint text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Maps this constraint to the branch it is developed on
    pub fn to_branch(&self) -> VersionBranch {
        VersionBranch::from_constraint(self.as_str())
    }
}

impl fmt::Display for DependencyConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A branch name, normally of the form `<major>.x`
///
/// Ordered numerically by leading major version so `2.x` sorts before
/// `10.x`; names without a leading number sort first, by text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionBranch {
    name: String,
}

impl VersionBranch {
    /// Creates the branch for a major version
    pub fn new(major: u64) -> Self {
        Self {
            name: format!("{}{}", major, BRANCH_SUFFIX),
        }
    }

    /// Wraps an existing branch name (e.g. a configured base version)
    pub fn from_name(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Derives a branch from a constraint string.
    ///
    /// Caret and tilde operators are removed, then the leading integer is
    /// taken; a constraint without one maps to `0.x`.
    ///
    /// ```
    /// use workflow_sync::domain::VersionBranch;
    ///
    /// assert_eq!(VersionBranch::from_constraint("^2.1").as_str(), "2.x");
    /// assert_eq!(VersionBranch::from_constraint("~3.0").as_str(), "3.x");
    /// ```
    pub fn from_constraint(constraint: &str) -> Self {
        let stripped: String = constraint
            .chars()
            .filter(|c| *c != '^' && *c != '~')
            .collect();
        // A leading `v` or `=` is skipped, so `v4.0` maps to `4.x` rather than `0.x`
        let rest = stripped
            .trim_start()
            .trim_start_matches(&['=', 'v'][..]);
        Self::new(leading_integer(rest).unwrap_or(0))
    }

    /// Returns the branch name
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Returns the leading major version, if the name starts with one
    pub fn major(&self) -> Option<u64> {
        leading_integer(&self.name)
    }
}

fn leading_integer(s: &str) -> Option<u64> {
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

impl Ord for VersionBranch {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.major()
            .cmp(&other.major())
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for VersionBranch {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Serialize for VersionBranch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}
