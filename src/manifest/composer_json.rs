//! composer.json model
//!
//! Only the fields the dependency walk needs are decoded:
//! - `name` and `type` of the package
//! - the `require` table, kept in file order
//!
//! `require-dev` is not read.

use crate::domain::{DependencyConstraint, ProjectKind};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Decoded composer.json
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComposerManifest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default, deserialize_with = "object_or_empty")]
    require: Map<String, Value>,
}

/// Composer writes an empty `require` as `[]`; treat anything but an object as empty
fn object_or_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

impl ComposerManifest {
    /// Parse composer.json content
    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Declared package name, empty when absent
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    /// Declared package type, empty when absent
    pub fn package_type(&self) -> &str {
        self.kind.as_deref().unwrap_or("")
    }

    /// Package kind parsed from `type`
    pub fn kind(&self) -> ProjectKind {
        ProjectKind::from_type(self.package_type())
    }

    /// Runtime requirements with string constraints, in file order
    pub fn requirements(&self) -> impl Iterator<Item = (&str, &str)> {
        self.require
            .iter()
            .filter_map(|(package, constraint)| Some((package.as_str(), constraint.as_str()?)))
    }

    /// Requirements owned by `organization`, as (repository, constraint).
    ///
    /// The repository is the package name with the `<organization>/` prefix
    /// stripped.
    pub fn organization_dependencies(
        &self,
        organization: &str,
    ) -> Vec<(String, DependencyConstraint)> {
        let prefix = format!("{}/", organization);
        self.requirements()
            .filter_map(|(package, constraint)| {
                package
                    .strip_prefix(&prefix)
                    .filter(|repo| !repo.is_empty())
                    .map(|repo| (repo.to_string(), DependencyConstraint::new(constraint)))
            })
            .collect()
    }
}
