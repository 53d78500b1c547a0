//! Dependency manifest fetching
//!
//! This module provides functionality to:
//! - Read `composer.json` from a repository at a branch through the gateway
//! - Decode it into a `ComposerManifest`
//! - List the organization-owned requirements it declares

mod composer_json;

pub use composer_json::ComposerManifest;

use crate::error::ManifestError;
use crate::gateway::RepositoryGateway;

/// Path of the manifest inside every repository
pub const MANIFEST_PATH: &str = "composer.json";

/// Fetch and decode the manifest of `repo` at `branch`.
///
/// A missing file or branch yields `ManifestError::NotFound`; any other
/// gateway failure is `ManifestError::Transport`. No retries happen here.
pub async fn fetch_manifest(
    gateway: &dyn RepositoryGateway,
    repo: &str,
    branch: &str,
) -> Result<ComposerManifest, ManifestError> {
    let file = gateway
        .get_file(repo, MANIFEST_PATH, branch)
        .await
        .map_err(|e| ManifestError::from_gateway(repo, branch, e))?;

    ComposerManifest::parse(&file.content).map_err(|e| ManifestError::Parse {
        repo: repo.to_string(),
        branch: branch.to_string(),
        message: e.to_string(),
    })
}
