//! Remote repository gateways
//!
//! This module provides:
//! - The `RepositoryGateway` trait the walker and reconciler talk to
//! - HTTP client shared foundation with retry logic
//! - GitHub REST API gateway
//! - In-memory gateway for tests and simulations

mod client;
mod github;
mod memory;

pub use client::{HttpClient, DEFAULT_API_URL};
pub use github::GitHubGateway;
pub use memory::{InMemoryGateway, Mutation};

use crate::error::GatewayError;
use async_trait::async_trait;
use serde::Serialize;

/// A file read from a remote repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Decoded file contents
    pub content: String,
    /// Blob sha, required to update the file
    pub sha: String,
}

/// A file write on a branch
#[derive(Debug, Clone, Copy)]
pub struct FileWrite<'a> {
    /// Path inside the repository
    pub path: &'a str,
    /// New file contents
    pub content: &'a str,
    /// Commit message
    pub message: &'a str,
    /// Branch to commit on
    pub branch: &'a str,
}

/// An open pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequest {
    /// Pull request number
    pub number: u64,
    /// Branch the changes come from
    pub head: String,
    /// Branch the changes merge into
    pub base: String,
    /// Web URL
    pub url: String,
}

/// Parameters for opening a pull request
#[derive(Debug, Clone, Copy)]
pub struct NewPullRequest<'a> {
    /// Branch to merge into
    pub base: &'a str,
    /// Branch to be merged
    pub head: &'a str,
    /// Title
    pub title: &'a str,
    /// Body
    pub body: &'a str,
}

/// Read and write access to the organization's repositories.
///
/// Every `repo` argument is a repository name within the organization the
/// gateway was created for. Absence is reported as `GatewayError::NotFound`.
#[async_trait]
pub trait RepositoryGateway: Send + Sync {
    /// Read a file at a branch or commit reference
    async fn get_file(&self, repo: &str, path: &str, git_ref: &str)
        -> Result<RemoteFile, GatewayError>;

    /// Resolve a branch to its head commit sha
    async fn get_branch_head(&self, repo: &str, branch: &str) -> Result<String, GatewayError>;

    /// Create a branch pointing at a commit
    async fn create_branch(&self, repo: &str, branch: &str, sha: &str)
        -> Result<(), GatewayError>;

    /// Create a new file on a branch
    async fn create_file(&self, repo: &str, write: FileWrite<'_>) -> Result<(), GatewayError>;

    /// Replace an existing file on a branch; `sha` is the current blob sha
    async fn update_file(
        &self,
        repo: &str,
        write: FileWrite<'_>,
        sha: &str,
    ) -> Result<(), GatewayError>;

    /// List open pull requests from `head` into `base`
    async fn list_open_pull_requests(
        &self,
        repo: &str,
        base: &str,
        head: &str,
    ) -> Result<Vec<PullRequest>, GatewayError>;

    /// Open a pull request
    async fn create_pull_request(
        &self,
        repo: &str,
        pull_request: NewPullRequest<'_>,
    ) -> Result<PullRequest, GatewayError>;
}
