//! In-memory repository gateway
//!
//! Holds branches, files and pull requests for a set of repositories behind a
//! `Mutex`, and records every mutating call so tests can assert on side
//! effects (or their absence in check mode).

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::gateway::{FileWrite, NewPullRequest, PullRequest, RemoteFile, RepositoryGateway};

/// A mutating call issued against the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// `create_branch`
    CreateBranch { repo: String, branch: String },
    /// `create_file`
    CreateFile {
        repo: String,
        branch: String,
        path: String,
    },
    /// `update_file`
    UpdateFile {
        repo: String,
        branch: String,
        path: String,
    },
    /// `create_pull_request`
    CreatePullRequest {
        repo: String,
        base: String,
        head: String,
    },
}

type Tree = BTreeMap<String, RemoteFile>;

#[derive(Debug, Default)]
struct RepoState {
    /// branch -> head commit
    branches: BTreeMap<String, String>,
    /// commit -> file tree
    commits: BTreeMap<String, Tree>,
    pull_requests: Vec<PullRequest>,
}

#[derive(Debug, Default)]
struct State {
    repos: BTreeMap<String, RepoState>,
    mutations: Vec<Mutation>,
    /// (repo, path) -> error returned by get_file
    read_failures: BTreeMap<(String, String), GatewayError>,
    /// repo -> error returned by file writes
    write_failures: BTreeMap<String, GatewayError>,
    next_id: u64,
}

impl State {
    fn next_sha(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}{:08x}", prefix, self.next_id)
    }

    fn repo(&self, repo: &str) -> Result<&RepoState, GatewayError> {
        self.repos
            .get(repo)
            .ok_or_else(|| GatewayError::not_found(format!("repository {}", repo)))
    }

    fn repo_mut(&mut self, repo: &str) -> Result<&mut RepoState, GatewayError> {
        self.repos
            .get_mut(repo)
            .ok_or_else(|| GatewayError::not_found(format!("repository {}", repo)))
    }

    /// Commit a tree change on a branch, creating repo and branch as needed
    fn commit(&mut self, repo: &str, branch: &str, path: &str, content: &str) {
        let blob = self.next_sha("blob");
        let commit = self.next_sha("commit");
        let state = self.repos.entry(repo.to_string()).or_default();
        let mut tree = state
            .branches
            .get(branch)
            .and_then(|head| state.commits.get(head))
            .cloned()
            .unwrap_or_default();
        tree.insert(
            path.to_string(),
            RemoteFile {
                content: content.to_string(),
                sha: blob,
            },
        );
        state.commits.insert(commit.clone(), tree);
        state.branches.insert(branch.to_string(), commit);
    }
}

/// Gateway backed by in-process state
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    state: Mutex<State>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Create an empty branch (builder pattern)
    pub fn with_branch(self, repo: &str, branch: &str) -> Self {
        {
            let mut state = self.state();
            let commit = state.next_sha("commit");
            let repo_state = state.repos.entry(repo.to_string()).or_default();
            if !repo_state.branches.contains_key(branch) {
                repo_state.commits.insert(commit.clone(), Tree::new());
                repo_state.branches.insert(branch.to_string(), commit);
            }
        }
        self
    }

    /// Commit a file on a branch (builder pattern)
    pub fn with_file(self, repo: &str, branch: &str, path: &str, content: &str) -> Self {
        self.state().commit(repo, branch, path, content);
        self
    }

    /// Register an open pull request (builder pattern)
    pub fn with_pull_request(self, repo: &str, base: &str, head: &str) -> Self {
        {
            let mut state = self.state();
            let number = state.repos.get(repo).map_or(0, |r| r.pull_requests.len()) as u64 + 1;
            state
                .repos
                .entry(repo.to_string())
                .or_default()
                .pull_requests
                .push(PullRequest {
                    number,
                    head: head.to_string(),
                    base: base.to_string(),
                    url: format!("memory://{}/pull/{}", repo, number),
                });
        }
        self
    }

    /// Make every read of `path` in `repo` fail with `error` (builder pattern)
    pub fn with_read_failure(self, repo: &str, path: &str, error: GatewayError) -> Self {
        self.state()
            .read_failures
            .insert((repo.to_string(), path.to_string()), error);
        self
    }

    /// Make every file write in `repo` fail with `error` (builder pattern)
    pub fn with_write_failure(self, repo: &str, error: GatewayError) -> Self {
        self.state().write_failures.insert(repo.to_string(), error);
        self
    }

    /// Mutating calls issued so far
    pub fn mutations(&self) -> Vec<Mutation> {
        self.state().mutations.clone()
    }

    /// Number of mutating calls issued so far
    pub fn mutation_count(&self) -> usize {
        self.state().mutations.len()
    }

    /// Current content of a file, if any
    pub fn file_content(&self, repo: &str, branch: &str, path: &str) -> Option<String> {
        let state = self.state();
        let repo_state = state.repos.get(repo)?;
        let head = repo_state.branches.get(branch)?;
        repo_state
            .commits
            .get(head)?
            .get(path)
            .map(|f| f.content.clone())
    }

    /// Returns true if the branch exists
    pub fn has_branch(&self, repo: &str, branch: &str) -> bool {
        self.state()
            .repos
            .get(repo)
            .map(|r| r.branches.contains_key(branch))
            .unwrap_or(false)
    }

    /// Open pull requests in a repository
    pub fn pull_requests(&self, repo: &str) -> Vec<PullRequest> {
        self.state()
            .repos
            .get(repo)
            .map(|r| r.pull_requests.clone())
            .unwrap_or_default()
    }

    /// Fast-forward `base` to `head` and close the pull request between them
    pub fn merge_pull_request(&self, repo: &str, base: &str, head: &str) {
        let mut state = self.state();
        if let Some(repo_state) = state.repos.get_mut(repo) {
            if let Some(head_commit) = repo_state.branches.get(head).cloned() {
                repo_state.branches.insert(base.to_string(), head_commit);
            }
            repo_state
                .pull_requests
                .retain(|pr| !(pr.base == base && pr.head == head));
        }
    }
}

#[async_trait]
impl RepositoryGateway for InMemoryGateway {
    async fn get_file(
        &self,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<RemoteFile, GatewayError> {
        let state = self.state();
        if let Some(error) = state
            .read_failures
            .get(&(repo.to_string(), path.to_string()))
        {
            return Err(error.clone());
        }
        let resource = format!("{}/{}@{}", repo, path, git_ref);
        let repo_state = state.repo(repo)?;
        repo_state
            .branches
            .get(git_ref)
            .and_then(|head| repo_state.commits.get(head))
            .and_then(|tree| tree.get(path))
            .cloned()
            .ok_or_else(|| GatewayError::not_found(resource))
    }

    async fn get_branch_head(&self, repo: &str, branch: &str) -> Result<String, GatewayError> {
        let state = self.state();
        state
            .repo(repo)?
            .branches
            .get(branch)
            .cloned()
            .ok_or_else(|| GatewayError::not_found(format!("{} branch {}", repo, branch)))
    }

    async fn create_branch(&self, repo: &str, branch: &str, sha: &str) -> Result<(), GatewayError> {
        let mut state = self.state();
        let repo_state = state.repo_mut(repo)?;
        if !repo_state.commits.contains_key(sha) {
            return Err(GatewayError::not_found(format!("{} commit {}", repo, sha)));
        }
        if repo_state.branches.contains_key(branch) {
            return Err(GatewayError::transport(
                format!("memory://{}/git/refs", repo),
                "HTTP 422 Unprocessable Entity: Reference already exists",
            ));
        }
        repo_state
            .branches
            .insert(branch.to_string(), sha.to_string());
        state.mutations.push(Mutation::CreateBranch {
            repo: repo.to_string(),
            branch: branch.to_string(),
        });
        Ok(())
    }

    async fn create_file(&self, repo: &str, write: FileWrite<'_>) -> Result<(), GatewayError> {
        let mut state = self.state();
        if let Some(error) = state.write_failures.get(repo) {
            return Err(error.clone());
        }
        if !state.repo(repo)?.branches.contains_key(write.branch) {
            return Err(GatewayError::not_found(format!(
                "{} branch {}",
                repo, write.branch
            )));
        }
        state.commit(repo, write.branch, write.path, write.content);
        state.mutations.push(Mutation::CreateFile {
            repo: repo.to_string(),
            branch: write.branch.to_string(),
            path: write.path.to_string(),
        });
        Ok(())
    }

    async fn update_file(
        &self,
        repo: &str,
        write: FileWrite<'_>,
        sha: &str,
    ) -> Result<(), GatewayError> {
        let mut state = self.state();
        if let Some(error) = state.write_failures.get(repo) {
            return Err(error.clone());
        }
        let repo_state = state.repo(repo)?;
        let current = repo_state
            .branches
            .get(write.branch)
            .and_then(|head| repo_state.commits.get(head))
            .and_then(|tree| tree.get(write.path))
            .ok_or_else(|| {
                GatewayError::not_found(format!("{}/{}@{}", repo, write.path, write.branch))
            })?;
        if current.sha != sha {
            return Err(GatewayError::transport(
                format!("memory://{}/contents/{}", repo, write.path),
                "HTTP 409 Conflict: sha does not match",
            ));
        }
        state.commit(repo, write.branch, write.path, write.content);
        state.mutations.push(Mutation::UpdateFile {
            repo: repo.to_string(),
            branch: write.branch.to_string(),
            path: write.path.to_string(),
        });
        Ok(())
    }

    async fn list_open_pull_requests(
        &self,
        repo: &str,
        base: &str,
        head: &str,
    ) -> Result<Vec<PullRequest>, GatewayError> {
        let state = self.state();
        Ok(state
            .repo(repo)?
            .pull_requests
            .iter()
            .filter(|pr| pr.base == base && pr.head == head)
            .cloned()
            .collect())
    }

    async fn create_pull_request(
        &self,
        repo: &str,
        pull_request: NewPullRequest<'_>,
    ) -> Result<PullRequest, GatewayError> {
        let mut state = self.state();
        let repo_state = state.repo_mut(repo)?;
        let number = repo_state.pull_requests.len() as u64 + 1;
        let created = PullRequest {
            number,
            head: pull_request.head.to_string(),
            base: pull_request.base.to_string(),
            url: format!("memory://{}/pull/{}", repo, number),
        };
        repo_state.pull_requests.push(created.clone());
        state.mutations.push(Mutation::CreatePullRequest {
            repo: repo.to_string(),
            base: pull_request.base.to_string(),
            head: pull_request.head.to_string(),
        });
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write<'a>(branch: &'a str, content: &'a str) -> FileWrite<'a> {
        FileWrite {
            path: "composer.json",
            content,
            message: "msg",
            branch,
        }
    }

    #[tokio::test]
    async fn test_get_file_and_missing_file() {
        let gateway = InMemoryGateway::new().with_file("q", "1.x", "composer.json", "{}");
        let file = gateway.get_file("q", "composer.json", "1.x").await.unwrap();
        assert_eq!(file.content, "{}");

        let err = gateway.get_file("q", "other.json", "1.x").await.unwrap_err();
        assert!(err.is_not_found());
        let err = gateway.get_file("missing", "composer.json", "1.x").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_created_branch_sees_source_files() {
        let gateway = InMemoryGateway::new().with_file("q", "1.x", "a.yml", "one");
        let head = gateway.get_branch_head("q", "1.x").await.unwrap();
        gateway.create_branch("q", "work", &head).await.unwrap();

        assert_eq!(gateway.file_content("q", "work", "a.yml").as_deref(), Some("one"));
        assert_eq!(gateway.mutation_count(), 1);

        let err = gateway.create_branch("q", "work", &head).await.unwrap_err();
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_requires_current_sha() {
        let gateway = InMemoryGateway::new().with_file("q", "1.x", "composer.json", "old");
        let current = gateway.get_file("q", "composer.json", "1.x").await.unwrap();

        assert!(gateway
            .update_file("q", write("1.x", "new"), "stale")
            .await
            .is_err());
        gateway
            .update_file("q", write("1.x", "new"), &current.sha)
            .await
            .unwrap();
        assert_eq!(
            gateway.file_content("q", "1.x", "composer.json").as_deref(),
            Some("new")
        );
    }

    #[tokio::test]
    async fn test_writes_do_not_leak_across_branches() {
        let gateway = InMemoryGateway::new().with_branch("q", "1.x");
        let head = gateway.get_branch_head("q", "1.x").await.unwrap();
        gateway.create_branch("q", "work", &head).await.unwrap();
        gateway.create_file("q", write("work", "x")).await.unwrap();

        assert!(gateway.file_content("q", "1.x", "composer.json").is_none());
        assert_eq!(
            gateway.file_content("q", "work", "composer.json").as_deref(),
            Some("x")
        );
    }

    #[tokio::test]
    async fn test_pull_requests_filtered_by_refs() {
        let gateway = InMemoryGateway::new()
            .with_branch("q", "1.x")
            .with_pull_request("q", "1.x", "work");
        assert_eq!(
            gateway.list_open_pull_requests("q", "1.x", "work").await.unwrap().len(),
            1
        );
        assert!(gateway
            .list_open_pull_requests("q", "2.x", "work")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_merge_pull_request_moves_base() {
        let gateway = InMemoryGateway::new()
            .with_branch("q", "1.x")
            .with_file("q", "work", "a.yml", "new")
            .with_pull_request("q", "1.x", "work");
        gateway.merge_pull_request("q", "1.x", "work");

        assert_eq!(gateway.file_content("q", "1.x", "a.yml").as_deref(), Some("new"));
        assert!(gateway.pull_requests("q").is_empty());
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let gateway = InMemoryGateway::new()
            .with_branch("q", "1.x")
            .with_read_failure("q", "composer.json", GatewayError::transport("u", "boom"))
            .with_write_failure("q", GatewayError::transport("u", "denied"));

        assert!(!gateway
            .get_file("q", "composer.json", "1.x")
            .await
            .unwrap_err()
            .is_not_found());
        assert!(gateway.create_file("q", write("1.x", "x")).await.is_err());
        assert_eq!(gateway.mutation_count(), 0);
    }
}
