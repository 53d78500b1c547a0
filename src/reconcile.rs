//! Workflow reconciliation
//!
//! For one (repository, version branch) pair:
//! 1. render the workflow
//! 2. read the committed workflow on the version branch
//! 3. stop if both are equal
//! 4. ensure the working branch for that version exists, forking it from the
//!    version branch
//! 5. write the workflow on the working branch
//! 6. ensure a pull request from the working branch into the version branch
//!
//! In check mode every mutating call is skipped while the same decisions are
//! taken and logged. Skipped branches, writes and pull requests are kept in a
//! ledger so later pairs of the run see them as a real run would.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, info};

use crate::config::BaseProjectConfig;
use crate::domain::{AggregatedProject, SyncOutcome, SyncReport};
use crate::error::{GatewayError, ReconcileError};
use crate::gateway::{FileWrite, NewPullRequest, RemoteFile, RepositoryGateway};
use crate::render::{TemplateVariables, ToolVersions, WorkflowRenderer};

/// Default commit message for workflow writes
pub const DEFAULT_COMMIT_MESSAGE: &str = "Updated GitHub workflow";

/// Placeholder replaced by the version branch in the working branch name
pub const VERSION_PLACEHOLDER: &str = "{version}";

/// Per-run reconciliation settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Working branch name, resolved per version branch by [`SyncSettings::branch_for`]
    pub working_branch: String,
    /// Commit message for file writes
    pub commit_message: String,
    /// Skip every mutating call
    pub check: bool,
    /// Pause after each mutating call
    pub cooldown: Duration,
}

impl SyncSettings {
    pub fn new(working_branch: impl Into<String>) -> Self {
        Self {
            working_branch: working_branch.into(),
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
            check: false,
            cooldown: Duration::ZERO,
        }
    }

    pub fn with_commit_message(mut self, message: impl Into<String>) -> Self {
        self.commit_message = message.into();
        self
    }

    pub fn with_check(mut self, check: bool) -> Self {
        self.check = check;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Working branch that proposes changes to `version`.
    ///
    /// A `{version}` placeholder is replaced; without one the version is
    /// appended, so every version branch gets its own pull request head.
    ///
    /// ```
    /// use workflow_sync::reconcile::SyncSettings;
    ///
    /// assert_eq!(SyncSettings::new("fix/wf").branch_for("2.x"), "fix/wf-2.x");
    /// assert_eq!(SyncSettings::new("wf/{version}/x").branch_for("2.x"), "wf/2.x/x");
    /// ```
    pub fn branch_for(&self, version: &str) -> String {
        if self.working_branch.contains(VERSION_PLACEHOLDER) {
            self.working_branch.replace(VERSION_PLACEHOLDER, version)
        } else {
            format!("{}-{}", self.working_branch, version)
        }
    }
}

/// Mutations a check run skipped, keyed by repository
#[derive(Debug, Default)]
struct PlannedChanges {
    /// (repo, branch)
    branches: BTreeSet<(String, String)>,
    /// (repo, branch, path) to content
    files: BTreeMap<(String, String, String), String>,
    /// (repo, base, head)
    pull_requests: BTreeSet<(String, String, String)>,
}

fn branch_key(repo: &str, branch: &str) -> (String, String) {
    (repo.to_string(), branch.to_string())
}

fn ref_key(repo: &str, a: &str, b: &str) -> (String, String, String) {
    (repo.to_string(), a.to_string(), b.to_string())
}

/// Brings one workflow file per (repository, branch) in line with its template.
///
/// One reconciler serves a whole run; in check mode it remembers what it
/// would have changed.
pub struct Reconciler<'a> {
    gateway: &'a dyn RepositoryGateway,
    renderer: &'a dyn WorkflowRenderer,
    tool_versions: ToolVersions,
    settings: SyncSettings,
    planned: Mutex<PlannedChanges>,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        gateway: &'a dyn RepositoryGateway,
        renderer: &'a dyn WorkflowRenderer,
        tool_versions: ToolVersions,
        settings: SyncSettings,
    ) -> Self {
        Self {
            gateway,
            renderer,
            tool_versions,
            settings,
            planned: Mutex::new(PlannedChanges::default()),
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Reconcile the workflow of `project` for the base project `base`
    pub async fn reconcile(
        &self,
        base: &BaseProjectConfig,
        project: &AggregatedProject,
    ) -> Result<SyncReport, ReconcileError> {
        let repo = project.repo.as_str();
        let version = project.branch.as_str();
        let working = self.settings.branch_for(version);
        let mut report = SyncReport::new(repo, project.branch.clone());

        let variables = TemplateVariables::new(&base.name, project, &self.tool_versions);
        let workflow = self
            .renderer
            .render(&base.template, &variables)
            .map_err(|source| ReconcileError::Render {
                repo: repo.to_string(),
                source,
            })?;

        let existing = self
            .fetch_file(repo, &base.workflow_file, version)
            .await
            .map_err(|e| ReconcileError::gateway("fetch workflow", repo, version, e))?;
        if existing.as_ref().is_some_and(|file| file.content == workflow) {
            info!("OK {} ({})", repo, version);
            report.record(SyncOutcome::Unchanged);
            return Ok(report);
        }

        let created = self.ensure_working_branch(repo, version, &working).await?;
        let on_working = if created {
            report.record(SyncOutcome::CreatedBranch);
            existing
        } else {
            self.fetch_working_file(repo, &base.workflow_file, &working)
                .await
                .map_err(|e| ReconcileError::gateway("fetch workflow", repo, &working, e))?
        };

        if let Some(outcome) = self
            .write_workflow(repo, &working, &base.workflow_file, &workflow, on_working)
            .await?
        {
            report.record(outcome);
        }

        let title = format!(
            "Update {} workflow on {} branch",
            base.workflow_file, version
        );
        let body = format!(
            "Regenerated `{}` from the `{}` template for {} {}.",
            base.workflow_file,
            base.template,
            base.name,
            variables.base_versions.join(", ")
        );
        let pull_request = NewPullRequest {
            base: version,
            head: &working,
            title: &title,
            body: &body,
        };
        report.record(self.ensure_pull_request(repo, pull_request).await?);

        Ok(report)
    }

    /// Read a file, mapping absence to `None`
    async fn fetch_file(
        &self,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<Option<RemoteFile>, GatewayError> {
        match self.gateway.get_file(repo, path, git_ref).await {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Read a file on the working branch, including writes skipped in check mode
    async fn fetch_working_file(
        &self,
        repo: &str,
        path: &str,
        working: &str,
    ) -> Result<Option<RemoteFile>, GatewayError> {
        if self.settings.check {
            let planned = self.planned();
            if let Some(content) = planned.files.get(&ref_key(repo, working, path)) {
                return Ok(Some(RemoteFile {
                    content: content.clone(),
                    sha: String::new(),
                }));
            }
            if planned.branches.contains(&branch_key(repo, working)) {
                return Ok(None);
            }
        }
        self.fetch_file(repo, path, working).await
    }

    /// Returns true if the working branch was (or in check mode would be) created
    async fn ensure_working_branch(
        &self,
        repo: &str,
        version: &str,
        working: &str,
    ) -> Result<bool, ReconcileError> {
        if self.settings.check && self.planned().branches.contains(&branch_key(repo, working)) {
            return Ok(false);
        }
        match self.gateway.get_branch_head(repo, working).await {
            Ok(_) => return Ok(false),
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                return Err(ReconcileError::gateway(
                    "read working branch",
                    repo,
                    working,
                    e,
                ))
            }
        }

        let sha = match self.gateway.get_branch_head(repo, version).await {
            Ok(sha) => sha,
            Err(e) if e.is_not_found() => {
                return Err(ReconcileError::SourceBranchMissing {
                    repo: repo.to_string(),
                    branch: version.to_string(),
                })
            }
            Err(e) => {
                return Err(ReconcileError::gateway(
                    "read source branch",
                    repo,
                    version,
                    e,
                ))
            }
        };

        if self.settings.check {
            self.planned().branches.insert(branch_key(repo, working));
        } else {
            self.gateway
                .create_branch(repo, working, &sha)
                .await
                .map_err(|e| ReconcileError::gateway("create branch", repo, working, e))?;
            self.cooldown().await;
        }
        info!("{}Created {} branch in {}", self.prefix(), working, repo);
        Ok(true)
    }

    /// Write the workflow on the working branch given its current file there
    async fn write_workflow(
        &self,
        repo: &str,
        working: &str,
        path: &str,
        workflow: &str,
        current: Option<RemoteFile>,
    ) -> Result<Option<SyncOutcome>, ReconcileError> {
        let write = FileWrite {
            path,
            content: workflow,
            message: &self.settings.commit_message,
            branch: working,
        };

        let outcome = match current {
            Some(file) if file.content == workflow => {
                debug!("Workflow in {} is already current on the {} branch", repo, working);
                return Ok(None);
            }
            Some(file) => {
                if !self.settings.check {
                    self.gateway
                        .update_file(repo, write, &file.sha)
                        .await
                        .map_err(|e| ReconcileError::gateway("update file", repo, working, e))?;
                    self.cooldown().await;
                }
                info!(
                    "{}Updated workflow in {} on the {} branch",
                    self.prefix(),
                    repo,
                    working
                );
                SyncOutcome::UpdatedFile
            }
            None => {
                if !self.settings.check {
                    self.gateway
                        .create_file(repo, write)
                        .await
                        .map_err(|e| ReconcileError::gateway("create file", repo, working, e))?;
                    self.cooldown().await;
                }
                info!(
                    "{}Created workflow in {} on the {} branch",
                    self.prefix(),
                    repo,
                    working
                );
                SyncOutcome::CreatedFile
            }
        };

        if self.settings.check {
            self.planned()
                .files
                .insert(ref_key(repo, working, path), workflow.to_string());
        }
        Ok(Some(outcome))
    }

    /// Open a pull request unless one between the same refs is already open
    async fn ensure_pull_request(
        &self,
        repo: &str,
        pull_request: NewPullRequest<'_>,
    ) -> Result<SyncOutcome, ReconcileError> {
        let (base, head) = (pull_request.base, pull_request.head);
        let key = ref_key(repo, base, head);
        if self.settings.check && self.planned().pull_requests.contains(&key) {
            info!("(check) Pull request already proposed in {}", repo);
            return Ok(SyncOutcome::PullRequestAlreadyOpen);
        }

        let open = self
            .gateway
            .list_open_pull_requests(repo, base, head)
            .await
            .map_err(|e| ReconcileError::gateway("list pull requests", repo, base, e))?;

        if let Some(pr) = open.first() {
            info!("Pull request #{} already open in {}", pr.number, repo);
            return Ok(SyncOutcome::PullRequestAlreadyOpen);
        }

        if self.settings.check {
            self.planned().pull_requests.insert(key);
        } else {
            let created = self
                .gateway
                .create_pull_request(repo, pull_request)
                .await
                .map_err(|e| ReconcileError::gateway("create pull request", repo, base, e))?;
            debug!("Opened {}", created.url);
            self.cooldown().await;
        }
        info!("{}Created pull request in {}", self.prefix(), repo);
        Ok(SyncOutcome::OpenedPullRequest)
    }

    fn planned(&self) -> MutexGuard<'_, PlannedChanges> {
        self.planned.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn cooldown(&self) {
        if !self.settings.cooldown.is_zero() {
            tokio::time::sleep(self.settings.cooldown).await;
        }
    }

    fn prefix(&self) -> &'static str {
        if self.settings.check {
            "(check) "
        } else {
            ""
        }
    }
}
