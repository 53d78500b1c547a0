//! Sync orchestrator for coordinating the entire run
//!
//! This module provides:
//! - Workflow coordination: walk → aggregate → reconcile, per base project
//! - Run options derived from the config and CLI arguments
//! - Repository limiting
//! - Error handling with partial continuation; rejected credentials abort the run

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use crate::aggregate::VersionAggregator;
use crate::cli::UpdateArgs;
use crate::config::{BaseProjectConfig, Config};
use crate::domain::{BaseProjectSummary, PairFailure, RunSummary, VersionBranch};
use crate::error::AppError;
use crate::gateway::RepositoryGateway;
use crate::reconcile::{Reconciler, SyncSettings};
use crate::render::WorkflowRenderer;
use crate::walker::{DependencyWalker, RevisitPolicy, WalkTable};

/// Options for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Reconciliation settings
    pub settings: SyncSettings,
    /// Revisit policy of the dependency walk
    pub policy: RevisitPolicy,
    /// Repositories to reconcile; empty means all
    pub limit: Vec<String>,
}

impl RunOptions {
    /// Create options with default walk settings
    pub fn new(settings: SyncSettings) -> Self {
        Self {
            settings,
            policy: RevisitPolicy::default(),
            limit: Vec::new(),
        }
    }

    /// Create options from the config and `update` arguments for a run on `date`
    pub fn from_cli(config: &Config, args: &UpdateArgs, date: NaiveDate) -> Self {
        let working_branch = args
            .branch
            .clone()
            .unwrap_or_else(|| config.working_branch(date));
        let settings = SyncSettings::new(working_branch)
            .with_commit_message(args.message.clone())
            .with_check(args.check)
            .with_cooldown(config.cooldown());

        Self {
            settings,
            policy: RevisitPolicy::from_flag(
                config.explore_new_branches || args.explore_new_branches,
            ),
            limit: args.limit.clone(),
        }
    }

    /// Check if a repository should be reconciled
    fn should_process_repo(&self, repo: &str) -> bool {
        self.limit.is_empty() || self.limit.iter().any(|r| r == repo)
    }
}

/// Orchestrator for coordinating the sync workflow
pub struct Orchestrator<'a> {
    gateway: &'a dyn RepositoryGateway,
    renderer: &'a dyn WorkflowRenderer,
    config: &'a Config,
    options: RunOptions,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        gateway: &'a dyn RepositoryGateway,
        renderer: &'a dyn WorkflowRenderer,
        config: &'a Config,
        options: RunOptions,
    ) -> Self {
        Self {
            gateway,
            renderer,
            config,
            options,
        }
    }

    /// Sync every selected base project in order.
    ///
    /// Pair failures are collected in the summary. A gateway call rejected
    /// for bad credentials stops the run and is returned as the error.
    pub async fn run(&self, projects: &[&BaseProjectConfig]) -> Result<RunSummary, AppError> {
        let settings = &self.options.settings;
        let mut summary = RunSummary::new(settings.check, settings.working_branch.clone());
        let reconciler = Reconciler::new(
            self.gateway,
            self.renderer,
            self.config.tool_versions.clone(),
            settings.clone(),
        );

        for base in projects {
            summary.add_project(self.run_base_project(&reconciler, base).await?);
        }

        Ok(summary)
    }

    /// Walk every version of one base project, then reconcile each discovered pair
    async fn run_base_project(
        &self,
        reconciler: &Reconciler<'_>,
        base: &BaseProjectConfig,
    ) -> Result<BaseProjectSummary, AppError> {
        info!("Fetching composer dependency tree for {}", base.name);
        let mut result = BaseProjectSummary::new(base.name.as_str());

        let walker = DependencyWalker::new(self.gateway, self.config.organization.as_str())
            .with_policy(self.options.policy);
        let mut aggregator = VersionAggregator::new();

        for version in &base.versions {
            let mut table = WalkTable::new();
            let stats = walker
                .walk(&base.name, VersionBranch::from_name(version.as_str()), &mut table)
                .await?;
            if table.is_empty() {
                warn!("No composer.json found in {} at {}", base.name, version);
            }
            debug!(
                "Walked {} at {}: {} manifests fetched, {} missing",
                base.name, version, stats.fetched, stats.missing
            );
            result.warnings.extend(stats.warnings);
            aggregator.merge(version, &table);
        }

        let projects = aggregator.into_projects();
        result.discovered = projects.len();

        for (repo, branches) in projects {
            if !self.options.should_process_repo(&repo) {
                debug!("Skipping {} (not in --limit)", repo);
                continue;
            }
            for (branch, project) in branches {
                match reconciler.reconcile(base, &project).await {
                    Ok(report) => result.reports.push(report),
                    Err(e) if e.is_auth_failure() => return Err(e.into()),
                    Err(e) => {
                        error!("{}", e);
                        result.failures.push(PairFailure {
                            repo: repo.clone(),
                            branch: branch.to_string(),
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        Ok(result)
    }
}
