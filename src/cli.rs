//! CLI argument parsing module for workflow-sync

use crate::gateway::DEFAULT_API_URL;
use crate::reconcile::DEFAULT_COMMIT_MESSAGE;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Synchronize generated GitHub workflow files across an organization
#[derive(Parser, Debug, Clone)]
#[command(name = "workflow-sync", version, about = "GitHub workflow synchronizer")]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (default: workflow-sync.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// GitHub access token with repo and workflow scopes
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL, global = true)]
    pub api_url: String,

    // Output options
    /// Enable debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Print the run summary as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Update workflow files across the dependency tree of base projects
    #[command(visible_alias = "up")]
    Update(UpdateArgs),
}

/// Options of the `update` subcommand
#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    /// Base project listed in the config, or 'all' to apply every base project
    pub project: String,

    /// Override the working branch name from the config; `{version}` is
    /// replaced by each version branch, otherwise `-<version>` is appended
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Check mode - report what would change without making changes
    #[arg(short, long)]
    pub check: bool,

    /// Commit message
    #[arg(short, long, default_value = DEFAULT_COMMIT_MESSAGE)]
    pub message: String,

    /// Only reconcile these repositories (can be specified multiple times)
    #[arg(short, long, action = ArgAction::Append)]
    pub limit: Vec<String>,

    /// Also walk repositories required again at a branch not yet explored
    #[arg(long)]
    pub explore_new_branches: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn update(args: &CliArgs) -> &UpdateArgs {
        match &args.command {
            Command::Update(update) => update,
        }
    }

    #[test]
    fn test_update_defaults() {
        let args = CliArgs::parse_from(["workflow-sync", "update", "all"]);
        let update = update(&args);
        assert_eq!(update.project, "all");
        assert!(update.branch.is_none());
        assert!(!update.check);
        assert_eq!(update.message, "Updated GitHub workflow");
        assert!(update.limit.is_empty());
        assert!(!update.explore_new_branches);
        assert!(args.config.is_none());
        assert!(!args.verbose);
        assert!(!args.quiet);
        assert!(!args.json);
    }

    #[test]
    fn test_up_alias() {
        let args = CliArgs::parse_from(["workflow-sync", "up", "localgov_project"]);
        assert_eq!(update(&args).project, "localgov_project");
    }

    #[test]
    fn test_short_flags() {
        let args = CliArgs::parse_from([
            "workflow-sync",
            "update",
            "all",
            "-c",
            "-b",
            "fix/workflows",
            "-m",
            "Sync CI",
        ]);
        let update = update(&args);
        assert!(update.check);
        assert_eq!(update.branch.as_deref(), Some("fix/workflows"));
        assert_eq!(update.message, "Sync CI");
    }

    #[test]
    fn test_limit_multiple() {
        let args = CliArgs::parse_from([
            "workflow-sync",
            "update",
            "all",
            "--limit",
            "localgov_news",
            "-l",
            "localgov_events",
        ]);
        let update = update(&args);
        assert_eq!(update.limit, vec!["localgov_news", "localgov_events"]);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = CliArgs::parse_from([
            "workflow-sync",
            "update",
            "all",
            "--config",
            "ci.toml",
            "--json",
            "--verbose",
            "--api-url",
            "http://localhost:8080",
        ]);
        assert_eq!(args.config, Some(PathBuf::from("ci.toml")));
        assert!(args.json);
        assert!(args.verbose);
        assert_eq!(args.api_url, "http://localhost:8080");
    }

    #[test]
    fn test_project_is_required() {
        assert!(CliArgs::try_parse_from(["workflow-sync", "update"]).is_err());
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(CliArgs::try_parse_from(["workflow-sync"]).is_err());
    }
}
