//! workflow-sync - GitHub workflow synchronizer CLI tool
//!
//! Renders a workflow template for every repository in the composer
//! dependency tree of the configured base projects and proposes the
//! result through pull requests.

use anyhow::Context;
use clap::Parser;
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::{debug, error};
use workflow_sync::cli::{CliArgs, Command, UpdateArgs};
use workflow_sync::config::{Config, ALL_PROJECTS};
use workflow_sync::error::ConfigError;
use workflow_sync::gateway::{GitHubGateway, HttpClient};
use workflow_sync::logging::init_logger;
use workflow_sync::orchestrator::{Orchestrator, RunOptions};
use workflow_sync::output::{create_formatter, OutputConfig};
use workflow_sync::render::TemplateRenderer;

/// Exit code for an unknown base project
const EXIT_INVALID_PROJECT: u8 = 2;

/// Exit code when at least one pair failed to reconcile
const EXIT_PAIR_FAILURES: u8 = 3;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logger(args.verbose, args.quiet, args.log_json);

    // Run the main logic and handle errors
    match run(&args).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Main application logic
async fn run(args: &CliArgs) -> anyhow::Result<ExitCode> {
    let config = Config::load(args.config.as_deref())?;
    debug!(
        "workflow-sync v{} for organization {}",
        env!("CARGO_PKG_VERSION"),
        config.organization
    );

    match &args.command {
        Command::Update(update) => update_workflows(args, update, &config).await,
    }
}

/// Handle the `update` subcommand
async fn update_workflows(
    args: &CliArgs,
    update: &UpdateArgs,
    config: &Config,
) -> anyhow::Result<ExitCode> {
    // Resolve the selection before touching the network
    let projects = match config.select(&update.project) {
        Ok(projects) => projects,
        Err(ConfigError::UnknownProject { name }) => {
            let known: Vec<&str> = config.base_projects.keys().map(String::as_str).collect();
            error!(
                "Project '{}' not listed in config. Try '{}' or one of: {}",
                name,
                ALL_PROJECTS,
                known.join(", ")
            );
            return Ok(ExitCode::from(EXIT_INVALID_PROJECT));
        }
        Err(e) => return Err(e.into()),
    };

    let Some(token) = args.token.as_deref().filter(|t| !t.trim().is_empty()) else {
        error!("No GitHub token given. Set GITHUB_TOKEN or pass --token");
        return Ok(ExitCode::FAILURE);
    };

    let client = HttpClient::for_base_url(&args.api_url)?;
    let gateway = match GitHubGateway::authenticate(client, token, &config.organization).await {
        Ok(gateway) => gateway,
        Err(e) => {
            error!("Unable to authenticate with GitHub: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let renderer = TemplateRenderer::new(&config.templates_dir);
    let options = RunOptions::from_cli(config, update, chrono::Local::now().date_naive());
    let summary = Orchestrator::new(&gateway, &renderer, config, options)
        .run(&projects)
        .await
        .context("Run aborted")?;

    // Output results
    let formatter = create_formatter(OutputConfig::from_cli(args.json, args.verbose, args.quiet));
    let mut stdout = io::stdout().lock();
    formatter.format(&summary, &mut stdout)?;
    stdout.flush()?;

    if summary.has_failures() {
        Ok(ExitCode::from(EXIT_PAIR_FAILURES))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
