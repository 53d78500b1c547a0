//! workflow-sync - GitHub workflow synchronizer library
//!
//! Keeps a generated CI workflow file in sync across every repository an
//! organization's base projects depend on:
//! - Walks the composer dependency tree of each base project version
//! - Aggregates the repositories and branches found into version pairs
//! - Renders a workflow template for each pair
//! - Commits differing workflows to a working branch and opens pull requests

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod manifest;
pub mod orchestrator;
pub mod output;
pub mod reconcile;
pub mod render;
pub mod walker;
