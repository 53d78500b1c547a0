//! Core domain models for workflow-sync
//!
//! This module contains the fundamental types used throughout the application:
//! - Dependency constraints and the version branches derived from them
//! - Project kinds and their install paths
//! - Discovered project records and their per-branch aggregation
//! - Reconciliation outcomes and run summaries

mod outcome;
mod project;
mod summary;
mod version_branch;

pub use outcome::{SyncOutcome, SyncReport};
pub use project::{AggregatedProject, ProjectKind, ProjectRecord};
pub use summary::{BaseProjectSummary, PairFailure, RunSummary, WalkWarning};
pub use version_branch::{DependencyConstraint, VersionBranch};
