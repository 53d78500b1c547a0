//! Application error types using thiserror
//!
//! Error hierarchy:
//! - GatewayError: Issues talking to the remote repository host
//! - ManifestError: Issues fetching or decoding composer.json
//! - RenderError: Issues rendering a workflow template
//! - ReconcileError: A single (repository, branch) sync failed
//! - ConfigError: Issues with the configuration file or CLI selection

use std::path::PathBuf;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Remote gateway errors
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Manifest related errors
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Template rendering errors
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Reconciliation errors
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// Configuration related errors
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors returned by a repository gateway
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The requested file, ref or repository does not exist
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// Credentials were rejected
    #[error("authentication failed: {message}")]
    AuthFailure { message: String },

    /// The token is valid but lacks access to the resource
    #[error("permission denied: {message}")]
    PermissionDenied { message: String },

    /// Rate limit exceeded
    #[error("rate limit exceeded while requesting {url}")]
    RateLimitExceeded { url: String },

    /// Network or HTTP level failure
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The response body could not be understood
    #[error("invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },
}

/// Errors related to dependency manifests
#[derive(Error, Debug)]
pub enum ManifestError {
    /// No composer.json at the requested ref
    #[error("composer.json not found in {repo} at {branch}")]
    NotFound { repo: String, branch: String },

    /// The gateway failed for a reason other than absence
    #[error("failed to fetch composer.json from {repo} at {branch}: {source}")]
    Transport {
        repo: String,
        branch: String,
        #[source]
        source: GatewayError,
    },

    /// composer.json is not valid JSON
    #[error("failed to parse composer.json in {repo} at {branch}: {message}")]
    Parse {
        repo: String,
        branch: String,
        message: String,
    },
}

/// Errors raised while rendering a workflow template
#[derive(Error, Debug)]
pub enum RenderError {
    /// Template file does not exist in the templates directory
    #[error("template '{name}' not found")]
    TemplateNotFound { name: String },

    /// Template failed to compile or evaluate
    #[error("failed to render template '{name}': {message}")]
    Template { name: String, message: String },
}

/// Errors that abort the reconciliation of one (repository, branch) pair
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// Rendering failed
    #[error("failed to render workflow for {repo}: {source}")]
    Render {
        repo: String,
        #[source]
        source: RenderError,
    },

    /// A gateway call failed during the named step
    #[error("{step} failed for {repo} on {branch}: {source}")]
    Gateway {
        step: &'static str,
        repo: String,
        branch: String,
        #[source]
        source: GatewayError,
    },

    /// The version branch to fork the working branch from does not exist
    #[error("source branch '{branch}' does not exist in {repo}")]
    SourceBranchMissing { repo: String, branch: String },
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the configuration file
    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Project selector names no configured base project
    #[error("project '{name}' is not listed in config, try 'all' to apply all projects")]
    UnknownProject { name: String },

    /// Semantically invalid configuration
    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl GatewayError {
    /// Creates a new NotFound error
    pub fn not_found(resource: impl Into<String>) -> Self {
        GatewayError::NotFound {
            resource: resource.into(),
        }
    }

    /// Creates a new Transport error
    pub fn transport(url: impl Into<String>, message: impl Into<String>) -> Self {
        GatewayError::Transport {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a new InvalidResponse error
    pub fn invalid_response(url: impl Into<String>, message: impl Into<String>) -> Self {
        GatewayError::InvalidResponse {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Returns true if the remote object does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound { .. })
    }

    /// Returns true if the credentials were rejected; the run cannot continue
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, GatewayError::AuthFailure { .. })
    }
}

impl ManifestError {
    /// Classifies a gateway failure for the manifest at (repo, branch)
    pub fn from_gateway(repo: &str, branch: &str, source: GatewayError) -> Self {
        if source.is_not_found() {
            ManifestError::NotFound {
                repo: repo.to_string(),
                branch: branch.to_string(),
            }
        } else {
            ManifestError::Transport {
                repo: repo.to_string(),
                branch: branch.to_string(),
                source,
            }
        }
    }

    /// Returns true if the manifest simply does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, ManifestError::NotFound { .. })
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ManifestError::Transport { source, .. } if source.is_auth_failure())
    }
}

impl ReconcileError {
    /// Creates a new Gateway error for a reconciliation step
    pub fn gateway(step: &'static str, repo: &str, branch: &str, source: GatewayError) -> Self {
        ReconcileError::Gateway {
            step,
            repo: repo.to_string(),
            branch: branch.to_string(),
            source,
        }
    }

    /// Returns true if a gateway call was rejected for bad credentials
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ReconcileError::Gateway { source, .. } if source.is_auth_failure())
    }
}
