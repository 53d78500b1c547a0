//! Workflow rendering
//!
//! Templates use Twig-compatible syntax and are rendered with minijinja.
//! As in Twig, the first newline after a block tag is dropped and the
//! template's trailing newline is kept, so rendered files compare equal to
//! what was committed from a previous run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use minijinja::{Environment, ErrorKind};
use serde::Serialize;

use crate::domain::AggregatedProject;
use crate::error::RenderError;

/// Tool name → versions, e.g. `php_versions = ["7.4", "8.1"]`
pub type ToolVersions = BTreeMap<String, Vec<String>>;

/// Variables exposed to a workflow template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateVariables {
    /// Repository name
    pub repo: String,
    /// Declared package name
    pub project_name: String,
    /// Declared package type, as written in composer.json
    pub project_type: String,
    /// Install path inside the base project, empty for unknown types
    pub project_path: String,
    /// Branch the workflow is rendered for
    pub version_branch: String,
    /// Base project the run was started from
    pub base_project: String,
    /// Base project versions that pull this branch in
    pub base_versions: Vec<String>,
    /// Configured tool version lists, exposed as top-level variables
    #[serde(flatten)]
    pub tool_versions: ToolVersions,
}

impl TemplateVariables {
    /// Names a tool version list must not use
    pub const RESERVED: [&'static str; 7] = [
        "repo",
        "project_name",
        "project_type",
        "project_path",
        "version_branch",
        "base_project",
        "base_versions",
    ];

    pub fn new(
        base_project: &str,
        project: &AggregatedProject,
        tool_versions: &ToolVersions,
    ) -> Self {
        Self {
            repo: project.repo.clone(),
            project_name: project.name.clone(),
            project_type: project.kind.as_str().to_string(),
            project_path: project.install_path(),
            version_branch: project.branch.to_string(),
            base_project: base_project.to_string(),
            base_versions: project.base_versions.iter().cloned().collect(),
            tool_versions: tool_versions.clone(),
        }
    }
}

/// Turns template variables into workflow file text
pub trait WorkflowRenderer: Send + Sync {
    fn render(&self, template: &str, variables: &TemplateVariables) -> Result<String, RenderError>;
}

/// Renderer loading templates from a directory
pub struct TemplateRenderer {
    env: Environment<'static>,
    templates_dir: Option<PathBuf>,
}

impl TemplateRenderer {
    /// Create a renderer loading `<templates_dir>/<name>` on demand
    pub fn new(templates_dir: impl AsRef<Path>) -> Self {
        let dir = templates_dir.as_ref().to_path_buf();
        let mut env = Self::environment();
        env.set_loader(minijinja::path_loader(dir.clone()));
        Self {
            env,
            templates_dir: Some(dir),
        }
    }

    /// Create a renderer without a loader; templates are added by name
    pub fn empty() -> Self {
        Self {
            env: Self::environment(),
            templates_dir: None,
        }
    }

    /// Register a template from source (builder pattern)
    pub fn with_template(
        mut self,
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<Self, RenderError> {
        let name = name.into();
        self.env
            .add_template_owned(name.clone(), source.into())
            .map_err(|e| template_error(&name, e))?;
        Ok(self)
    }

    pub fn templates_dir(&self) -> Option<&Path> {
        self.templates_dir.as_deref()
    }

    fn environment() -> Environment<'static> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_keep_trailing_newline(true);
        env
    }
}

impl WorkflowRenderer for TemplateRenderer {
    fn render(&self, template: &str, variables: &TemplateVariables) -> Result<String, RenderError> {
        let compiled = self
            .env
            .get_template(template)
            .map_err(|e| template_error(template, e))?;
        compiled
            .render(variables)
            .map_err(|e| template_error(template, e))
    }
}

fn template_error(name: &str, err: minijinja::Error) -> RenderError {
    match err.kind() {
        ErrorKind::TemplateNotFound => RenderError::TemplateNotFound {
            name: name.to_string(),
        },
        _ => RenderError::Template {
            name: name.to_string(),
            message: err.to_string(),
        },
    }
}
