//! Configuration file loading
//!
//! `workflow-sync.toml` holds the organization, the tool version lists
//! exposed to templates, and the base projects to sync. When the default file
//! is absent the built-in LocalGov Drupal configuration is used.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::render::{TemplateVariables, ToolVersions};

/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "workflow-sync.toml";

/// Project selector meaning every configured base project
pub const ALL_PROJECTS: &str = "all";

/// Placeholder in `branch_name` replaced by the run date
const DATE_PLACEHOLDER: &str = "{date}";

/// Base project settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseProjectConfig {
    /// Repository name; taken from the table key
    #[serde(skip)]
    pub name: String,
    /// Template file name inside the templates directory
    pub template: String,
    /// Path of the workflow inside each repository
    pub workflow_file: String,
    /// Version branches of the base project to walk from
    pub versions: Vec<String>,
}

impl BaseProjectConfig {
    pub fn new(
        name: impl Into<String>,
        template: impl Into<String>,
        workflow_file: impl Into<String>,
        versions: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            workflow_file: workflow_file.into(),
            versions,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// GitHub organization owning every repository
    pub organization: String,
    /// Directory holding workflow templates
    pub templates_dir: PathBuf,
    /// Working branch name; `{date}` expands to the run date
    pub branch_name: String,
    /// Seconds to pause after each mutating API call
    pub cooldown_seconds: u64,
    /// Walk repositories again when required at a new branch
    pub explore_new_branches: bool,
    /// Version lists exposed to templates as top-level variables
    pub tool_versions: ToolVersions,
    /// Base projects keyed by repository name
    pub base_projects: BTreeMap<String, BaseProjectConfig>,
}

impl Default for Config {
    fn default() -> Self {
        let tool_versions = ToolVersions::from([
            ("drupal_versions".to_string(), vec!["~9.3".to_string()]),
            (
                "php_versions".to_string(),
                vec!["7.4".to_string(), "8.1".to_string()],
            ),
        ]);
        let base_project = BaseProjectConfig::new(
            "localgov_project",
            "test_localgov.yml",
            ".github/workflows/test.yml",
            vec!["2.x".to_string()],
        );

        Self {
            organization: "localgovdrupal".to_string(),
            templates_dir: PathBuf::from("templates"),
            branch_name: format!("fix/github-workflow-update-{}", DATE_PLACEHOLDER),
            cooldown_seconds: 2,
            explore_new_branches: false,
            tool_versions,
            base_projects: BTreeMap::from([(base_project.name.clone(), base_project)]),
        }
    }
}

impl Config {
    /// Load from an explicit path, or from the default file when present
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load and validate a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parse and validate TOML content
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            message: e.to_string(),
        })?;
        for (name, project) in config.base_projects.iter_mut() {
            project.name = name.clone();
        }
        config.validate()?;
        Ok(config)
    }

    /// Check semantic constraints serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| Err(ConfigError::Invalid { message });

        if self.organization.trim().is_empty() {
            return invalid("organization is empty".to_string());
        }
        if self.branch_name.trim().is_empty() {
            return invalid("branch_name is empty".to_string());
        }
        if self.base_projects.is_empty() {
            return invalid("no base projects configured".to_string());
        }
        for (name, project) in &self.base_projects {
            if name == ALL_PROJECTS {
                return invalid(format!("'{}' cannot be used as a project name", ALL_PROJECTS));
            }
            if project.template.trim().is_empty() {
                return invalid(format!("base project '{}' has no template", name));
            }
            if project.workflow_file.trim().is_empty() {
                return invalid(format!("base project '{}' has no workflow_file", name));
            }
            if project.versions.is_empty() || project.versions.iter().any(|v| v.trim().is_empty()) {
                return invalid(format!("base project '{}' needs non-empty versions", name));
            }
        }
        if let Some(name) = self
            .tool_versions
            .keys()
            .find(|k| TemplateVariables::RESERVED.contains(&k.as_str()))
        {
            return invalid(format!("tool_versions.{} shadows a template variable", name));
        }
        Ok(())
    }

    /// Base projects named by a CLI selector (`all` or a project name)
    pub fn select(&self, selector: &str) -> Result<Vec<&BaseProjectConfig>, ConfigError> {
        if selector == ALL_PROJECTS {
            return Ok(self.base_projects.values().collect());
        }
        self.base_projects
            .get(selector)
            .map(|project| vec![project])
            .ok_or_else(|| ConfigError::UnknownProject {
                name: selector.to_string(),
            })
    }

    /// Working branch name for a run on `date`
    pub fn working_branch(&self, date: NaiveDate) -> String {
        self.branch_name
            .replace(DATE_PLACEHOLDER, &date.format("%Y-%m-%d").to_string())
    }

    /// Pause after each mutating API call
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
organization = "example"
templates_dir = "ci"
branch_name = "ci/sync-{date}"
cooldown_seconds = 0

[tool_versions]
php_versions = ["8.1", "8.2"]

[base_projects.platform]
template = "platform.yml"
workflow_file = ".github/workflows/ci.yml"
versions = ["1.x", "2.x"]

[base_projects.site]
template = "site.yml"
workflow_file = ".github/workflows/ci.yml"
versions = ["main"]
"#;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.organization, "localgovdrupal");
        assert_eq!(config.cooldown(), Duration::from_secs(2));
        let project = &config.base_projects["localgov_project"];
        assert_eq!(project.name, "localgov_project");
        assert_eq!(project.versions, vec!["2.x"]);
        assert_eq!(config.tool_versions["php_versions"], vec!["7.4", "8.1"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_sample() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.organization, "example");
        assert_eq!(config.templates_dir, PathBuf::from("ci"));
        assert!(!config.explore_new_branches);
        assert_eq!(config.base_projects.len(), 2);
        assert_eq!(config.base_projects["site"].name, "site");
        assert!(!config.tool_versions.contains_key("drupal_versions"));
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let config = Config::from_toml_str("organization = \"example\"").unwrap();
        assert_eq!(config.organization, "example");
        assert!(config.base_projects.contains_key("localgov_project"));
    }

    #[test]
    fn test_select() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.select("all").unwrap().len(), 2);
        assert_eq!(config.select("site").unwrap()[0].template, "site.yml");
        let err = config.select("nope").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProject { .. }));
    }

    #[test]
    fn test_working_branch_expands_date() {
        let config = Config::default();
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(
            config.working_branch(date),
            "fix/github-workflow-update-2024-03-07"
        );
    }

    #[test]
    fn test_working_branch_without_placeholder() {
        let config = Config {
            branch_name: "workflow-sync".to_string(),
            ..Config::default()
        };
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(config.working_branch(date), "workflow-sync");
    }

    #[test]
    fn test_validate_rejects_empty_versions() {
        let err = Config::from_toml_str(
            r#"
[base_projects.p]
template = "t.yml"
workflow_file = "w.yml"
versions = []
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("non-empty versions"));
    }

    #[test]
    fn test_validate_rejects_reserved_tool_name() {
        let err = Config::from_toml_str("[tool_versions]\nrepo = [\"x\"]").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_validate_rejects_empty_organization() {
        let err = Config::from_toml_str("organization = \"\"").unwrap_err();
        assert!(err.to_string().contains("organization is empty"));
    }

    #[test]
    fn test_from_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "organization = [").unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let err = Config::load(Some(Path::new("/nonexistent/workflow-sync.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
