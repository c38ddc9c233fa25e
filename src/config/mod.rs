//! Configuration handling for checkrun.
//!
//! Configuration lives in `checkrun.toml`. Checks are an ordered array; the
//! order in the file is the order checks run and are reported in. Each check
//! belongs to a category, and categories run in order of first appearance.

use crate::core::error::{Error, Result};
use crate::presets;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "checkrun.toml";

/// Category used for checks that don't name one.
pub const DEFAULT_CATEGORY: &str = "checks";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Execution settings.
    pub runner: RunnerConfig,
    /// Check definitions, in execution order.
    pub checks: Vec<CheckConfig>,
    /// File the configuration was loaded from.
    #[serde(skip)]
    source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            runner: RunnerConfig::default(),
            checks: default_checks(),
            source: None,
        }
    }
}

impl Config {
    /// Loads configuration from the default location.
    pub fn load() -> Result<Self> {
        let path = Self::find_config_file()?;
        Self::load_from(&path)
    }

    /// Loads configuration or returns defaults if not found.
    pub fn load_or_default() -> Result<Self> {
        match Self::find_config_file() {
            Ok(path) => Self::load_from(&path),
            Err(Error::ConfigNotFound { .. }) => {
                tracing::debug!("no configuration file found, using defaults");
                Ok(Self::default())
            },
            Err(e) => Err(e),
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| Error::io("read config", e))?;

        let mut config = Self::from_toml(&content)?;
        config.source = Some(path.to_path_buf());

        tracing::debug!(path = %path.display(), checks = config.checks.len(), "loaded configuration");

        Ok(config)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::config_parse_with_source("Failed to parse TOML", e))?;

        config.validate()?;

        Ok(config)
    }

    /// Finds the configuration file by searching up the directory tree, then
    /// in the user configuration directory.
    pub fn find_config_file() -> Result<PathBuf> {
        let cwd = std::env::current_dir().map_err(|e| Error::io("get current dir", e))?;

        for dir in cwd.ancestors() {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Ok(config_path);
            }
        }

        if let Some(user_config) = Self::user_config_file() {
            if user_config.exists() {
                return Ok(user_config);
            }
        }

        Err(Error::ConfigNotFound {
            path: cwd.join(CONFIG_FILE_NAME),
        })
    }

    /// Returns the per-user configuration path, e.g.
    /// `~/.config/checkrun/checkrun.toml`.
    #[must_use]
    pub fn user_config_file() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("checkrun").join(CONFIG_FILE_NAME))
    }

    /// Returns the file this configuration was loaded from.
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Returns the directory checks run in: the configuration file's
    /// directory, or the current directory for defaults.
    pub fn root(&self) -> Result<PathBuf> {
        match self.source.as_deref().and_then(Path::parent) {
            Some(dir) if !dir.as_os_str().is_empty() => Ok(dir.to_path_buf()),
            _ => std::env::current_dir().map_err(|e| Error::io("get current dir", e)),
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        parse_timeout("runner.timeout", &self.runner.timeout)?;

        let mut seen = HashSet::new();
        for (index, check) in self.checks.iter().enumerate() {
            if check.name.trim().is_empty() {
                return Err(Error::config_invalid(
                    format!("checks[{index}].name"),
                    "Check name must not be empty",
                ));
            }

            let field = |suffix: &str| format!("checks.{}.{suffix}", check.name);

            if check.run.trim().is_empty() {
                return Err(Error::config_invalid(field("run"), "Command must not be empty"));
            }

            if check.category.trim().is_empty() {
                return Err(Error::config_invalid(
                    field("category"),
                    "Category must not be empty",
                ));
            }

            if let Some(ref timeout) = check.timeout {
                parse_timeout(&field("timeout"), timeout)?;
            }

            if !seen.insert((check.category.as_str(), check.name.as_str())) {
                return Err(Error::config_invalid(
                    field("name"),
                    format!("Duplicate check in category '{}'", check.category),
                ));
            }
        }

        Ok(())
    }

    /// Returns the default per-check timeout.
    pub fn default_timeout(&self) -> Result<Duration> {
        parse_timeout("runner.timeout", &self.runner.timeout)
    }

    /// Returns category names in order of first appearance.
    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for check in &self.checks {
            if !categories.contains(&check.category.as_str()) {
                categories.push(&check.category);
            }
        }
        categories
    }

    /// Returns the checks in a category, in order.
    pub fn checks_in<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a CheckConfig> {
        self.checks.iter().filter(move |c| c.category == category)
    }

    /// Generates default configuration as a string.
    #[must_use]
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    /// Generates configuration for a specific preset.
    pub fn for_preset(preset: &str) -> Result<Self> {
        if !presets::is_valid(preset) {
            return Err(Error::config_invalid(
                "preset",
                format!(
                    "unknown preset '{preset}' (available: {})",
                    presets::available().join(", ")
                ),
            ));
        }

        Ok(Self {
            checks: presets::checks(preset),
            ..Self::default()
        })
    }
}

/// Runner settings shared by every category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Whether to stop on first failure.
    pub fail_fast: bool,
    /// Whether checks within a category run concurrently.
    pub parallel: bool,
    /// Worker limit for parallel runs (0 = one per check).
    pub workers: usize,
    /// Default timeout for each check.
    pub timeout: String,
    /// Shell used to run commands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            parallel: true,
            workers: 0,
            timeout: "5m".to_string(),
            shell: None,
        }
    }
}

/// Configuration for a single check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Check name.
    pub name: String,
    /// Category the check is grouped under.
    pub category: String,
    /// Command to run.
    pub run: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Hint shown when the check fails.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub remediation: String,
    /// Fixed text shown on failure instead of command output.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub details: String,
    /// Timeout override for this check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    /// Environment variables to set.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    /// Condition for enabling the check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled_if: Option<EnabledCondition>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            category: DEFAULT_CATEGORY.to_string(),
            run: String::new(),
            description: String::new(),
            remediation: String::new(),
            details: String::new(),
            timeout: None,
            env: BTreeMap::new(),
            enabled_if: None,
        }
    }
}

impl CheckConfig {
    /// Creates a check config from a name, category and command.
    #[must_use]
    pub fn new(name: impl Into<String>, category: impl Into<String>, run: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            run: run.into(),
            ..Self::default()
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the remediation hint.
    #[must_use]
    pub fn remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = remediation.into();
        self
    }

    /// Sets the enabling condition.
    #[must_use]
    pub fn enabled_if(mut self, condition: EnabledCondition) -> Self {
        self.enabled_if = Some(condition);
        self
    }
}

/// Condition for enabling a check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EnabledCondition {
    /// A file (or glob pattern) that must exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_exists: Option<String>,
    /// A directory that must exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir_exists: Option<String>,
    /// A command that must be on PATH.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_exists: Option<String>,
}

impl EnabledCondition {
    /// Requires a file or glob match.
    #[must_use]
    pub fn file(pattern: impl Into<String>) -> Self {
        Self {
            file_exists: Some(pattern.into()),
            ..Self::default()
        }
    }

    /// Requires a directory.
    #[must_use]
    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            dir_exists: Some(path.into()),
            ..Self::default()
        }
    }

    /// Requires a command on PATH.
    #[must_use]
    pub fn command(name: impl Into<String>) -> Self {
        Self {
            command_exists: Some(name.into()),
            ..Self::default()
        }
    }
}

/// Parses a duration string like "30s", "5m", "1h30m".
pub fn parse_timeout(field: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value)
        .map_err(|_| Error::config_invalid(field, format!("Invalid duration: {value}")))
}

/// Checks included in every generated configuration.
fn default_checks() -> Vec<CheckConfig> {
    vec![
        CheckConfig::new("pre-commit", "lint", "pre-commit run --all-files")
            .description("Run pre-commit hooks on all files")
            .remediation("Fix the reported issues and stage the changes")
            .enabled_if(EnabledCondition::file(".pre-commit-config.yaml")),
        CheckConfig::new(
            "conflict-markers",
            "lint",
            "! git grep -n -E '^(<<<<<<<|>>>>>>>)( |$)'",
        )
        .description("Ensure no merge conflict markers are committed")
        .remediation("Resolve the conflicts listed above")
        .enabled_if(EnabledCondition::command("git")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.checks.is_empty());
        assert!(config.runner.parallel);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_runner_timeout() {
        let mut config = Config::default();
        config.runner.timeout = "invalid".to_string();
        assert!(matches!(
            config.validate(),
            Err(Error::ConfigInvalid { ref field, .. }) if field == "runner.timeout"
        ));
    }

    #[test]
    fn test_invalid_check_timeout() {
        let mut config = Config::default();
        config.checks[0].timeout = Some("soon".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_command_rejected() {
        let mut config = Config::default();
        config.checks.push(CheckConfig::new("noop", "lint", "  "));
        assert!(matches!(
            config.validate(),
            Err(Error::ConfigInvalid { ref field, .. }) if field == "checks.noop.run"
        ));
    }

    #[test]
    fn test_duplicate_names_rejected_within_category_only() {
        let mut config = Config::default();
        config.checks = vec![
            CheckConfig::new("test", "unit", "true"),
            CheckConfig::new("test", "integration", "true"),
        ];
        assert!(config.validate().is_ok());

        config.checks.push(CheckConfig::new("test", "unit", "false"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config = Config::from_toml(
            r#"
[[checks]]
name = "fmt"
run = "cargo fmt --check"
"#,
        )
        .expect("parse");

        assert_eq!(config.checks.len(), 1);
        assert_eq!(config.checks[0].category, DEFAULT_CATEGORY);
        assert_eq!(config.runner, RunnerConfig::default());
    }

    #[test]
    fn test_parse_full_toml() {
        let config = Config::from_toml(
            r#"
[runner]
fail_fast = true
parallel = false
workers = 2
timeout = "30s"
shell = "bash"

[[checks]]
name = "fmt"
category = "format"
run = "cargo fmt --check"
remediation = "Run cargo fmt"
timeout = "10s"
env = { CARGO_TERM_COLOR = "never" }
enabled_if = { file_exists = "Cargo.toml" }

[[checks]]
name = "clippy"
category = "lint"
run = "cargo clippy"
"#,
        )
        .expect("parse");

        assert!(config.runner.fail_fast);
        assert!(!config.runner.parallel);
        assert_eq!(config.runner.workers, 2);
        assert_eq!(config.runner.shell.as_deref(), Some("bash"));
        assert_eq!(config.default_timeout().expect("timeout"), Duration::from_secs(30));

        let fmt = &config.checks[0];
        assert_eq!(fmt.remediation, "Run cargo fmt");
        assert_eq!(fmt.env.get("CARGO_TERM_COLOR").map(String::as_str), Some("never"));
        assert_eq!(fmt.enabled_if, Some(EnabledCondition::file("Cargo.toml")));
    }

    #[test]
    fn test_parse_invalid_toml() {
        let result = Config::from_toml("[[checks]\nname =");
        assert!(matches!(result, Err(Error::ConfigParse { .. })));
    }

    #[test]
    fn test_categories_in_first_appearance_order() {
        let mut config = Config::default();
        config.checks = vec![
            CheckConfig::new("a", "lint", "true"),
            CheckConfig::new("b", "test", "true"),
            CheckConfig::new("c", "lint", "true"),
        ];

        assert_eq!(config.categories(), vec!["lint", "test"]);
        let lint: Vec<_> = config.checks_in("lint").map(|c| c.name.as_str()).collect();
        assert_eq!(lint, vec!["a", "c"]);
    }

    #[test]
    fn test_load_from_sets_source_and_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, Config::default_toml()).expect("write");

        let config = Config::load_from(&path).expect("load");

        assert_eq!(config.source(), Some(path.as_path()));
        assert_eq!(config.root().expect("root"), dir.path());
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = Config::load_from(&dir.path().join(CONFIG_FILE_NAME));
        assert!(matches!(result, Err(Error::ConfigNotFound { .. })));
    }

    #[test]
    fn test_default_toml_round_trips() {
        let toml = Config::default_toml();
        assert!(toml.contains("[runner]"));
        assert!(toml.contains("[[checks]]"));

        let parsed = Config::from_toml(&toml).expect("parse generated config");
        assert_eq!(parsed.checks, Config::default().checks);
    }

    #[test]
    fn test_preset_rust() {
        let config = Config::for_preset("rust").expect("preset");
        assert!(config.checks.iter().any(|c| c.name == "clippy"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_preset_is_rejected() {
        let err = Config::for_preset("cobol").expect_err("unknown preset");
        assert!(matches!(err, Error::ConfigInvalid { ref field, .. } if field == "preset"));
        assert!(err.to_string().contains("available: python, node, rust, go"), "{err}");
    }
}
