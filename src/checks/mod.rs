//! Turning configured checks into runnable ones.
//!
//! A [`Selection`] narrows the configuration to the categories and checks
//! asked for on the command line; [`plan`] then resolves each remaining
//! check into a [`Check`] or records why it is disabled.

mod command;

pub use command::{command_check, CommandDefaults};

use crate::config::{CheckConfig, Config};
use crate::core::check::Check;
use crate::core::error::{Error, Result};
use crate::core::executor::Executor;
use std::path::Path;

/// Which categories and checks to run. Empty lists select everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Category names to run.
    pub categories: Vec<String>,
    /// Check names to run.
    pub checks: Vec<String>,
}

impl Selection {
    /// Selects everything.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    fn includes_category(&self, name: &str) -> bool {
        self.categories.is_empty() || self.categories.iter().any(|c| c == name)
    }

    fn includes_check(&self, name: &str) -> bool {
        self.checks.is_empty() || self.checks.iter().any(|c| c == name)
    }
}

/// A configured check skipped because its condition doesn't hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisabledCheck {
    /// Check name.
    pub name: String,
    /// Why it was skipped.
    pub reason: String,
}

/// The runnable checks of one category.
#[derive(Debug, Clone)]
pub struct CategoryPlan {
    /// Category name.
    pub name: String,
    /// Checks to run, in configuration order.
    pub checks: Vec<Check>,
    /// Checks skipped by their `enabled_if` condition.
    pub disabled: Vec<DisabledCheck>,
}

/// Resolves the configuration into runnable categories.
///
/// Categories keep the order in which they first appear in the
/// configuration. A category with nothing selected is left out.
pub fn plan(config: &Config, selection: &Selection) -> Result<Vec<CategoryPlan>> {
    let categories = config.categories();

    for name in &selection.categories {
        if !categories.contains(&name.as_str()) {
            return Err(Error::CategoryNotFound { name: name.clone() });
        }
    }
    for name in &selection.checks {
        let found = config
            .checks
            .iter()
            .any(|c| c.name == *name && selection.includes_category(&c.category));
        if !found {
            return Err(Error::CheckNotFound { name: name.clone() });
        }
    }

    let root = config.root()?;
    let defaults = CommandDefaults {
        root: root.clone(),
        timeout: config.default_timeout()?,
        shell: config.runner.shell.clone(),
    };

    let mut plans = Vec::new();
    for category in categories {
        if !selection.includes_category(category) {
            continue;
        }

        let mut category_plan = CategoryPlan {
            name: category.to_string(),
            checks: Vec::new(),
            disabled: Vec::new(),
        };

        for check in config.checks_in(category) {
            if !selection.includes_check(&check.name) {
                continue;
            }

            if let Some(reason) = disabled_reason(check, &root) {
                tracing::debug!(check = %check.name, %reason, "check disabled");
                category_plan.disabled.push(DisabledCheck {
                    name: check.name.clone(),
                    reason,
                });
                continue;
            }

            category_plan.checks.push(command_check(check, &defaults)?);
        }

        if !category_plan.checks.is_empty() || !category_plan.disabled.is_empty() {
            plans.push(category_plan);
        }
    }

    Ok(plans)
}

/// Returns why a check is disabled, or `None` if it should run.
///
/// Every condition set on the check must hold. File patterns are globs
/// relative to `root`.
#[must_use]
pub fn disabled_reason(check: &CheckConfig, root: &Path) -> Option<String> {
    let condition = check.enabled_if.as_ref()?;

    if let Some(ref pattern) = condition.file_exists {
        if !file_matches(root, pattern) {
            return Some(format!("no file matching '{pattern}'"));
        }
    }

    if let Some(ref dir) = condition.dir_exists {
        if !root.join(dir).is_dir() {
            return Some(format!("directory '{dir}' not found"));
        }
    }

    if let Some(ref command) = condition.command_exists {
        if !Executor::command_exists(command) {
            return Some(format!("command '{command}' not found"));
        }
    }

    None
}

fn file_matches(root: &Path, pattern: &str) -> bool {
    if root.join(pattern).exists() {
        return true;
    }

    let root = glob::Pattern::escape(&root.to_string_lossy());
    let full = format!("{root}/{pattern}");
    match glob::glob(&full) {
        Ok(mut paths) => paths.any(|entry| entry.is_ok()),
        Err(e) => {
            tracing::warn!(pattern, error = %e, "invalid file pattern");
            false
        },
    }
}
