//! Configuration presets for common project types.
//!
//! Presets provide categorised check sets for different tech stacks.

use crate::config::{CheckConfig, EnabledCondition};

/// Available preset names.
pub mod names {
    /// Python projects (pytest, ruff, mypy).
    pub const PYTHON: &str = "python";
    /// Node.js/TypeScript projects (npm, eslint, jest).
    pub const NODE: &str = "node";
    /// Rust projects (cargo, clippy).
    pub const RUST: &str = "rust";
    /// Go projects (go test, golangci-lint).
    pub const GO: &str = "go";
}

/// Returns a list of available preset names.
#[must_use]
pub const fn available() -> &'static [&'static str] {
    &[names::PYTHON, names::NODE, names::RUST, names::GO]
}

/// Returns true if the preset name is valid.
#[must_use]
pub fn is_valid(name: &str) -> bool {
    available().contains(&name)
}

/// Returns a description for a preset.
#[must_use]
pub fn description(name: &str) -> &'static str {
    match name {
        names::PYTHON => "Python projects (ruff, mypy, pytest, gitleaks)",
        names::NODE => "Node.js/TypeScript projects (prettier, eslint, tsc, npm test)",
        names::RUST => "Rust projects (cargo fmt, clippy, cargo test, cargo audit)",
        names::GO => "Go projects (gofmt, golangci-lint, go test, govulncheck)",
        _ => "Unknown preset",
    }
}

/// Returns the checks for a preset, or an empty list for unknown names.
#[must_use]
pub fn checks(name: &str) -> Vec<CheckConfig> {
    match name {
        names::PYTHON => python(),
        names::NODE | "nodejs" | "typescript" => node(),
        names::RUST => rust(),
        names::GO => go(),
        _ => Vec::new(),
    }
}

fn secrets_scan() -> CheckConfig {
    CheckConfig::new("secrets", "security", "gitleaks detect --source . --no-git")
        .description("Scan for committed secrets")
        .remediation("Remove the secret and rotate it")
        .enabled_if(EnabledCondition::command("gitleaks"))
}

fn python() -> Vec<CheckConfig> {
    let project = || EnabledCondition::file("pyproject.toml");
    vec![
        CheckConfig::new("ruff-format", "format", "ruff format --check .")
            .description("Check code formatting")
            .remediation("Run `ruff format .`")
            .enabled_if(EnabledCondition::command("ruff")),
        CheckConfig::new("ruff", "lint", "ruff check .")
            .description("Run ruff lints")
            .remediation("Run `ruff check --fix .`")
            .enabled_if(EnabledCondition::command("ruff")),
        CheckConfig::new("mypy", "lint", "mypy .")
            .description("Type-check with mypy")
            .enabled_if(EnabledCondition::command("mypy")),
        CheckConfig::new("test-unit", "test", "pytest -x -q")
            .description("Run unit tests")
            .enabled_if(project()),
        secrets_scan(),
    ]
}

fn node() -> Vec<CheckConfig> {
    let package = || EnabledCondition::file("package.json");
    vec![
        CheckConfig::new("prettier", "format", "npx prettier --check .")
            .description("Check code formatting")
            .remediation("Run `npx prettier --write .`")
            .enabled_if(package()),
        CheckConfig::new("eslint", "lint", "npx eslint .")
            .description("Run ESLint")
            .remediation("Run `npx eslint --fix .`")
            .enabled_if(package()),
        CheckConfig::new("typecheck", "lint", "npx tsc --noEmit")
            .description("Type-check with tsc")
            .enabled_if(EnabledCondition::file("tsconfig.json")),
        CheckConfig::new("test-unit", "test", "npm test")
            .description("Run unit tests")
            .enabled_if(package()),
        secrets_scan(),
    ]
}

fn rust() -> Vec<CheckConfig> {
    let cargo = || EnabledCondition::file("Cargo.toml");
    vec![
        CheckConfig::new("fmt-check", "format", "cargo fmt --all -- --check")
            .description("Check code formatting")
            .remediation("Run `cargo fmt --all`")
            .enabled_if(cargo()),
        CheckConfig::new(
            "clippy",
            "lint",
            "cargo clippy --all-targets --all-features -- -D warnings",
        )
        .description("Run Clippy lints")
        .remediation("Run `cargo clippy --fix` and address the remaining warnings")
        .enabled_if(cargo()),
        CheckConfig::new("test-unit", "test", "cargo test")
            .description("Run unit tests")
            .enabled_if(cargo()),
        CheckConfig::new("audit", "security", "cargo audit")
            .description("Check dependencies for known vulnerabilities")
            .remediation("Upgrade the affected crates")
            .enabled_if(EnabledCondition::command("cargo-audit")),
        secrets_scan(),
    ]
}

fn go() -> Vec<CheckConfig> {
    let module = || EnabledCondition::file("go.mod");
    vec![
        CheckConfig::new("fmt-check", "format", "test -z \"$(gofmt -l .)\"")
            .description("Check code formatting")
            .remediation("Run `gofmt -w .`")
            .enabled_if(module()),
        CheckConfig::new("lint", "lint", "golangci-lint run")
            .description("Run golangci-lint")
            .enabled_if(EnabledCondition::command("golangci-lint")),
        CheckConfig::new("test-unit", "test", "go test ./...")
            .description("Run unit tests")
            .enabled_if(module()),
        CheckConfig::new("vulncheck", "security", "govulncheck ./...")
            .description("Check for known vulnerabilities")
            .enabled_if(EnabledCondition::command("govulncheck")),
    ]
}
