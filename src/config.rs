//! Configuration resolution for the driver.
//!
//! Values are layered, lowest precedence first:
//!
//! 1. Built-in defaults
//! 2. Config file (`--config`, JSON)
//! 3. Environment variables (`APICHECK_SHOW_LEVEL`, `APICHECK_HIDDEN_PACKAGES`,
//!    `APICHECK_PARALLEL`)
//! 4. CLI flags
//!
//! Scalar values keep the highest-precedence source. List values
//! (hidden-package globs, ignored types) accumulate across layers.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use apicheck_core::compat::{CheckOptions, DiagnosticKind, Severity};
use apicheck_core::error::ApiError;
use apicheck_core::visibility::{ShowLevel, VisibilityPolicy};

pub const ENV_SHOW_LEVEL: &str = "APICHECK_SHOW_LEVEL";
pub const ENV_HIDDEN_PACKAGES: &str = "APICHECK_HIDDEN_PACKAGES";
pub const ENV_PARALLEL: &str = "APICHECK_PARALLEL";

// ============================================================================
// Configuration Sources
// ============================================================================

/// Configuration value source (for precedence tracking).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigSource {
    /// Built-in default value.
    Default = 0,
    /// From the `--config` file.
    ConfigFile = 1,
    /// From environment variable.
    EnvVar = 2,
    /// From CLI flag (highest precedence).
    CliFlag = 3,
}

/// A configuration value with its source.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        ConfigValue { value, source }
    }

    /// Merge with another value, preferring higher precedence.
    pub fn merge(self, other: Self) -> Self {
        if other.source >= self.source {
            other
        } else {
            self
        }
    }
}

// ============================================================================
// Config File
// ============================================================================

/// Contents of a `--config` file.
///
/// ```json
/// {
///   "show_level": "protected",
///   "hidden_packages": ["com.example.internal*"],
///   "ignore_types": ["com.example.Legacy"],
///   "parallel": true,
///   "require_documented_ancestor": false,
///   "severity": { "ADDED_METHOD": "hidden", "REMOVED_FINAL": "error" }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub show_level: Option<ShowLevel>,
    #[serde(default)]
    pub hidden_packages: Vec<String>,
    #[serde(default)]
    pub ignore_types: Vec<String>,
    #[serde(default)]
    pub parallel: Option<bool>,
    #[serde(default)]
    pub require_documented_ancestor: Option<bool>,
    /// Severity overrides by diagnostic name or code.
    #[serde(default)]
    pub severity: BTreeMap<String, Severity>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<FileConfig, ApiError> {
        let text = fs::read_to_string(path).map_err(|e| {
            ApiError::invalid_args(format!("cannot read config {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::invalid_args(format!("invalid config {}: {}", path.display(), e))
        })
    }
}

// ============================================================================
// CLI Overrides
// ============================================================================

/// CLI configuration overrides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// --config flag.
    pub config: Option<PathBuf>,
    /// --show-level flag.
    pub show_level: Option<ShowLevel>,
    /// --hide-package flags.
    pub hidden_packages: Vec<String>,
    /// --ignore-type flags.
    pub ignore_types: Vec<String>,
    /// --parallel flag.
    pub parallel: bool,
    /// --error flags.
    pub errors: Vec<DiagnosticKind>,
    /// --warning flags.
    pub warnings: Vec<DiagnosticKind>,
    /// --hide flags.
    pub hidden: Vec<DiagnosticKind>,
}

// ============================================================================
// Configuration Resolution
// ============================================================================

/// Resolved configuration with precedence information.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub show_level: ConfigValue<ShowLevel>,
    pub hidden_packages: Vec<ConfigValue<String>>,
    pub ignore_types: Vec<ConfigValue<String>>,
    pub parallel: ConfigValue<bool>,
    pub require_documented_ancestor: ConfigValue<bool>,
    /// Per-kind severity overrides; kinds not listed use their default.
    pub severities: BTreeMap<DiagnosticKind, ConfigValue<Severity>>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        ResolvedConfig {
            show_level: ConfigValue::new(ShowLevel::Public, ConfigSource::Default),
            hidden_packages: Vec::new(),
            ignore_types: Vec::new(),
            parallel: ConfigValue::new(false, ConfigSource::Default),
            require_documented_ancestor: ConfigValue::new(true, ConfigSource::Default),
            severities: BTreeMap::new(),
        }
    }
}

impl ResolvedConfig {
    /// Resolve from the config file named by `cli`, the process environment
    /// and `cli` itself.
    pub fn resolve(cli: &CliOverrides) -> Result<Self, ApiError> {
        let file = cli.config.as_deref().map(FileConfig::load).transpose()?;
        Self::resolve_with(file.as_ref(), |name| std::env::var(name).ok(), cli)
    }

    /// Resolve from explicit layers; `env` looks up an environment variable.
    pub fn resolve_with(
        file: Option<&FileConfig>,
        env: impl Fn(&str) -> Option<String>,
        cli: &CliOverrides,
    ) -> Result<Self, ApiError> {
        let mut config = ResolvedConfig::default();
        if let Some(file) = file {
            config.apply_file(file)?;
        }
        config.apply_env_vars(env)?;
        config.apply_cli_overrides(cli);
        tracing::debug!(
            show_level = %config.show_level.value,
            hidden_packages = config.hidden_packages.len(),
            parallel = config.parallel.value,
            "resolved configuration"
        );
        Ok(config)
    }

    fn apply_file(&mut self, file: &FileConfig) -> Result<(), ApiError> {
        let source = ConfigSource::ConfigFile;
        if let Some(level) = file.show_level {
            self.show_level = self.show_level.clone().merge(ConfigValue::new(level, source));
        }
        self.hidden_packages
            .extend(file.hidden_packages.iter().map(|p| ConfigValue::new(p.clone(), source)));
        self.ignore_types
            .extend(file.ignore_types.iter().map(|t| ConfigValue::new(t.clone(), source)));
        if let Some(parallel) = file.parallel {
            self.parallel = ConfigValue::new(parallel, source);
        }
        if let Some(require) = file.require_documented_ancestor {
            self.require_documented_ancestor = ConfigValue::new(require, source);
        }
        for (name, severity) in &file.severity {
            let kind = name.parse::<DiagnosticKind>()?;
            self.severities.insert(kind, ConfigValue::new(*severity, source));
        }
        Ok(())
    }

    fn apply_env_vars(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ApiError> {
        let source = ConfigSource::EnvVar;
        if let Some(level) = env(ENV_SHOW_LEVEL) {
            self.show_level = ConfigValue::new(level.parse()?, source);
        }
        if let Some(patterns) = env(ENV_HIDDEN_PACKAGES) {
            self.hidden_packages.extend(
                patterns
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(|p| ConfigValue::new(p.to_string(), source)),
            );
        }
        if let Some(parallel) = env(ENV_PARALLEL) {
            self.parallel = ConfigValue::new(parse_flag(ENV_PARALLEL, &parallel)?, source);
        }
        Ok(())
    }

    fn apply_cli_overrides(&mut self, overrides: &CliOverrides) {
        let source = ConfigSource::CliFlag;
        if let Some(level) = overrides.show_level {
            self.show_level = ConfigValue::new(level, source);
        }
        self.hidden_packages.extend(
            overrides
                .hidden_packages
                .iter()
                .map(|p| ConfigValue::new(p.clone(), source)),
        );
        self.ignore_types.extend(
            overrides
                .ignore_types
                .iter()
                .map(|t| ConfigValue::new(t.clone(), source)),
        );
        if overrides.parallel {
            self.parallel = ConfigValue::new(true, source);
        }
        let flagged = [
            (&overrides.errors, Severity::Error),
            (&overrides.warnings, Severity::Warning),
            (&overrides.hidden, Severity::Hidden),
        ];
        for (kinds, severity) in flagged {
            for kind in kinds {
                self.severities.insert(*kind, ConfigValue::new(severity, source));
            }
        }
    }

    // ------------------------------------------------------------------------
    // Derived settings
    // ------------------------------------------------------------------------

    /// Visibility policy for freezing both models.
    pub fn visibility_policy(&self) -> Result<VisibilityPolicy, ApiError> {
        let mut policy = VisibilityPolicy::new(self.show_level.value);
        for pattern in &self.hidden_packages {
            policy = policy.with_hidden_package(&pattern.value)?;
        }
        Ok(policy)
    }

    pub fn check_options(&self, produce_delta: bool) -> CheckOptions {
        let options = CheckOptions::default()
            .with_parallel(self.parallel.value)
            .with_require_documented_ancestor(self.require_documented_ancestor.value);
        if produce_delta {
            options.with_delta()
        } else {
            options
        }
    }

    /// Qualified names of types whose diff is skipped.
    pub fn ignore_set(&self) -> HashSet<String> {
        self.ignore_types.iter().map(|t| t.value.clone()).collect()
    }

    /// Effective severity of a diagnostic kind.
    pub fn severity(&self, kind: DiagnosticKind) -> Severity {
        self.severities
            .get(&kind)
            .map(|v| v.value)
            .unwrap_or_else(|| kind.default_severity())
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, ApiError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ApiError::invalid_args(format!(
            "{} must be a boolean, got '{}'",
            name, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    mod precedence_tests {
        use super::*;

        #[test]
        fn defaults() {
            let config = ResolvedConfig::resolve_with(None, no_env, &CliOverrides::default()).unwrap();
            assert_eq!(config.show_level.value, ShowLevel::Public);
            assert_eq!(config.show_level.source, ConfigSource::Default);
            assert!(!config.parallel.value);
            assert!(config.require_documented_ancestor.value);
            assert_eq!(config.severity(DiagnosticKind::RemovedMethod), Severity::Error);
            assert_eq!(config.severity(DiagnosticKind::ChangedNative), Severity::Hidden);
        }

        #[test]
        fn env_beats_file_and_cli_beats_env() {
            let file = FileConfig {
                show_level: Some(ShowLevel::Private),
                parallel: Some(false),
                ..FileConfig::default()
            };
            let env = |name: &str| match name {
                ENV_SHOW_LEVEL => Some("protected".to_string()),
                ENV_PARALLEL => Some("yes".to_string()),
                _ => None,
            };

            let from_env = ResolvedConfig::resolve_with(Some(&file), env, &CliOverrides::default()).unwrap();
            assert_eq!(from_env.show_level.value, ShowLevel::Protected);
            assert_eq!(from_env.show_level.source, ConfigSource::EnvVar);
            assert!(from_env.parallel.value);

            let cli = CliOverrides {
                show_level: Some(ShowLevel::Package),
                ..CliOverrides::default()
            };
            let from_cli = ResolvedConfig::resolve_with(Some(&file), env, &cli).unwrap();
            assert_eq!(from_cli.show_level.value, ShowLevel::Package);
            assert_eq!(from_cli.show_level.source, ConfigSource::CliFlag);
        }

        #[test]
        fn hidden_packages_accumulate() {
            let file = FileConfig {
                hidden_packages: vec!["a.internal*".to_string()],
                ..FileConfig::default()
            };
            let env = |name: &str| (name == ENV_HIDDEN_PACKAGES).then(|| "b.impl, c.*".to_string());
            let cli = CliOverrides {
                hidden_packages: vec!["d".to_string()],
                ..CliOverrides::default()
            };
            let config = ResolvedConfig::resolve_with(Some(&file), env, &cli).unwrap();
            let patterns: Vec<&str> = config.hidden_packages.iter().map(|p| p.value.as_str()).collect();
            assert_eq!(patterns, vec!["a.internal*", "b.impl", "c.*", "d"]);

            let policy = config.visibility_policy().unwrap();
            assert!(policy.hides_package("a.internal.util"));
            assert!(policy.hides_package("c.x"));
            assert!(!policy.hides_package("a.api"));
        }

        #[test]
        fn merge_prefers_higher_source() {
            let low = ConfigValue::new(1, ConfigSource::ConfigFile);
            let high = ConfigValue::new(2, ConfigSource::CliFlag);
            assert_eq!(low.clone().merge(high.clone()).value, 2);
            assert_eq!(high.merge(low).value, 2);
        }
    }

    mod severity_tests {
        use super::*;

        #[test]
        fn file_and_cli_overrides() {
            let mut file = FileConfig::default();
            file.severity.insert("ADDED_METHOD".to_string(), Severity::Hidden);
            file.severity.insert("27".to_string(), Severity::Error);
            let cli = CliOverrides {
                warnings: vec![DiagnosticKind::AddedMethod],
                ..CliOverrides::default()
            };
            let config = ResolvedConfig::resolve_with(Some(&file), no_env, &cli).unwrap();
            assert_eq!(config.severity(DiagnosticKind::AddedMethod), Severity::Warning);
            assert_eq!(config.severity(DiagnosticKind::RemovedFinal), Severity::Error);
        }

        #[test]
        fn unknown_kind_in_file_is_rejected() {
            let mut file = FileConfig::default();
            file.severity.insert("NOT_A_KIND".to_string(), Severity::Hidden);
            let err = ResolvedConfig::resolve_with(Some(&file), no_env, &CliOverrides::default())
                .unwrap_err();
            assert_eq!(err.error_code().code(), 2);
        }
    }

    mod env_tests {
        use super::*;

        #[test]
        fn bad_values_are_invalid_arguments() {
            let bad_level = |name: &str| (name == ENV_SHOW_LEVEL).then(|| "everything".to_string());
            assert!(ResolvedConfig::resolve_with(None, bad_level, &CliOverrides::default()).is_err());

            let bad_flag = |name: &str| (name == ENV_PARALLEL).then(|| "maybe".to_string());
            assert!(ResolvedConfig::resolve_with(None, bad_flag, &CliOverrides::default()).is_err());
        }

        #[test]
        fn config_file_is_read_from_disk() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("apicheck.json");
            fs::write(&path, r#"{"show_level": "protected", "ignore_types": ["a.Old"]}"#).unwrap();
            let file = FileConfig::load(&path).unwrap();
            let config = ResolvedConfig::resolve_with(Some(&file), no_env, &CliOverrides::default()).unwrap();
            assert_eq!(config.show_level.value, ShowLevel::Protected);
            assert!(config.ignore_set().contains("a.Old"));

            fs::write(&path, r#"{"unknown": 1}"#).unwrap();
            assert!(FileConfig::load(&path).is_err());
        }
    }
}
