//! Configuration file support for modbreak.
//!
//! This module loads configuration from TOML files and turns it into the
//! engine's [`EngineConfig`]. CLI arguments take precedence over config file
//! values; see [`crate::config_hierarchy`] for how files are layered.
//!
//! ```toml
//! [general]
//! fail_on = "warning"
//! format = "sarif"
//!
//! [rename_detection]
//! enabled = true
//! similarity_threshold = 0.8
//!
//! [rules.RC006]
//! enabled = false
//!
//! [rules.BC004]
//! severity = "warning"
//!
//! [[ignore]]
//! rule = "BC002"
//! subject = "legacy_flag"
//! reason = "deprecated for two releases"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::OutputFormat;
use crate::engine::{EngineConfig, RenameDetection, RuleSetting};
use crate::error::{ModbreakError, Result};
use crate::finding::Severity;
use crate::ignore::IgnoreRule;
use crate::registry::{Registry, default_registry};
use crate::rule::DEFAULT_SIMILARITY_THRESHOLD;

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["Modbreak.toml", ".modbreak.toml", "modbreak.toml"];

/// Main configuration structure representing a modbreak configuration file.
///
/// Every value is optional; a layered file overrides only what it sets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ModbreakConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Rename detection settings.
    #[serde(default)]
    pub rename_detection: RenameDetectionConfig,

    /// Per-rule settings keyed by rule ID or name.
    #[serde(default)]
    pub rules: BTreeMap<String, RuleSetting>,

    /// Findings to mark ignored.
    #[serde(default, rename = "ignore", skip_serializing_if = "Vec::is_empty")]
    pub ignores: Vec<IgnoreRule>,
}

/// General configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    /// Lowest severity that fails a check.
    pub fail_on: Option<Severity>,

    /// Report format.
    pub format: Option<OutputFormat>,

    /// Attach remediation text to findings.
    pub include_remediation: Option<bool>,

    /// Write the report to this file instead of stdout.
    pub output_file: Option<PathBuf>,
}

/// `[rename_detection]` section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct RenameDetectionConfig {
    /// Turn rename detection on or off.
    pub enabled: Option<bool>,

    /// Minimum similarity in `[0, 1]`.
    pub similarity_threshold: Option<f64>,
}

impl RenameDetectionConfig {
    /// Resolves unset values to their defaults.
    #[must_use]
    pub fn resolve(&self) -> RenameDetection {
        RenameDetection {
            enabled: self.enabled.unwrap_or(false),
            similarity_threshold: self
                .similarity_threshold
                .unwrap_or(DEFAULT_SIMILARITY_THRESHOLD),
        }
    }
}

impl ModbreakConfig {
    /// Checks values that deserialization alone cannot.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for unknown rule IDs or names (in `[rules]`
    /// and `[[ignore]]`) and for a similarity threshold outside `[0, 1]`.
    pub fn validate(&self, registry: &Registry) -> Result<()> {
        if let Some(threshold) = self.rename_detection.similarity_threshold {
            check_threshold(threshold)?;
        }
        for key in self.rules.keys() {
            if registry.resolve(key).is_none() {
                return Err(unknown_rule(key, "[rules]"));
            }
        }
        for entry in &self.ignores {
            if registry.resolve(&entry.rule).is_none() {
                return Err(unknown_rule(&entry.rule, "[[ignore]]"));
            }
        }
        Ok(())
    }

    /// Builds the engine configuration against the default registry.
    ///
    /// # Errors
    ///
    /// See [`ModbreakConfig::validate`].
    pub fn engine_config(&self) -> Result<EngineConfig> {
        self.engine_config_for(default_registry())
    }

    /// Builds the engine configuration, resolving rule names to IDs in `registry`.
    ///
    /// # Errors
    ///
    /// See [`ModbreakConfig::validate`].
    pub fn engine_config_for(&self, registry: &Registry) -> Result<EngineConfig> {
        self.validate(registry)?;

        let mut rules: BTreeMap<String, RuleSetting> = BTreeMap::new();
        for (key, setting) in &self.rules {
            let Some(id) = registry.resolve(key) else {
                continue;
            };
            let entry = rules.entry(id.to_string()).or_default();
            entry.enabled = setting.enabled.or(entry.enabled);
            entry.severity = setting.severity.or(entry.severity);
        }

        Ok(EngineConfig {
            rules,
            rename: self.rename_detection.resolve(),
            fail_on: self.general.fail_on.unwrap_or(Severity::Error),
            ignores: self.ignores.clone(),
        })
    }
}

/// Rejects similarity thresholds outside `[0, 1]`.
///
/// # Errors
///
/// Returns a `ConfigError` naming the offending value.
pub fn check_threshold(threshold: f64) -> Result<()> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(ModbreakError::config_error(format!(
            "similarity_threshold must be between 0.0 and 1.0, got {threshold}"
        )))
    }
}

fn unknown_rule(rule: &str, section: &str) -> ModbreakError {
    ModbreakError::config_error(format!("unknown rule \"{rule}\" in {section}"))
}

/// Load configuration from a specific file path.
///
/// Returns `Ok(None)` if the file doesn't exist, and an error if it exists
/// but cannot be read or parsed.
pub fn load_config_from_path(path: &Path) -> Result<Option<ModbreakConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ModbreakError::io_error_with_source("read config", path.to_path_buf(), e))?;

    let config: ModbreakConfig = toml::from_str(&content)
        .map_err(|e| ModbreakError::from(e).at_path(path.to_path_buf()))?;

    tracing::debug!(path = %path.display(), "Loaded config file");
    Ok(Some(config))
}

/// Discover and load configuration from default locations.
///
/// Searches the current directory and its parents for `Modbreak.toml`,
/// `.modbreak.toml` or `modbreak.toml`, in that order.
pub fn discover_and_load_config() -> Result<Option<(PathBuf, ModbreakConfig)>> {
    let mut current_dir = std::env::current_dir().map_err(|e| {
        ModbreakError::io_error_with_source("get current directory", PathBuf::from("."), e)
    })?;

    loop {
        for config_name in DEFAULT_CONFIG_FILES {
            let config_path = current_dir.join(config_name);
            if let Some(config) = load_config_from_path(&config_path)? {
                return Ok(Some((config_path, config)));
            }
        }

        if !current_dir.pop() {
            break;
        }
    }

    Ok(None)
}

/// Load configuration from a specified path or discover from default locations.
///
/// An explicitly given path that does not exist is an error; a missing
/// discovered file is not.
pub fn load_config(config_path: Option<&Path>) -> Result<Option<(PathBuf, ModbreakConfig)>> {
    if let Some(path) = config_path {
        match load_config_from_path(path)? {
            Some(config) => Ok(Some((path.to_path_buf(), config))),
            None => Err(ModbreakError::config_error_with_path(
                "config file not found",
                path.to_path_buf(),
            )),
        }
    } else {
        discover_and_load_config()
    }
}
