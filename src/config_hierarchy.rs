//! Hierarchical configuration loading for modbreak.
//!
//! Configuration is read from up to two files, with later sources overriding
//! earlier ones:
//!
//! 1. **User-level config**: `<XDG_CONFIG_HOME>/modbreak/modbreak.toml`
//!    (or `~/.config/modbreak/modbreak.toml`)
//! 2. **Local config**: `Modbreak.toml`, `.modbreak.toml`, `modbreak.toml`
//!    (searched upward from cwd)
//! 3. **CLI arguments**: Override everything (handled separately in the CLI layer)
//!
//! An explicit `--config` path replaces both files.
//!
//! # Usage
//!
//! ```no_run
//! # use modbreak_core::config_hierarchy::load_hierarchical_config;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let hierarchical = load_hierarchical_config(None)?;
//!
//! for source in &hierarchical.sources {
//!     println!("Loaded {:?} config from: {}", source.source_type, source.path.display());
//! }
//!
//! let engine_config = hierarchical.merged.engine_config()?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use crate::config::{
    GeneralConfig, ModbreakConfig, RenameDetectionConfig, discover_and_load_config, load_config,
    load_config_from_path,
};
use crate::engine::RuleSetting;
use crate::error::{ModbreakError, Result};

/// User configuration file name.
const USER_CONFIG_FILE: &str = "modbreak.toml";

/// Which level of the hierarchy a source came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSourceType {
    /// `~/.config/modbreak/modbreak.toml`.
    User,

    /// `Modbreak.toml` or similar, found from the working directory.
    Local,

    /// Explicitly specified via `--config`.
    CliExplicit,
}

/// A single configuration file that was loaded.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// The level this source belongs to.
    pub source_type: ConfigSourceType,

    /// The path to the configuration file.
    pub path: PathBuf,

    /// The parsed configuration from this source.
    pub config: ModbreakConfig,
}

impl ConfigSource {
    /// Creates a new configuration source.
    #[must_use]
    pub const fn new(source_type: ConfigSourceType, path: PathBuf, config: ModbreakConfig) -> Self {
        Self {
            source_type,
            path,
            config,
        }
    }
}

/// All loaded sources plus their merge.
#[derive(Debug, Clone, Default)]
pub struct HierarchicalConfig {
    /// Sources in priority order, lowest first.
    pub sources: Vec<ConfigSource>,

    /// The merged configuration from all sources.
    pub merged: ModbreakConfig,
}

impl HierarchicalConfig {
    /// Creates a new hierarchical configuration result.
    #[must_use]
    pub const fn new(sources: Vec<ConfigSource>, merged: ModbreakConfig) -> Self {
        Self { sources, merged }
    }
}

/// Returns the user configuration directory.
///
/// Uses `XDG_CONFIG_HOME` if set, `~/.config/modbreak` otherwise. On Windows
/// `APPDATA/modbreak` is tried before the home directory.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn get_user_config_dir() -> Result<PathBuf> {
    if let Some(xdg_config) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(xdg_config).join("modbreak"));
    }

    #[cfg(windows)]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return Ok(PathBuf::from(appdata).join("modbreak"));
        }
    }

    if let Some(home) = home_dir() {
        return Ok(home.join(".config").join("modbreak"));
    }

    Err(ModbreakError::config_error(
        "Could not determine user config directory - please set XDG_CONFIG_HOME or HOME",
    ))
}

/// Returns where the user configuration file would live.
///
/// Does not check whether the file exists.
pub fn get_user_config_path() -> Option<PathBuf> {
    get_user_config_dir()
        .ok()
        .map(|dir| dir.join(USER_CONFIG_FILE))
}

/// Loads configuration from every level of the hierarchy.
///
/// If `cli_explicit_path` is provided, only that file is loaded and it must
/// exist. Otherwise the user config and the discovered local config are
/// merged, either of which may be absent.
///
/// # Errors
///
/// Returns an error if a config file exists but cannot be read or parsed,
/// or if the explicit path does not exist.
pub fn load_hierarchical_config(cli_explicit_path: Option<&Path>) -> Result<HierarchicalConfig> {
    if let Some(explicit_path) = cli_explicit_path {
        let mut hierarchical = HierarchicalConfig::default();
        if let Some((path, config)) = load_config(Some(explicit_path))? {
            hierarchical.merged = config.clone();
            hierarchical
                .sources
                .push(ConfigSource::new(ConfigSourceType::CliExplicit, path, config));
        }
        return Ok(hierarchical);
    }

    let mut sources = Vec::new();
    let mut merged = ModbreakConfig::default();

    if let Some(user_path) = get_user_config_path()
        && let Some(config) = load_config_from_path(&user_path)?
    {
        merged = merge_configs(&merged, &config);
        sources.push(ConfigSource::new(ConfigSourceType::User, user_path, config));
    }

    if let Some((path, config)) = discover_and_load_config()? {
        merged = merge_configs(&merged, &config);
        sources.push(ConfigSource::new(ConfigSourceType::Local, path, config));
    }

    tracing::debug!(sources = sources.len(), "Loaded hierarchical config");
    Ok(HierarchicalConfig::new(sources, merged))
}

/// Merges two configurations, with `override_` taking precedence over `base`.
///
/// Scalar settings are taken from `override_` when it sets them. Per-rule
/// settings merge field by field. Ignore entries from both sides are kept,
/// base first, without duplicates.
#[must_use]
pub fn merge_configs(base: &ModbreakConfig, override_: &ModbreakConfig) -> ModbreakConfig {
    let mut rules = base.rules.clone();
    for (key, setting) in &override_.rules {
        let merged = rules
            .get(key)
            .map_or(*setting, |existing| existing.merge(setting));
        rules.insert(key.clone(), merged);
    }

    let mut ignores = Vec::with_capacity(base.ignores.len() + override_.ignores.len());
    for entry in base.ignores.iter().chain(&override_.ignores) {
        if !ignores.contains(entry) {
            ignores.push(entry.clone());
        }
    }

    ModbreakConfig {
        general: base.general.merge(&override_.general),
        rename_detection: base.rename_detection.merge(&override_.rename_detection),
        rules,
        ignores,
    }
}

/// Types that can be layered over another instance of the same type.
pub trait Mergeable: Sized {
    /// Merges this value with another, with `other` taking precedence.
    #[must_use]
    fn merge(&self, other: &Self) -> Self;
}

impl Mergeable for GeneralConfig {
    fn merge(&self, other: &Self) -> Self {
        Self {
            fail_on: other.fail_on.or(self.fail_on),
            format: other.format.or(self.format),
            include_remediation: other.include_remediation.or(self.include_remediation),
            output_file: other
                .output_file
                .clone()
                .or_else(|| self.output_file.clone()),
        }
    }
}

impl Mergeable for RenameDetectionConfig {
    fn merge(&self, other: &Self) -> Self {
        Self {
            enabled: other.enabled.or(self.enabled),
            similarity_threshold: other.similarity_threshold.or(self.similarity_threshold),
        }
    }
}

impl Mergeable for RuleSetting {
    fn merge(&self, other: &Self) -> Self {
        Self {
            enabled: other.enabled.or(self.enabled),
            severity: other.severity.or(self.severity),
        }
    }
}

impl Mergeable for ModbreakConfig {
    fn merge(&self, other: &Self) -> Self {
        merge_configs(self, other)
    }
}

fn home_dir() -> Option<PathBuf> {
    if let Some(home) = std::env::var_os("HOME") {
        return Some(PathBuf::from(home));
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(userprofile) = std::env::var_os("USERPROFILE") {
            return Some(PathBuf::from(userprofile));
        }
    }

    None
}
