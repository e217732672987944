//! Integration tests for hierarchical configuration loading.
//!
//! These tests change the working directory and `XDG_CONFIG_HOME`, so every
//! test that loads the hierarchy runs serially.

use modbreak_core::config_hierarchy::{ConfigSourceType, load_hierarchical_config};
use modbreak_core::engine::Engine;
use modbreak_core::snapshot::VariableSignature;
use modbreak_core::{ModuleSnapshot, Severity, Verdict};
use serial_test::serial;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Restores the working directory and `XDG_CONFIG_HOME` when dropped.
struct EnvGuard {
    cwd: PathBuf,
    xdg: Option<OsString>,
}

impl EnvGuard {
    fn enter(dir: &Path, xdg: &Path) -> Self {
        let guard = Self {
            cwd: std::env::current_dir().expect("cwd should be readable"),
            xdg: std::env::var_os("XDG_CONFIG_HOME"),
        };
        unsafe { std::env::set_var("XDG_CONFIG_HOME", xdg) };
        std::env::set_current_dir(dir).expect("Failed to cd to temp dir");
        guard
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.cwd);
        match self.xdg.take() {
            Some(value) => unsafe { std::env::set_var("XDG_CONFIG_HOME", value) },
            None => unsafe { std::env::remove_var("XDG_CONFIG_HOME") },
        }
    }
}

fn write_file(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().expect("config has parent"))
        .expect("Failed to create config dir");
    fs::write(path, content).expect("Failed to write config");
}

const USER_CONFIG: &str = r#"
[general]
fail_on = "warning"
format = "json"

[rename_detection]
similarity_threshold = 0.6

[[ignore]]
rule = "BC002"
subject = "legacy_flag"
reason = "removed upstream"
"#;

const LOCAL_CONFIG: &str = r#"
[general]
fail_on = "error"

[rename_detection]
enabled = true

[rules.input-removed]
severity = "warning"
"#;

#[test]
#[serial]
fn integration_user_and_local_layers_merge_in_priority_order() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let xdg = temp_dir.path().join("xdg");
    let project = temp_dir.path().join("project");
    write_file(&xdg.join("modbreak").join("modbreak.toml"), USER_CONFIG);
    write_file(&project.join("Modbreak.toml"), LOCAL_CONFIG);

    let result = {
        let _guard = EnvGuard::enter(&project, &xdg);
        load_hierarchical_config(None)
    };
    let hierarchical = result.expect("load_hierarchical_config should succeed");

    let kinds: Vec<ConfigSourceType> = hierarchical.sources.iter().map(|s| s.source_type).collect();
    assert_eq!(kinds, vec![ConfigSourceType::User, ConfigSourceType::Local]);

    let merged = &hierarchical.merged;
    assert_eq!(merged.general.fail_on, Some(Severity::Error), "local wins");
    assert_eq!(
        merged.general.format,
        Some(modbreak_core::cli::OutputFormat::Json),
        "unset local values fall back to the user config"
    );
    let rename = merged.rename_detection.resolve();
    assert!(rename.enabled);
    assert!((rename.similarity_threshold - 0.6).abs() < f64::EPSILON);
    assert_eq!(merged.ignores.len(), 1);
}

#[test]
#[serial]
fn integration_local_config_is_found_from_a_subdirectory() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let xdg = temp_dir.path().join("empty-xdg");
    let project = temp_dir.path().join("project");
    let nested = project.join("modules").join("web");
    write_file(&project.join(".modbreak.toml"), LOCAL_CONFIG);
    fs::create_dir_all(&nested).unwrap();

    let result = {
        let _guard = EnvGuard::enter(&nested, &xdg);
        load_hierarchical_config(None)
    };
    let hierarchical = result.expect("discovery should succeed");

    assert_eq!(hierarchical.sources.len(), 1);
    assert_eq!(hierarchical.sources[0].source_type, ConfigSourceType::Local);
    assert!(hierarchical.sources[0].path.ends_with(".modbreak.toml"));
}

#[test]
#[serial]
fn integration_explicit_config_replaces_user_and_local() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let xdg = temp_dir.path().join("xdg");
    let project = temp_dir.path().join("project");
    let explicit = temp_dir.path().join("ci").join("modbreak-ci.toml");
    write_file(&xdg.join("modbreak").join("modbreak.toml"), USER_CONFIG);
    write_file(&project.join("Modbreak.toml"), LOCAL_CONFIG);
    write_file(&explicit, "[general]\nfail_on = \"notice\"\n");

    let result = {
        let _guard = EnvGuard::enter(&project, &xdg);
        load_hierarchical_config(Some(&explicit))
    };
    let hierarchical = result.expect("explicit config should load");

    assert_eq!(hierarchical.sources.len(), 1);
    assert_eq!(
        hierarchical.sources[0].source_type,
        ConfigSourceType::CliExplicit
    );
    assert_eq!(hierarchical.merged.general.fail_on, Some(Severity::Notice));
    assert!(hierarchical.merged.ignores.is_empty(), "user ignores are not loaded");
}

#[test]
#[serial]
fn integration_invalid_local_config_is_reported() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let xdg = temp_dir.path().join("xdg");
    let project = temp_dir.path().join("project");
    write_file(&project.join("Modbreak.toml"), "[general]\nfail_on = \"fatal\"\n");

    let result = {
        let _guard = EnvGuard::enter(&project, &xdg);
        load_hierarchical_config(None)
    };

    let err = result.expect_err("an unknown severity should not parse");
    assert!(
        err.to_string().contains("Modbreak.toml"),
        "error should name the file: {err}"
    );
}

#[test]
#[serial]
fn integration_merged_config_drives_the_engine() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let xdg = temp_dir.path().join("xdg");
    let project = temp_dir.path().join("project");
    write_file(&xdg.join("modbreak").join("modbreak.toml"), USER_CONFIG);
    write_file(&project.join("Modbreak.toml"), LOCAL_CONFIG);

    let result = {
        let _guard = EnvGuard::enter(&project, &xdg);
        load_hierarchical_config(None)
    };
    let merged = result.unwrap().merged;
    let engine = Engine::new(merged.engine_config().expect("merged config should be valid"));

    let old = ModuleSnapshot::new("v1")
        .with_variable(VariableSignature::new("legacy_flag"))
        .with_variable(VariableSignature::new("zone"));
    let new = ModuleSnapshot::new("v2");
    let result = engine.check(&old, &new);

    assert_eq!(result.findings.len(), 2);
    assert!(result.findings.iter().all(|f| f.severity == Severity::Warning));
    assert_eq!(result.summary.ignored, 1, "legacy_flag is ignored by the user config");
    assert_eq!(result.result, Verdict::Pass, "local fail_on=error wins over user warning");
}
