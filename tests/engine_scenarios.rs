//! End-to-end comparisons over snapshot fixtures and hand-built snapshots.

use std::path::{Path, PathBuf};

use modbreak_core::engine::{CheckOptions, Engine, EngineConfig};
use modbreak_core::rules::moved::META_CHECK;
use modbreak_core::snapshot::{
    ModuleCallSignature, MovedBlock, ResourceSignature, VariableSignature,
};
use modbreak_core::{
    IgnoreRule, ModbreakConfig, ModuleSnapshot, RenameDetection, Severity, Verdict,
};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn web_module() -> (ModuleSnapshot, ModuleSnapshot) {
    let old = ModuleSnapshot::from_json_file(&fixture("web_module_v1.json"))
        .expect("v1 fixture should load");
    let new = ModuleSnapshot::from_json_file(&fixture("web_module_v2.json"))
        .expect("v2 fixture should load");
    (old, new)
}

fn rule_ids(result: &modbreak_core::CheckResult) -> Vec<&str> {
    result.findings.iter().map(|f| f.rule_id.as_str()).collect()
}

#[test]
fn web_module_upgrade_reports_every_change_in_registry_order() {
    let (old, new) = web_module();

    let result = Engine::new(EngineConfig::default()).check(&old, &new);

    assert_eq!(
        rule_ids(&result),
        vec!["BC001", "BC002", "RC006", "BC009", "RC011", "RC014", "RC105", "RC201"]
    );
    assert_eq!(result.summary.error, 3);
    assert_eq!(result.summary.warning, 5);
    assert_eq!(result.result, Verdict::Fail);
    assert_eq!(result.old_path, "modules/web@v1");
}

#[test]
fn web_module_upgrade_with_rename_detection_collapses_the_api_key_change() {
    let (old, new) = web_module();
    let config = EngineConfig::default().with_rename(RenameDetection::with_threshold(0.6));

    let result = Engine::new(config).check(&old, &new);

    assert_eq!(
        rule_ids(&result),
        vec!["BC003", "RC006", "BC009", "RC011", "RC014", "RC105", "RC201"],
        "the rename should replace both the addition and the removal"
    );
    let rename = &result.findings[0];
    assert_eq!(rename.subject.as_deref(), Some("api_key"));
    assert_eq!(rename.meta("new_name"), Some("api_key_v2"));
}

#[test]
fn moved_block_prevents_resource_removal_finding() {
    let (old, new) = web_module();
    let result = Engine::new(EngineConfig::default()).check(&old, &new);

    assert!(
        !result.findings.iter().any(|f| f.rule_id == "BC100"),
        "aws_instance.web is covered by a moved block"
    );

    let mut without_moved = new.clone();
    without_moved.moved_blocks.clear();
    let result = Engine::new(EngineConfig::default()).check(&old, &without_moved);
    let removal = result
        .findings
        .iter()
        .find(|f| f.rule_id == "BC100")
        .expect("removal without moved block is reported");
    assert_eq!(removal.subject.as_deref(), Some("aws_instance.web"));
}

#[test]
fn validation_value_removal_names_the_value() {
    let (old, new) = web_module();
    let result = Engine::new(EngineConfig::default()).check(&old, &new);

    let finding = result
        .findings
        .iter()
        .find(|f| f.rule_id == "RC014")
        .expect("RC014 should fire");
    assert_eq!(finding.message, "input \"environment\" no longer allows \"staging\"");
    assert_eq!(finding.meta("removed_values"), Some("staging"));
}

#[test]
fn configuration_drives_severity_ignores_and_threshold() {
    let (old, new) = web_module();
    let config: ModbreakConfig = toml::from_str(
        r#"
[general]
fail_on = "warning"

[rules.input-default-changed]
enabled = false

[rules.BC001]
severity = "warning"

[[ignore]]
rule = "output-removed"
subject = "endpoint"
reason = "endpoint moved to the load balancer module"
"#,
    )
    .expect("config should parse");

    let engine = Engine::new(config.engine_config().expect("config should be valid"));
    let result = engine.check(&old, &new);

    assert!(!rule_ids(&result).contains(&"RC006"), "disabled by name");
    let bc001 = result.findings.iter().find(|f| f.rule_id == "BC001").unwrap();
    assert_eq!(bc001.severity, Severity::Warning);
    let bc009 = result.findings.iter().find(|f| f.rule_id == "BC009").unwrap();
    assert!(bc009.ignored);
    assert_eq!(result.summary.ignored, 1);
    assert_eq!(result.summary.error, 1, "only BC002 remains an error");
    assert_eq!(result.result, Verdict::Fail);
}

#[test]
fn ignoring_every_error_at_error_threshold_passes() {
    let (old, new) = web_module();
    let config = EngineConfig::default()
        .with_ignore(IgnoreRule::new("BC001"))
        .with_ignore(IgnoreRule::new("BC002"))
        .with_ignore(IgnoreRule::new("BC009"));

    let result = Engine::new(config).check(&old, &new);

    assert_eq!(result.summary.error, 0);
    assert_eq!(result.summary.warning, 5);
    assert_eq!(result.result, Verdict::Pass, "warnings do not fail at the default threshold");
}

#[test]
fn remediation_is_attached_only_on_request() {
    let (old, new) = web_module();
    let engine = Engine::new(EngineConfig::default());

    let plain = engine.check(&old, &new);
    assert!(plain.findings.iter().all(|f| f.remediation.is_none()));

    let detailed = engine.check_with_options(
        &old,
        &new,
        &CheckOptions {
            include_remediation: true,
        },
    );
    assert!(detailed.findings.iter().all(|f| f.remediation.is_some()));
}

#[test]
fn identical_fixture_passes() {
    let (old, _) = web_module();

    let result = Engine::new(EngineConfig::default()).check(&old, &old);

    assert!(result.findings.is_empty());
    assert_eq!(result.result, Verdict::Pass);
}

#[test]
fn moved_cycle_and_dangling_target_are_reported_once_each() {
    let old = ModuleSnapshot::new("old")
        .with_resource(ResourceSignature::new("aws_s3_bucket", "a"))
        .with_resource(ResourceSignature::new("aws_s3_bucket", "b"));
    let new = ModuleSnapshot::new("new")
        .with_resource(ResourceSignature::new("aws_s3_bucket", "a"))
        .with_resource(ResourceSignature::new("aws_s3_bucket", "b"))
        .with_moved(MovedBlock::new("aws_s3_bucket.a", "aws_s3_bucket.b"))
        .with_moved(MovedBlock::new("aws_s3_bucket.b", "aws_s3_bucket.a"))
        .with_moved(MovedBlock::new("aws_s3_bucket.c", "aws_s3_bucket.d"));

    let result = Engine::new(EngineConfig::default()).check(&old, &new);

    let checks: Vec<&str> = result
        .findings
        .iter()
        .filter(|f| f.rule_id == "BC103")
        .filter_map(|f| f.meta(META_CHECK))
        .collect();
    assert_eq!(checks, vec!["cycle", "dangling"]);
}

#[test]
fn module_moved_into_resource_address_is_invalid() {
    let old = ModuleSnapshot::new("old")
        .with_module_call(ModuleCallSignature::new("network", "./modules/network"));
    let new = ModuleSnapshot::new("new")
        .with_resource(ResourceSignature::new("aws_vpc", "main"))
        .with_moved(MovedBlock::new("module.network", "aws_vpc.main"));

    let result = Engine::new(EngineConfig::default()).check(&old, &new);

    let invalid = result
        .findings
        .iter()
        .find(|f| f.rule_id == "BC102")
        .expect("kind mismatch should be reported");
    assert_eq!(
        invalid.detail.as_deref(),
        Some("moves a module address to a resource address")
    );
    assert!(
        !rule_ids(&result).contains(&"BC101"),
        "the module call is covered by the moved block"
    );
}

#[test]
fn optional_rename_keeps_the_new_input_quiet() {
    let old = ModuleSnapshot::new("old").with_variable(VariableSignature::new("subnet_id"));
    let new = ModuleSnapshot::new("new").with_variable(
        VariableSignature::new("subnet_ids").with_default(serde_json::json!([])),
    );
    let config = EngineConfig::default().with_rename(RenameDetection::enabled());

    let result = Engine::new(config).check(&old, &new);

    assert_eq!(rule_ids(&result), vec!["RC003"]);
    assert_eq!(result.result, Verdict::Pass);
}

#[test]
fn malformed_snapshot_is_a_parse_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ \"variables\": [1, 2] }").unwrap();

    let err = ModuleSnapshot::from_json_file(&path).unwrap_err();

    assert_eq!(err.name(), "ParseError");
    assert!(err.to_string().contains("broken.json"));
}
