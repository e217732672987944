//! CI/CD platform report generation.
//!
//! Provides SARIF and JUnit XML output formats for code-scanning dashboards
//! and CI test reporters.
//!
//! # Example
//!
//! ```rust
//! use modbreak_core::ci_report::{to_junit, to_sarif};
//! use modbreak_core::registry::default_registry;
//! use modbreak_core::{Finding, Severity};
//!
//! let findings = vec![
//!     Finding::new("BC002", "input-removed", Severity::Error, "input \"region\" was removed")
//!         .with_subject("region"),
//! ];
//!
//! let sarif = to_sarif(&findings, default_registry())?;
//! let junit = to_junit(&findings, "modbreak")?;
//! assert!(sarif.contains("\"ruleId\": \"BC002\""));
//! assert!(junit.contains("<failure"));
//! # Ok::<(), modbreak_core::error::ModbreakError>(())
//! ```

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::finding::{Finding, Severity, SourceLocation};
use crate::registry::Registry;

const SARIF_VERSION: &str = "2.1.0";
const SARIF_SCHEMA: &str = "https://json.schemastore.org/sarif-2.1.0.json";
const TOOL_NAME: &str = "modbreak";
const MAX_TESTCASE_NAME: usize = 200;

/// Converts findings to SARIF v2.1.0.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
///
/// # SARIF Format
///
/// - `tool.driver.rules[]` holds one entry per rule that produced a finding,
///   in registry order, with descriptions taken from the registry
/// - `results[].level` is `error`, `warning` or `note`
/// - `results[].locations[]` points at the new declaration, or the old one
///   for removals
/// - `results[].partialFingerprints["modbreak/v1"]` is [`Finding::fingerprint`]
/// - ignored findings carry an external `suppressions` entry
pub fn to_sarif(findings: &[Finding], registry: &Registry) -> Result<String> {
    let mut unique_rules: IndexMap<&str, SarifRule> = IndexMap::new();
    for finding in findings {
        unique_rules
            .entry(finding.rule_id.as_str())
            .or_insert_with(|| SarifRule::for_finding(finding, registry));
    }
    let mut rules: Vec<SarifRule> = unique_rules.into_values().collect();
    let order = registry.ids();
    rules.sort_by_key(|rule| {
        order
            .iter()
            .position(|id| *id == rule.id)
            .unwrap_or(usize::MAX)
    });

    let sarif_log = SarifLog {
        version: SARIF_VERSION,
        schema: SARIF_SCHEMA,
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: TOOL_NAME,
                    version: env!("CARGO_PKG_VERSION"),
                    rules,
                },
            },
            results: findings.iter().map(SarifResult::from_finding).collect(),
        }],
    };

    Ok(serde_json::to_string_pretty(&sarif_log)?)
}

/// Converts findings to JUnit XML.
///
/// # Errors
///
/// Never fails today; the `Result` mirrors the other renderers.
///
/// # JUnit Format
///
/// - Each finding becomes a `<testcase>` in class `modbreak.<rule id>`
/// - Error findings add a `<failure>` element
/// - Warning findings add a `<system-out>` element and pass
/// - Notice findings pass without extra elements
/// - Ignored findings are `<skipped>` whatever their severity
/// - An empty finding list still produces one passing placeholder test
pub fn to_junit(findings: &[Finding], suite_name: &str) -> Result<String> {
    let failure_count = findings
        .iter()
        .filter(|f| !f.ignored && f.severity == Severity::Error)
        .count();
    let skipped_count = findings.iter().filter(|f| f.ignored).count();
    let testcase_count = findings.len().max(1);

    let suite = escape_xml(suite_name);
    let counts = format!(
        "tests=\"{testcase_count}\" failures=\"{failure_count}\" errors=\"0\" \
         skipped=\"{skipped_count}\""
    );

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
    xml.push_str(&format!("<testsuites name=\"{suite}\" {counts}>"));
    xml.push_str(&format!("<testsuite name=\"{suite}\" {counts}>"));

    if findings.is_empty() {
        xml.push_str(&format!("<testcase name=\"{suite}\" classname=\"{suite}\"/>"));
    }

    for finding in findings {
        let classname = format!("{TOOL_NAME}.{}", finding.rule_id);
        let testcase_name = truncate_testcase_name(&finding.message);
        let located = match finding.primary_location() {
            Some(loc) => format!("{loc}: {}", finding.message),
            None => finding.message.clone(),
        };

        xml.push_str(&format!(
            "<testcase name=\"{}\" classname=\"{}\">",
            escape_xml(&testcase_name),
            escape_xml(&classname)
        ));

        if finding.ignored {
            let reason = finding.ignore_reason.as_deref().unwrap_or("ignored by configuration");
            xml.push_str(&format!("<skipped message=\"{}\"/>", escape_xml(reason)));
        } else {
            match finding.severity {
                Severity::Error => {
                    xml.push_str(&format!("<failure message=\"{}\">", escape_xml(&located)));
                    if let Some(detail) = &finding.detail {
                        xml.push_str(&escape_xml(detail));
                    }
                    if let Some(remediation) = &finding.remediation {
                        xml.push_str(&format!("\nRemediation: {}", escape_xml(remediation)));
                    }
                    xml.push_str("</failure>");
                }
                Severity::Warning => {
                    xml.push_str("<system-out>");
                    xml.push_str(&escape_xml(&located));
                    if let Some(detail) = &finding.detail {
                        xml.push_str(&format!("\n{}", escape_xml(detail)));
                    }
                    xml.push_str("</system-out>");
                }
                Severity::Notice => {}
            }
        }

        xml.push_str("</testcase>");
    }

    xml.push_str("</testsuite>");
    xml.push_str("</testsuites>");

    Ok(xml)
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// JUnit parsers may choke on very long names.
fn truncate_testcase_name(name: &str) -> String {
    if name.chars().count() > MAX_TESTCASE_NAME {
        let head: String = name.chars().take(MAX_TESTCASE_NAME - 3).collect();
        format!("{head}...")
    } else {
        name.to_string()
    }
}

// SARIF types for serialization

#[derive(Debug, Serialize)]
struct SarifLog {
    version: &'static str,
    #[serde(rename = "$schema")]
    schema: &'static str,
    runs: Vec<SarifRun>,
}

#[derive(Debug, Serialize)]
struct SarifRun {
    tool: SarifTool,
    results: Vec<SarifResult>,
}

#[derive(Debug, Serialize)]
struct SarifTool {
    driver: SarifDriver,
}

#[derive(Debug, Serialize)]
struct SarifDriver {
    name: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    rules: Vec<SarifRule>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRule {
    id: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    short_description: Option<SarifMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    help: Option<SarifMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_configuration: Option<SarifConfiguration>,
}

impl SarifRule {
    fn for_finding(finding: &Finding, registry: &Registry) -> Self {
        let Some(rule) = registry.get(&finding.rule_id) else {
            return Self {
                id: finding.rule_id.clone(),
                name: finding.rule_name.clone(),
                short_description: None,
                help: None,
                default_configuration: None,
            };
        };
        let doc = rule.doc();
        Self {
            id: doc.id.to_string(),
            name: doc.name.to_string(),
            short_description: Some(SarifMessage::new(doc.description)),
            help: Some(SarifMessage::new(doc.remediation)),
            default_configuration: Some(SarifConfiguration {
                level: doc.default_severity.to_sarif_level(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct SarifConfiguration {
    level: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifResult {
    rule_id: String,
    level: &'static str,
    message: SarifMessage,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    locations: Vec<SarifLocation>,
    partial_fingerprints: BTreeMap<&'static str, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    suppressions: Vec<SarifSuppression>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    properties: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct SarifMessage {
    text: String,
}

impl SarifMessage {
    fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifLocation {
    physical_location: SarifPhysicalLocation,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifPhysicalLocation {
    artifact_location: SarifArtifactLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<SarifRegion>,
}

#[derive(Debug, Serialize)]
struct SarifArtifactLocation {
    uri: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRegion {
    start_line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_column: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_column: Option<usize>,
}

#[derive(Debug, Serialize)]
struct SarifSuppression {
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    justification: Option<String>,
}

impl SarifLocation {
    fn from_source(loc: &SourceLocation) -> Self {
        let region = (loc.line > 0).then(|| SarifRegion {
            start_line: loc.line,
            start_column: loc.column,
            end_line: loc.end_line,
            end_column: loc.end_column,
        });
        Self {
            physical_location: SarifPhysicalLocation {
                artifact_location: SarifArtifactLocation {
                    uri: loc.file.replace('\\', "/"),
                },
                region,
            },
        }
    }
}

impl SarifResult {
    fn from_finding(finding: &Finding) -> Self {
        let text = match &finding.detail {
            Some(detail) => format!("{} ({detail})", finding.message),
            None => finding.message.clone(),
        };

        let mut properties = finding.metadata.clone();
        if let Some(subject) = &finding.subject {
            properties.insert("subject".to_string(), subject.clone());
        }

        let suppressions = if finding.ignored {
            vec![SarifSuppression {
                kind: "external",
                justification: finding.ignore_reason.clone(),
            }]
        } else {
            Vec::new()
        };

        Self {
            rule_id: finding.rule_id.clone(),
            level: finding.severity.to_sarif_level(),
            message: SarifMessage::new(text),
            locations: finding
                .primary_location()
                .map(SarifLocation::from_source)
                .into_iter()
                .collect(),
            partial_fingerprints: BTreeMap::from([("modbreak/v1", finding.fingerprint())]),
            suppressions,
            properties,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::default_registry;

    fn removal() -> Finding {
        Finding::new(
            "BC002",
            "input-removed",
            Severity::Error,
            "input \"region\" was removed",
        )
        .with_subject("region")
        .with_old_location(&SourceLocation::new("variables.tf", 12))
    }

    fn parse(json: &str) -> serde_json::Value {
        serde_json::from_str(json).expect("Generated SARIF should be valid JSON")
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("normal"), "normal");
        assert_eq!(escape_xml("a < b"), "a &lt; b");
        assert_eq!(escape_xml("a & b"), "a &amp; b");
        assert_eq!(escape_xml("\"quoted\""), "&quot;quoted&quot;");
        assert_eq!(escape_xml("'apostrophe'"), "&apos;apostrophe&apos;");
    }

    #[test]
    fn test_truncate_testcase_name_long() {
        let truncated = truncate_testcase_name(&"a".repeat(300));
        assert_eq!(truncated.chars().count(), MAX_TESTCASE_NAME);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn test_truncate_testcase_name_respects_char_boundaries() {
        let name = "é".repeat(250);
        let truncated = truncate_testcase_name(&name);
        assert!(truncated.starts_with('é'), "multi-byte names must not panic");
    }

    #[test]
    fn test_to_sarif_empty() {
        let parsed = parse(&to_sarif(&[], default_registry()).unwrap());

        assert_eq!(parsed["version"], "2.1.0");
        assert_eq!(parsed["runs"][0]["tool"]["driver"]["name"], "modbreak");
        assert_eq!(
            parsed["runs"][0]["results"].as_array().map_or(99, Vec::len),
            0
        );
    }

    #[test]
    fn test_to_sarif_result_fields() {
        let parsed = parse(&to_sarif(&[removal()], default_registry()).unwrap());
        let result = &parsed["runs"][0]["results"][0];

        assert_eq!(result["ruleId"], "BC002");
        assert_eq!(result["level"], "error");
        assert_eq!(
            result["locations"][0]["physicalLocation"]["artifactLocation"]["uri"],
            "variables.tf"
        );
        assert_eq!(
            result["locations"][0]["physicalLocation"]["region"]["startLine"],
            12
        );
        assert_eq!(
            result["partialFingerprints"]["modbreak/v1"],
            removal().fingerprint().as_str()
        );
        assert_eq!(result["properties"]["subject"], "region");
        assert!(result.get("suppressions").is_none());
    }

    #[test]
    fn test_to_sarif_rule_metadata_comes_from_registry() {
        let parsed = parse(&to_sarif(&[removal(), removal()], default_registry()).unwrap());
        let rules = parsed["runs"][0]["tool"]["driver"]["rules"]
            .as_array()
            .expect("rules should be an array");

        assert_eq!(rules.len(), 1, "rules are de-duplicated");
        assert_eq!(rules[0]["name"], "input-removed");
        assert!(rules[0]["shortDescription"]["text"].is_string());
        assert_eq!(rules[0]["defaultConfiguration"]["level"], "error");
    }

    #[test]
    fn test_to_sarif_notice_maps_to_note_and_ignored_is_suppressed() {
        let finding = Finding::new("RC006", "input-default-changed", Severity::Notice, "m")
            .with_ignored(Some("accepted".into()));
        let parsed = parse(&to_sarif(&[finding], default_registry()).unwrap());
        let result = &parsed["runs"][0]["results"][0];

        assert_eq!(result["level"], "note");
        assert_eq!(result["suppressions"][0]["kind"], "external");
        assert_eq!(result["suppressions"][0]["justification"], "accepted");
    }

    #[test]
    fn test_to_junit_empty() {
        let xml = to_junit(&[], "test-suite").unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("name=\"test-suite\""));
        assert!(xml.contains("tests=\"1\""));
        assert!(xml.contains("failures=\"0\""));
    }

    #[test]
    fn test_to_junit_error_is_failure_with_location() {
        let xml = to_junit(&[removal()], "suite").unwrap();

        assert!(xml.contains("classname=\"modbreak.BC002\""));
        assert!(xml.contains(
            "<failure message=\"variables.tf:12: input &quot;region&quot; was removed\">"
        ));
        assert!(xml.contains("failures=\"1\""));
    }

    #[test]
    fn test_to_junit_warning_closes_testcase() {
        let finding = Finding::new("RC006", "input-default-changed", Severity::Warning, "w");
        let xml = to_junit(&[finding], "suite").unwrap();

        assert!(xml.contains("<system-out>w</system-out></testcase>"));
        assert!(!xml.contains("<failure"));
    }

    #[test]
    fn test_to_junit_notice_passes() {
        let finding = Finding::new("RC013", "input-validation-added", Severity::Notice, "n");
        let xml = to_junit(&[finding], "suite").unwrap();

        assert!(xml.contains("classname=\"modbreak.RC013\"></testcase>"));
        assert!(!xml.contains("<system-out>"));
    }

    #[test]
    fn test_to_junit_ignored_error_is_skipped() {
        let xml = to_junit(&[removal().with_ignored(Some("planned".into()))], "suite").unwrap();

        assert!(xml.contains("<skipped message=\"planned\"/>"));
        assert!(xml.contains("failures=\"0\""));
        assert!(xml.contains("skipped=\"1\""));
    }
}
