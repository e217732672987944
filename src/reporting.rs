//! Report rendering by output format.

use std::fs;
use std::path::Path;

use crate::ci_report::{to_junit, to_sarif};
use crate::cli::OutputFormat;
use crate::cli_report::render_text;
use crate::error::{ModbreakError, Result};
use crate::registry::Registry;
use crate::result::CheckResult;

/// JUnit suite name.
pub const JUNIT_SUITE_NAME: &str = "modbreak";

/// Renders `result` in `format`.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_report(
    result: &CheckResult,
    format: OutputFormat,
    registry: &Registry,
) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(result)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(result)?),
        OutputFormat::Sarif => to_sarif(&result.findings, registry),
        OutputFormat::Junit => to_junit(&result.findings, JUNIT_SUITE_NAME),
    }
}

/// Writes a rendered report to `path`, creating parent directories.
///
/// # Errors
///
/// Returns an `IoError` naming the path on failure.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            ModbreakError::io_error_with_source("create report directory", parent.to_path_buf(), e)
        })?;
    }
    fs::write(path, content)
        .map_err(|e| ModbreakError::io_error_with_source("write report", path.to_path_buf(), e))?;
    tracing::info!(path = %path.display(), "Wrote report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::{Finding, Severity};
    use crate::registry::default_registry;
    use tempfile::TempDir;

    fn result() -> CheckResult {
        let mut result = CheckResult::new(
            "old.json",
            "new.json",
            vec![
                Finding::new(
                    "BC009",
                    "output-removed",
                    Severity::Error,
                    "output \"arn\" was removed",
                )
                .with_subject("arn"),
            ],
            Severity::Error,
        );
        result.compute();
        result
    }

    #[test]
    fn test_json_report_is_the_check_result() {
        let json = render_report(&result(), OutputFormat::Json, default_registry()).unwrap();
        let back: CheckResult = serde_json::from_str(&json).expect("JSON report should parse back");
        assert_eq!(back, result());
    }

    #[test]
    fn test_yaml_report_has_verdict() {
        let yaml = render_report(&result(), OutputFormat::Yaml, default_registry()).unwrap();
        assert!(yaml.contains("result: FAIL"), "YAML should carry the verdict: {yaml}");
    }

    #[test]
    fn test_every_format_renders() {
        for format in [OutputFormat::Text, OutputFormat::Sarif, OutputFormat::Junit] {
            let out = render_report(&result(), format, default_registry())
                .unwrap_or_else(|e| panic!("{format} should render: {e}"));
            assert!(out.contains("BC009"), "{format} output should mention the rule");
        }
    }

    #[test]
    fn test_write_report_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports").join("modbreak.sarif");

        write_report("{}", &path).expect("write should succeed");

        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }
}
