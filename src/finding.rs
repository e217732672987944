//! Findings and the severity scale.
//!
//! A [`Finding`] is one reported difference between two snapshots. Rules build
//! findings with the consuming `with_*` methods and hand them to the engine;
//! after that they are treated as values.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ModbreakError;
use crate::rule::RuleDoc;

/// Metadata key carrying the pre-rename name on rename findings.
pub const META_OLD_NAME: &str = "old_name";
/// Metadata key carrying the post-rename name on rename findings.
pub const META_NEW_NAME: &str = "new_name";
/// Metadata key carrying the rename similarity score.
pub const META_SIMILARITY: &str = "similarity";

/// Ordered severity scale, lowest first.
///
/// Ordering is numeric, so "at least as severe as" is a plain `>=`:
///
/// ```
/// use modbreak_core::Severity;
///
/// assert!(Severity::Error >= Severity::Warning);
/// assert!(Severity::Warning >= Severity::Notice);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational change, never breaks callers.
    Notice,
    /// Risky change that may break some callers.
    Warning,
    /// Breaking change.
    Error,
}

impl Severity {
    /// All tiers, lowest first.
    pub const ALL: [Severity; 3] = [Severity::Notice, Severity::Warning, Severity::Error];

    /// Returns the SARIF level string for this severity.
    #[must_use]
    pub const fn to_sarif_level(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Notice => "note",
        }
    }

    /// Lowercase name used in configuration files and JSON.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Notice => "notice",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ModbreakError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" | "breaking" => Ok(Self::Error),
            "warning" | "risky" => Ok(Self::Warning),
            "notice" | "note" | "info" => Ok(Self::Notice),
            other => {
                let expected: Vec<&str> = Self::ALL.iter().map(|s| s.as_str()).collect();
                Err(ModbreakError::invalid_input_with_arg(
                    format!("expected one of: {}", expected.join(", ")),
                    other,
                ))
            }
        }
    }
}

/// Position of a declaration in the module's source files.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Module-relative file path with forward slashes.
    pub file: String,
    /// 1-indexed start line.
    pub line: usize,
    /// 1-indexed start column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    /// 1-indexed end line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
    /// 1-indexed end column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_column: Option<usize>,
}

impl SourceLocation {
    /// Creates a location with just a file and line.
    #[must_use]
    pub fn new(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column: None,
            end_line: None,
            end_column: None,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}", self.file)
        } else {
            write!(f, "{}:{}", self.file, self.line)
        }
    }
}

/// One reported semantic difference between two snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Identifier of the rule that produced this finding (e.g. `BC001`).
    pub rule_id: String,
    /// Human-readable rule name (e.g. `required-input-added`).
    pub rule_name: String,
    /// Effective severity after configuration overrides.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Extra explanation, such as the before/after values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Name of the entity this finding is about.
    ///
    /// Cross-rule suppression keys on this field, never on the message text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Where the entity was declared in the old snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_location: Option<SourceLocation>,
    /// Where the entity is declared in the new snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_location: Option<SourceLocation>,
    /// Set by the ignore list; ignored findings never fail a check.
    #[serde(default)]
    pub ignored: bool,
    /// Why the finding was ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_reason: Option<String>,
    /// Rule-specific key/value pairs (`old_name`, `new_name`, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    /// Remediation text from the rule documentation, filled on request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl Finding {
    /// Creates a finding with the given identity, severity and message.
    #[must_use]
    pub fn new(
        rule_id: impl Into<String>,
        rule_name: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            rule_name: rule_name.into(),
            severity,
            message: message.into(),
            detail: None,
            subject: None,
            old_location: None,
            new_location: None,
            ignored: false,
            ignore_reason: None,
            metadata: BTreeMap::new(),
            remediation: None,
        }
    }

    /// Creates a finding for `doc`'s rule at the rule's default severity.
    #[must_use]
    pub fn from_rule(doc: &RuleDoc, message: impl Into<String>) -> Self {
        Self::new(doc.id, doc.name, doc.default_severity, message)
    }

    /// Sets the detail text.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Sets the subject name.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the old-snapshot location.
    #[must_use]
    pub fn with_old_location(mut self, location: &SourceLocation) -> Self {
        self.old_location = Some(location.clone());
        self
    }

    /// Sets the new-snapshot location.
    #[must_use]
    pub fn with_new_location(mut self, location: &SourceLocation) -> Self {
        self.new_location = Some(location.clone());
        self
    }

    /// Adds one metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Replaces the severity.
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Sets the remediation text.
    #[must_use]
    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }

    /// Marks the finding ignored.
    #[must_use]
    pub fn with_ignored(mut self, reason: Option<String>) -> Self {
        self.ignored = true;
        self.ignore_reason = reason;
        self
    }

    /// Returns a metadata value.
    #[must_use]
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// The most relevant location: the new one if present, otherwise the old one.
    #[must_use]
    pub fn primary_location(&self) -> Option<&SourceLocation> {
        self.new_location.as_ref().or(self.old_location.as_ref())
    }

    /// Stable fingerprint derived from rule id, subject and message.
    ///
    /// Locations are not part of the fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.rule_id.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.subject.as_deref().unwrap_or_default().as_bytes());
        hasher.update([0u8]);
        hasher.update(self.message.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering_is_numeric() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Notice);
        assert_eq!(
            Severity::ALL.iter().max(),
            Some(&Severity::Error),
            "Error should be the highest tier"
        );
    }

    #[test]
    fn test_severity_to_sarif_level() {
        assert_eq!(Severity::Error.to_sarif_level(), "error");
        assert_eq!(Severity::Warning.to_sarif_level(), "warning");
        assert_eq!(Severity::Notice.to_sarif_level(), "note");
    }

    #[test]
    fn test_severity_from_str_accepts_aliases() {
        assert_eq!("breaking".parse::<Severity>().unwrap(), Severity::Error);
        assert_eq!("Risky".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!("note".parse::<Severity>().unwrap(), Severity::Notice);
        assert!("fatal".parse::<Severity>().is_err());
    }

    #[test]
    fn test_severity_from_str_error_lists_every_tier() {
        let err = "fatal".parse::<Severity>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid input 'fatal': expected one of: notice, warning, error"
        );
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        let json = serde_json::to_string(&Severity::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
    }

    #[test]
    fn test_builder_populates_optional_fields() {
        let loc = SourceLocation::new("variables.tf", 12);
        let finding = Finding::new("BC002", "input-removed", Severity::Error, "gone")
            .with_subject("region")
            .with_detail("was string")
            .with_old_location(&loc)
            .with_metadata("k", "v");

        assert_eq!(finding.subject.as_deref(), Some("region"));
        assert_eq!(finding.detail.as_deref(), Some("was string"));
        assert_eq!(finding.meta("k"), Some("v"));
        assert_eq!(finding.primary_location(), Some(&loc));
        assert!(!finding.ignored, "findings start out not ignored");
    }

    #[test]
    fn test_primary_location_prefers_new() {
        let old = SourceLocation::new("old.tf", 1);
        let new = SourceLocation::new("new.tf", 2);
        let finding = Finding::new("X", "x", Severity::Notice, "m")
            .with_old_location(&old)
            .with_new_location(&new);
        assert_eq!(finding.primary_location(), Some(&new));
    }

    #[test]
    fn test_fingerprint_ignores_location_but_not_subject() {
        let a = Finding::new("BC002", "input-removed", Severity::Error, "m").with_subject("a");
        let moved = a.clone().with_old_location(&SourceLocation::new("f.tf", 99));
        let other = Finding::new("BC002", "input-removed", Severity::Error, "m").with_subject("b");

        assert_eq!(a.fingerprint(), moved.fingerprint());
        assert_ne!(a.fingerprint(), other.fingerprint());
        assert_eq!(a.fingerprint().len(), 64, "sha256 hex digest");
    }

    #[test]
    fn test_location_display() {
        assert_eq!(SourceLocation::new("main.tf", 7).to_string(), "main.tf:7");
        assert_eq!(SourceLocation::new("main.tf", 0).to_string(), "main.tf");
    }
}
