//! Configuration-driven ignore list.
//!
//! An ignored finding stays in the result so reports can show it, but it no
//! longer counts toward the verdict.

use serde::{Deserialize, Serialize};

use crate::finding::Finding;

/// One `[[ignore]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IgnoreRule {
    /// Rule ID (`BC002`) or name (`input-removed`).
    pub rule: String,
    /// Only ignore findings about this subject; all subjects when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Recorded on the ignored finding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl IgnoreRule {
    /// Ignores every finding of `rule`.
    #[must_use]
    pub fn new(rule: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            ..Self::default()
        }
    }

    /// Restricts the entry to one subject.
    #[must_use]
    pub fn for_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the reason.
    #[must_use]
    pub fn because(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Whether this entry covers `finding`.
    #[must_use]
    pub fn matches(&self, finding: &Finding) -> bool {
        let rule_matches = self.rule == finding.rule_id || self.rule == finding.rule_name;
        let subject_matches = match &self.subject {
            Some(subject) => finding.subject.as_deref() == Some(subject.as_str()),
            None => true,
        };
        rule_matches && subject_matches
    }
}

/// Marks every finding covered by an entry as ignored.
///
/// The first matching entry supplies the reason. Already ignored findings
/// are left untouched. Returns how many findings were newly ignored.
pub fn apply_ignores(findings: &mut [Finding], ignores: &[IgnoreRule]) -> usize {
    if ignores.is_empty() {
        return 0;
    }
    let mut count = 0;
    for finding in findings.iter_mut().filter(|f| !f.ignored) {
        if let Some(entry) = ignores.iter().find(|entry| entry.matches(finding)) {
            tracing::debug!(
                rule = %finding.rule_id,
                subject = ?finding.subject,
                "Ignoring finding"
            );
            finding.ignored = true;
            finding.ignore_reason.clone_from(&entry.reason);
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::Severity;

    fn removal(subject: &str) -> Finding {
        Finding::new("BC002", "input-removed", Severity::Error, "gone").with_subject(subject)
    }

    #[test]
    fn test_matches_by_id_or_name() {
        let f = removal("legacy_flag");
        assert!(IgnoreRule::new("BC002").matches(&f));
        assert!(IgnoreRule::new("input-removed").matches(&f));
        assert!(!IgnoreRule::new("BC001").matches(&f));
    }

    #[test]
    fn test_subject_restricts_match() {
        let entry = IgnoreRule::new("BC002").for_subject("legacy_flag");
        assert!(entry.matches(&removal("legacy_flag")));
        assert!(!entry.matches(&removal("region")));
    }

    #[test]
    fn test_apply_ignores_records_reason() {
        let mut findings = vec![removal("legacy_flag"), removal("region")];
        let ignores = vec![
            IgnoreRule::new("BC002")
                .for_subject("legacy_flag")
                .because("deprecated for two releases"),
        ];

        let count = apply_ignores(&mut findings, &ignores);

        assert_eq!(count, 1);
        assert!(findings[0].ignored);
        assert_eq!(
            findings[0].ignore_reason.as_deref(),
            Some("deprecated for two releases")
        );
        assert!(!findings[1].ignored, "other subjects stay active");
    }

    #[test]
    fn test_ignore_rule_from_toml() {
        let entry: IgnoreRule = toml::from_str("rule = \"BC002\"\nsubject = \"x\"").unwrap();
        assert_eq!(entry.subject.as_deref(), Some("x"));
        assert!(entry.reason.is_none());
        assert!(toml::from_str::<IgnoreRule>("rule = \"BC002\"\nbogus = 1").is_err());
    }
}
