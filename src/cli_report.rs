//! Terminal output for check results and the rule catalogue.
//!
//! The findings table shows, per finding:
//! - Severity (color-coded, ignored findings marked)
//! - The rule that reported it
//! - Where the declaration lives
//! - The message and its detail

use prettytable::{Attr, Cell, Row, Table, format};
use std::cmp::Reverse;

use crate::finding::{Finding, Severity};
use crate::registry::Registry;
use crate::result::CheckResult;
use crate::rule::RuleDoc;

/// Maximum width for the message column before truncation.
const MAX_MESSAGE_WIDTH: usize = 60;

/// Maximum width for rule descriptions in the catalogue table.
const MAX_DESCRIPTION_WIDTH: usize = 80;

fn truncate(message: &str, width: usize) -> String {
    if message.chars().count() > width {
        let head: String = message.chars().take(width.saturating_sub(3)).collect();
        format!("{head}...")
    } else {
        message.to_string()
    }
}

const fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "ERR",
        Severity::Warning => "WARN",
        Severity::Notice => "NOTE",
    }
}

const fn severity_color(severity: Severity) -> Attr {
    match severity {
        Severity::Error => Attr::ForegroundColor(prettytable::color::RED),
        Severity::Warning => Attr::ForegroundColor(prettytable::color::YELLOW),
        Severity::Notice => Attr::ForegroundColor(prettytable::color::BLUE),
    }
}

fn plural(count: usize, word: &str) -> String {
    format!("{count} {word}{}", if count == 1 { "" } else { "s" })
}

fn table_format() -> format::TableFormat {
    format::FormatBuilder::new()
        .column_separator('│')
        .borders('│')
        .separator(
            format::LinePosition::Top,
            format::LineSeparator::new('─', '┬', '┌', '┐'),
        )
        .separator(
            format::LinePosition::Title,
            format::LineSeparator::new('═', '╪', '╞', '╡'),
        )
        .separator(
            format::LinePosition::Bottom,
            format::LineSeparator::new('─', '┴', '└', '┘'),
        )
        .padding(1, 1)
        .build()
}

/// Renders the one-line verdict summary.
///
/// ```rust
/// use modbreak_core::cli_report::render_summary_line;
/// use modbreak_core::{CheckResult, Finding, Severity};
///
/// let mut result = CheckResult::new(
///     "old.json",
///     "new.json",
///     vec![Finding::new("BC002", "input-removed", Severity::Error, "gone")],
///     Severity::Error,
/// );
/// result.compute();
/// assert_eq!(
///     render_summary_line(&result),
///     "FAIL: 1 finding (1 error, 0 warnings, 0 notices, 0 ignored)"
/// );
/// ```
#[must_use]
pub fn render_summary_line(result: &CheckResult) -> String {
    let summary = &result.summary;
    format!(
        "{}: {} ({}, {}, {}, {} ignored)",
        result.result,
        plural(summary.total, "finding"),
        plural(summary.error, "error"),
        plural(summary.warning, "warning"),
        plural(summary.notice, "notice"),
        summary.ignored,
    )
}

/// Builds the findings table.
///
/// Active findings come first, most severe first; within a tier the
/// registry order is kept.
#[must_use]
pub fn build_cli_table(result: &CheckResult) -> Table {
    let mut table = Table::new();
    table.set_format(table_format());
    table.set_titles(Row::new(vec![
        Cell::new("Severity").with_style(Attr::Bold),
        Cell::new("Rule").with_style(Attr::Bold),
        Cell::new("Location").with_style(Attr::Bold),
        Cell::new("Issue").with_style(Attr::Bold),
        Cell::new("Detail").with_style(Attr::Bold),
    ]));

    let mut sorted: Vec<&Finding> = result.findings.iter().collect();
    sorted.sort_by_key(|f| (f.ignored, Reverse(f.severity)));

    for finding in sorted {
        let location = finding
            .primary_location()
            .map_or_else(|| "-".to_string(), ToString::to_string);
        let detail = match (&finding.ignore_reason, &finding.detail) {
            (Some(reason), _) if finding.ignored => format!("ignored: {reason}"),
            (_, Some(detail)) => detail.clone(),
            _ => "-".to_string(),
        };

        let severity_cell = if finding.ignored {
            Cell::new(&format!("{} (ignored)", severity_label(finding.severity)))
                .with_style(Attr::Dim)
        } else {
            Cell::new(severity_label(finding.severity))
                .with_style(severity_color(finding.severity))
        };

        table.add_row(Row::new(vec![
            severity_cell,
            Cell::new(&finding.rule_id),
            Cell::new(&location),
            Cell::new(&truncate(&finding.message, MAX_MESSAGE_WIDTH)),
            Cell::new(&truncate(&detail, MAX_MESSAGE_WIDTH)),
        ]));
    }

    table
}

/// Renders the findings table as plain text.
#[must_use]
pub fn render_cli_table(result: &CheckResult) -> String {
    build_cli_table(result).to_string()
}

/// Renders the full text report: the table (when there are findings) and the
/// summary line.
#[must_use]
pub fn render_text(result: &CheckResult) -> String {
    let mut out = format!("Comparing {} -> {}\n", result.old_path, result.new_path);
    if result.findings.is_empty() {
        out.push_str("No breaking or risky changes detected.\n");
    } else {
        out.push_str(&render_cli_table(result));
    }
    out.push_str(&render_summary_line(result));
    out.push('\n');
    out
}

/// Prints the text report to stdout, with colors when stdout is a terminal.
pub fn print_text(result: &CheckResult) {
    println!("Comparing {} -> {}", result.old_path, result.new_path);
    if result.findings.is_empty() {
        println!("No breaking or risky changes detected.");
    } else {
        build_cli_table(result).printstd();
    }
    println!("{}", render_summary_line(result));
}

/// Renders every registered rule as a table.
#[must_use]
pub fn render_rules_table(registry: &Registry) -> String {
    let mut table = Table::new();
    table.set_format(table_format());
    table.set_titles(Row::new(vec![
        Cell::new("ID").with_style(Attr::Bold),
        Cell::new("Name").with_style(Attr::Bold),
        Cell::new("Severity").with_style(Attr::Bold),
        Cell::new("Description").with_style(Attr::Bold),
    ]));

    for rule in registry.all() {
        let doc = rule.doc();
        table.add_row(Row::new(vec![
            Cell::new(doc.id),
            Cell::new(doc.name),
            Cell::new(doc.default_severity.as_str())
                .with_style(severity_color(doc.default_severity)),
            Cell::new(&truncate(doc.description, MAX_DESCRIPTION_WIDTH)),
        ]));
    }

    table.to_string()
}

/// Renders the full documentation of one rule.
#[must_use]
pub fn render_rule_explanation(doc: &RuleDoc) -> String {
    let mut out = format!(
        "{} {} (default severity: {})\n\n{}\n",
        doc.id, doc.name, doc.default_severity, doc.description
    );
    if !doc.example.is_empty() {
        out.push_str(&format!("\nExample:\n{}\n", doc.example));
    }
    out.push_str(&format!("\nRemediation:\n{}\n", doc.remediation));
    out
}
