//! Command-line interface definitions.

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::finding::Severity;

/// Report format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table plus summary line for terminals.
    #[default]
    Text,
    /// Full `CheckResult` as JSON.
    Json,
    /// Full `CheckResult` as YAML.
    Yaml,
    /// SARIF v2.1.0 for code scanning dashboards.
    Sarif,
    /// JUnit XML for CI test reporters.
    Junit,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Sarif => "sarif",
            Self::Junit => "junit",
        })
    }
}

/// Severity threshold as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FailOn {
    /// Fail on errors only.
    Error,
    /// Fail on warnings and errors.
    Warning,
    /// Fail on any finding.
    Notice,
}

impl From<FailOn> for Severity {
    fn from(value: FailOn) -> Self {
        match value {
            FailOn::Error => Self::Error,
            FailOn::Warning => Self::Warning,
            FailOn::Notice => Self::Notice,
        }
    }
}

/// CLI arguments for `modbreak`.
#[derive(Parser, Debug)]
#[command(name = "modbreak")]
#[command(
    author,
    version,
    about = "Detect breaking changes between two versions of an infrastructure module"
)]
#[command(long_about = "Compares two module interface snapshots (JSON) and reports \
    breaking and risky changes.\n\n\
    Exit codes:\n  \
    0 - PASS\n  \
    1 - FAIL (a finding reached the fail-on threshold)\n  \
    2 - Configuration or runtime error")]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare two snapshots
    Check(CheckArgs),

    /// List every registered rule
    Rules,

    /// Show the documentation of one rule
    Explain(ExplainArgs),
}

/// Arguments of `modbreak check`.
#[derive(Parser, Debug, Clone)]
pub struct CheckArgs {
    /// Snapshot of the old module version
    pub old: PathBuf,

    /// Snapshot of the new module version
    pub new: PathBuf,

    /// Configuration file (skips discovery and the user config)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Report format (overrides config)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Lowest severity that fails the check (overrides config)
    #[arg(long, value_enum)]
    pub fail_on: Option<FailOn>,

    /// Treat similar removed/added names as renames
    #[arg(long)]
    pub rename_detection: bool,

    /// Similarity threshold for rename detection, 0.0-1.0
    #[arg(long)]
    pub similarity_threshold: Option<f64>,

    /// Enable a rule by ID or name (repeatable)
    #[arg(long, value_name = "RULE")]
    pub enable: Vec<String>,

    /// Disable a rule by ID or name (repeatable)
    #[arg(long, value_name = "RULE")]
    pub disable: Vec<String>,

    /// Attach remediation text to every finding
    #[arg(long)]
    pub include_remediation: bool,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output_file: Option<PathBuf>,
}

/// Arguments of `modbreak explain`.
#[derive(Parser, Debug, Clone)]
pub struct ExplainArgs {
    /// Rule ID (`BC001`) or name (`required-input-added`)
    pub rule: String,
}
