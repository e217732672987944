//! # modbreak - breaking-change detection for infrastructure modules
//!
//! modbreak compares the interface of two versions of an infrastructure-as-code
//! module and reports every change that may break callers:
//!
//! - **Inputs**: added required inputs, removed inputs, type changes,
//!   tightened validation, renamed inputs
//! - **Outputs**: removed, renamed or newly sensitive outputs
//! - **Resources**: removed resources and module calls without `moved` blocks,
//!   invalid or conflicting `moved` blocks
//! - **Versions**: tightened engine and provider constraints
//!
//! ## Architecture
//!
//! - [`snapshot`] - the typed interface of one module version
//! - [`rule`] and [`rules`] - the [`Rule`] trait and the built-in catalogue
//! - [`registry`] - ordered, thread-safe rule lookup by ID or name
//! - [`engine`] - runs rules, suppresses findings explained by renames,
//!   applies the ignore list and computes the verdict
//! - [`config`] and [`config_hierarchy`] - TOML configuration
//! - [`cli_report`], [`ci_report`] and [`reporting`] - text, JSON, YAML,
//!   SARIF and JUnit output
//! - [`error`] - centralized error types for the crate
//!
//! ## Usage as a Library
//!
//! ```rust
//! use modbreak_core::engine::{Engine, EngineConfig};
//! use modbreak_core::snapshot::VariableSignature;
//! use modbreak_core::{ModuleSnapshot, Verdict};
//!
//! let old = ModuleSnapshot::new("v1").with_variable(VariableSignature::new("region"));
//! let new = ModuleSnapshot::new("v2");
//!
//! let result = Engine::new(EngineConfig::default()).check(&old, &new);
//!
//! assert_eq!(result.result, Verdict::Fail);
//! assert_eq!(result.findings[0].rule_id, "BC002");
//! ```
//!
//! ## Error Handling
//!
//! Fallible functions return [`Result<T>`], an alias for
//! `std::result::Result<T, ModbreakError>`. Rule evaluation itself never fails.

pub mod ci_report;
pub mod cli;
pub mod cli_report;
pub mod config;
pub mod config_hierarchy;
pub mod engine;
pub mod error;
pub mod finding;
pub mod ignore;
pub mod pattern;
pub mod registry;
pub mod reporting;
pub mod result;
pub mod rule;
pub mod rules;
pub mod similarity;
pub mod snapshot;

pub use crate::engine::{CheckOptions, Engine, EngineConfig, RuleSetting};
pub use crate::error::{ModbreakError, Result};
pub use crate::finding::{Finding, Severity, SourceLocation};
pub use crate::ignore::IgnoreRule;
pub use crate::registry::{Registry, default_registry};
pub use crate::result::{CheckResult, Summary, Verdict};
pub use crate::rule::{EvalContext, RenameDetection, Rule, RuleDoc};
pub use crate::snapshot::ModuleSnapshot;

pub use crate::ci_report::{to_junit, to_sarif};
pub use crate::cli_report::{render_cli_table, render_summary_line};
pub use crate::config::{ModbreakConfig, load_config};
pub use crate::config_hierarchy::{
    ConfigSource, ConfigSourceType, HierarchicalConfig, Mergeable, load_hierarchical_config,
    merge_configs,
};
pub use crate::reporting::render_report;
