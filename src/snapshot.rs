//! Typed snapshot of a module's declared interface.
//!
//! A [`ModuleSnapshot`] is what the rules compare. It is produced outside this
//! crate by a structural loader and arrives here as JSON; the engine never
//! mutates it. All collections are `BTreeMap`s, so an empty snapshot has empty
//! maps (never missing ones) and iteration is always in sorted key order.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{ModbreakError, Result};
use crate::finding::SourceLocation;

/// The complete declared interface of one module version.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModuleSnapshot {
    /// Where the snapshot came from (directory, ref, or any identifier).
    #[serde(default)]
    pub path: String,
    /// Input variables by name.
    #[serde(default)]
    pub variables: BTreeMap<String, VariableSignature>,
    /// Outputs by name.
    #[serde(default)]
    pub outputs: BTreeMap<String, OutputSignature>,
    /// Managed resources by address (`type.name`).
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceSignature>,
    /// Sub-module calls by name.
    #[serde(default)]
    pub module_calls: BTreeMap<String, ModuleCallSignature>,
    /// Moved declarations in declaration order.
    #[serde(default)]
    pub moved_blocks: Vec<MovedBlock>,
    /// Core version constraint, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_version: Option<String>,
    /// Provider requirements by local name.
    #[serde(default)]
    pub required_providers: BTreeMap<String, ProviderRequirement>,
}

/// One input variable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VariableSignature {
    /// Variable name.
    #[serde(default)]
    pub name: String,
    /// Normalized type expression; empty and `any` both mean unconstrained.
    #[serde(rename = "type", default)]
    pub type_expr: String,
    /// True iff the variable has no default.
    #[serde(default)]
    pub required: bool,
    /// Default value, compared structurally. A present `null` is a default.
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<Value>,
    /// Whether the value is redacted from plan output.
    #[serde(default)]
    pub sensitive: bool,
    /// Explicit nullable setting; absent behaves like `true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    /// Number of validation blocks, including ones that could not be read statically.
    #[serde(default)]
    pub validation_count: usize,
    /// Validation blocks whose contents could be read.
    #[serde(default)]
    pub validations: Vec<ValidationBlock>,
    /// Declaration site.
    #[serde(default)]
    pub location: SourceLocation,
}

/// A single `validation` block of a variable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationBlock {
    /// Raw condition expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Literal error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// One output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutputSignature {
    /// Output name.
    #[serde(default)]
    pub name: String,
    /// Whether the value is redacted.
    #[serde(default)]
    pub sensitive: bool,
    /// Declaration site.
    #[serde(default)]
    pub location: SourceLocation,
}

/// One managed resource.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceSignature {
    /// Resource type, e.g. `aws_s3_bucket`.
    #[serde(rename = "type", default)]
    pub resource_type: String,
    /// Resource name.
    #[serde(default)]
    pub name: String,
    /// `type.name`.
    #[serde(default)]
    pub address: String,
    /// Declaration site.
    #[serde(default)]
    pub location: SourceLocation,
}

/// One sub-module call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModuleCallSignature {
    /// Call name.
    #[serde(default)]
    pub name: String,
    /// Module source string.
    #[serde(default)]
    pub source: String,
    /// Version constraint, empty when unconstrained.
    #[serde(default)]
    pub version: String,
    /// `module.name`.
    #[serde(default)]
    pub address: String,
    /// Declaration site.
    #[serde(default)]
    pub location: SourceLocation,
}

/// A refactor declaration: `from` was relocated to `to`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MovedBlock {
    /// Previous address.
    pub from: String,
    /// New address.
    pub to: String,
    /// Declaration site.
    #[serde(default)]
    pub location: SourceLocation,
}

/// One provider requirement.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProviderRequirement {
    /// Registry source, e.g. `hashicorp/aws`.
    #[serde(default)]
    pub source: String,
    /// Version constraint, empty when unconstrained.
    #[serde(default)]
    pub version: String,
}

/// Shape of an address used in a moved declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    /// `type.name`
    Resource,
    /// `module.name`
    Module,
    /// Neither of the above.
    Malformed,
}

impl AddressKind {
    /// Classifies an address.
    ///
    /// ```
    /// use modbreak_core::snapshot::AddressKind;
    ///
    /// assert_eq!(AddressKind::of("aws_s3_bucket.logs"), AddressKind::Resource);
    /// assert_eq!(AddressKind::of("module.network"), AddressKind::Module);
    /// assert_eq!(AddressKind::of("logs"), AddressKind::Malformed);
    /// ```
    #[must_use]
    pub fn of(address: &str) -> Self {
        if let Some(rest) = address.strip_prefix("module.") {
            if rest.is_empty() {
                Self::Malformed
            } else {
                Self::Module
            }
        } else if address.contains('.') {
            Self::Resource
        } else {
            Self::Malformed
        }
    }

    /// Lowercase label used in messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::Module => "module",
            Self::Malformed => "malformed",
        }
    }
}

fn deserialize_present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl VariableSignature {
    /// Creates a required, unconstrained variable.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
            ..Self::default()
        }
    }

    /// Sets the type expression.
    #[must_use]
    pub fn with_type(mut self, type_expr: impl Into<String>) -> Self {
        self.type_expr = type_expr.into();
        self
    }

    /// Sets a default, which also makes the variable optional.
    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self.required = false;
        self
    }

    /// Sets the sensitive flag.
    #[must_use]
    pub fn with_sensitive(mut self, sensitive: bool) -> Self {
        self.sensitive = sensitive;
        self
    }

    /// Sets an explicit nullable value.
    #[must_use]
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    /// Appends a validation block with the given condition.
    #[must_use]
    pub fn with_validation(mut self, condition: impl Into<String>) -> Self {
        self.validations.push(ValidationBlock {
            condition: Some(condition.into()),
            error_message: None,
        });
        self.validation_count += 1;
        self
    }

    /// Sets the declaration site.
    #[must_use]
    pub fn at(mut self, file: impl Into<String>, line: usize) -> Self {
        self.location = SourceLocation::new(file, line);
        self
    }

    /// Whether the type accepts any value.
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        let t = self.normalized_type();
        t.is_empty() || t == "any"
    }

    /// Type expression with surrounding and internal whitespace collapsed.
    #[must_use]
    pub fn normalized_type(&self) -> String {
        self.type_expr.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Effective nullability; an unset value behaves like `true`.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.nullable.unwrap_or(true)
    }
}

impl OutputSignature {
    /// Creates a non-sensitive output.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the sensitive flag.
    #[must_use]
    pub fn with_sensitive(mut self, sensitive: bool) -> Self {
        self.sensitive = sensitive;
        self
    }
}

impl ResourceSignature {
    /// Creates a resource; the address is derived as `type.name`.
    #[must_use]
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        let resource_type = resource_type.into();
        let name = name.into();
        Self {
            address: format!("{resource_type}.{name}"),
            resource_type,
            name,
            location: SourceLocation::default(),
        }
    }
}

impl ModuleCallSignature {
    /// Creates a module call; the address is derived as `module.name`.
    #[must_use]
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            address: format!("module.{name}"),
            name,
            source: source.into(),
            version: String::new(),
            location: SourceLocation::default(),
        }
    }

    /// Sets the version constraint.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

impl MovedBlock {
    /// Creates a moved declaration.
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            location: SourceLocation::default(),
        }
    }
}

impl ModuleSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Adds a variable keyed by its name.
    #[must_use]
    pub fn with_variable(mut self, variable: VariableSignature) -> Self {
        self.variables.insert(variable.name.clone(), variable);
        self
    }

    /// Adds an output keyed by its name.
    #[must_use]
    pub fn with_output(mut self, output: OutputSignature) -> Self {
        self.outputs.insert(output.name.clone(), output);
        self
    }

    /// Adds a resource keyed by its address.
    #[must_use]
    pub fn with_resource(mut self, resource: ResourceSignature) -> Self {
        self.resources.insert(resource.address.clone(), resource);
        self
    }

    /// Adds a module call keyed by its name.
    #[must_use]
    pub fn with_module_call(mut self, call: ModuleCallSignature) -> Self {
        self.module_calls.insert(call.name.clone(), call);
        self
    }

    /// Appends a moved declaration.
    #[must_use]
    pub fn with_moved(mut self, moved: MovedBlock) -> Self {
        self.moved_blocks.push(moved);
        self
    }

    /// Sets the core version constraint.
    #[must_use]
    pub fn with_required_version(mut self, constraint: impl Into<String>) -> Self {
        self.required_version = Some(constraint.into());
        self
    }

    /// Adds a provider requirement.
    #[must_use]
    pub fn with_provider(
        mut self,
        name: impl Into<String>,
        source: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        self.required_providers.insert(
            name.into(),
            ProviderRequirement {
                source: source.into(),
                version: version.into(),
            },
        );
        self
    }

    /// The core version constraint, treating blank strings as absent.
    #[must_use]
    pub fn version_constraint(&self) -> Option<&str> {
        self.required_version
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// Fills derived fields: names from map keys, composite addresses, and
    /// `required` as the negation of "has a default".
    pub fn normalize(&mut self) {
        for (name, var) in &mut self.variables {
            if var.name.is_empty() {
                var.name.clone_from(name);
            }
            var.required = var.default.is_none();
            if var.validation_count < var.validations.len() {
                var.validation_count = var.validations.len();
            }
        }
        for (name, output) in &mut self.outputs {
            if output.name.is_empty() {
                output.name.clone_from(name);
            }
        }
        for (address, resource) in &mut self.resources {
            if resource.address.is_empty() {
                resource.address.clone_from(address);
            }
            if resource.resource_type.is_empty() || resource.name.is_empty() {
                if let Some((ty, name)) = address.split_once('.') {
                    resource.resource_type = ty.to_string();
                    resource.name = name.to_string();
                }
            }
        }
        for (name, call) in &mut self.module_calls {
            if call.name.is_empty() {
                call.name.clone_from(name);
            }
            if call.address.is_empty() {
                call.address = format!("module.{}", call.name);
            }
        }
    }

    /// Parses a snapshot from a JSON document and normalizes it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut snapshot: ModuleSnapshot = serde_json::from_str(json)?;
        snapshot.normalize();
        Ok(snapshot)
    }

    /// Reads and parses a snapshot file.
    ///
    /// When the document has no `path`, the file path is used as the identifier.
    #[tracing::instrument(level = "debug", skip_all, fields(path = %path.display()), err)]
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ModbreakError::io_error_with_source("read snapshot", path.to_path_buf(), e)
        })?;
        let mut snapshot: ModuleSnapshot = serde_json::from_str(&content).map_err(|e| {
            ModbreakError::parse_error_with_file(
                path.to_path_buf(),
                format!("invalid snapshot document: {e}"),
                e,
            )
        })?;
        snapshot.normalize();
        if snapshot.path.is_empty() {
            snapshot.path = path.display().to_string();
        }
        tracing::debug!(
            variables = snapshot.variables.len(),
            outputs = snapshot.outputs.len(),
            resources = snapshot.resources.len(),
            module_calls = snapshot.module_calls.len(),
            moved_blocks = snapshot.moved_blocks.len(),
            "Loaded snapshot"
        );
        Ok(snapshot)
    }
}
