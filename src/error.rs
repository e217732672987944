//! Error types for modbreak.
//!
//! The comparison engine itself is infallible: rules return empty finding
//! lists when they do not apply. Everything that *can* fail lives around the
//! engine (reading snapshot documents, loading configuration, serializing
//! reports), and all of it reports through [`ModbreakError`].

use std::fmt;
use std::io;
use std::path::PathBuf;

/// The main error type for modbreak operations.
#[derive(Debug)]
pub enum ModbreakError {
    /// A snapshot document or report could not be parsed or serialized.
    ParseError {
        /// The file that failed to parse.
        file: Option<PathBuf>,
        /// Context about what was being parsed.
        context: String,
        /// The underlying error.
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An error occurred during file system operations.
    IoError {
        /// The operation being performed.
        operation: String,
        /// The path involved in the error.
        path: Option<PathBuf>,
        /// The underlying IO error.
        source: Option<io::Error>,
    },

    /// An error occurred while loading or validating configuration.
    ConfigError {
        /// Description of the configuration issue.
        message: String,
        /// The config file path, if applicable.
        path: Option<PathBuf>,
        /// The underlying error.
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An error indicating an invalid argument or input.
    InvalidInput {
        /// Description of the invalid input.
        message: String,
        /// The argument or value that was invalid.
        argument: Option<String>,
    },
}

impl ModbreakError {
    /// Creates a new `ParseError` for a specific file, keeping the underlying cause.
    pub fn parse_error_with_file(
        file: PathBuf,
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ParseError {
            file: Some(file),
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new `IoError` with a path and underlying error.
    pub fn io_error_with_source(
        operation: impl Into<String>,
        path: PathBuf,
        source: io::Error,
    ) -> Self {
        Self::IoError {
            operation: operation.into(),
            path: Some(path),
            source: Some(source),
        }
    }

    /// Creates a new `ConfigError` with the given message.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
            path: None,
            source: None,
        }
    }

    /// Creates a new `ConfigError` with a file path.
    pub fn config_error_with_path(message: impl Into<String>, path: PathBuf) -> Self {
        Self::ConfigError {
            message: message.into(),
            path: Some(path),
            source: None,
        }
    }

    /// Creates a new `InvalidInput` error with an argument name.
    pub fn invalid_input_with_arg(message: impl Into<String>, argument: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            argument: Some(argument.into()),
        }
    }

    /// Attaches a file path to a `ConfigError` or `ParseError` that does not have one yet.
    #[must_use]
    pub fn at_path(self, at: PathBuf) -> Self {
        match self {
            Self::ConfigError {
                message,
                path: None,
                source,
            } => Self::ConfigError {
                message,
                path: Some(at),
                source,
            },
            Self::ParseError {
                file: None,
                context,
                source,
            } => Self::ParseError {
                file: Some(at),
                context,
                source,
            },
            other => other,
        }
    }

    /// Returns the name of the error variant.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ParseError { .. } => "ParseError",
            Self::IoError { .. } => "IoError",
            Self::ConfigError { .. } => "ConfigError",
            Self::InvalidInput { .. } => "InvalidInput",
        }
    }

    /// Returns suggested recovery actions for the error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::ParseError { file, .. } => {
                let mut s = vec![
                    "Ensure the snapshot was produced by a compatible loader".to_string(),
                    "Check that the document is valid JSON".to_string(),
                ];
                if file.is_some() {
                    s.push("Regenerate the snapshot file and retry".to_string());
                }
                s
            }
            Self::IoError { operation, .. } => {
                let mut s = vec![
                    "Check that the path exists and is accessible".to_string(),
                    "Verify you have the necessary permissions".to_string(),
                ];
                if operation.contains("read") || operation.contains("open") {
                    s.push("Ensure the file is not locked by another process".to_string());
                }
                s
            }
            Self::ConfigError { .. } => vec![
                "Check the configuration file syntax".to_string(),
                "Verify rule IDs against `modbreak rules`".to_string(),
                "Ensure the file is valid TOML format".to_string(),
            ],
            Self::InvalidInput { .. } => vec![
                "Review the command-line arguments".to_string(),
                "Verify all required arguments are provided".to_string(),
            ],
        }
    }
}

impl fmt::Display for ModbreakError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParseError { file, context, .. } => {
                if let Some(file) = file {
                    write!(f, "Parse error in '{}': {}", file.display(), context)
                } else {
                    write!(f, "Parse error: {}", context)
                }
            }
            Self::IoError {
                operation, path, ..
            } => {
                if let Some(p) = path {
                    write!(
                        f,
                        "IO error during '{}' at '{}': operation failed",
                        operation,
                        p.display()
                    )
                } else {
                    write!(f, "IO error during '{}': operation failed", operation)
                }
            }
            Self::ConfigError { message, path, .. } => {
                if let Some(p) = path {
                    write!(f, "Configuration error in '{}': {}", p.display(), message)
                } else {
                    write!(f, "Configuration error: {}", message)
                }
            }
            Self::InvalidInput { message, argument } => {
                if let Some(arg) = argument {
                    write!(f, "Invalid input '{}': {}", arg, message)
                } else {
                    write!(f, "Invalid input: {}", message)
                }
            }
        }
    }
}

impl std::error::Error for ModbreakError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ParseError { source, .. } => source.as_ref().map(|s| s.as_ref() as _),
            Self::IoError { source, .. } => source.as_ref().map(|e| e as _),
            Self::ConfigError { source, .. } => source.as_ref().map(|s| s.as_ref() as _),
            Self::InvalidInput { .. } => None,
        }
    }
}

impl From<io::Error> for ModbreakError {
    fn from(err: io::Error) -> Self {
        Self::IoError {
            operation: "file operation".to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<toml::de::Error> for ModbreakError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigError {
            message: format!("Failed to parse TOML: {}", err),
            path: None,
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_json::Error> for ModbreakError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError {
            file: None,
            context: format!("Failed to parse/serialize JSON: {}", err),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_yaml::Error> for ModbreakError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::ParseError {
            file: None,
            context: format!("Failed to serialize YAML: {}", err),
            source: Some(Box::new(err)),
        }
    }
}

/// A type alias for `Result<T, ModbreakError>`.
pub type Result<T> = std::result::Result<T, ModbreakError>;
