use std::path::Path;

use thiserror::Error;

// Error message prefixes
const MSG_FAILED_TO_PREFIX: &str = "Failed to";
const MSG_INVALID_PREFIX: &str = "Invalid";

/// Result type for the `protobridge` library
pub type Result<T> = core::result::Result<T, error_stack::Report<Error>>;

/// Every failure a generation run can report. All of them abort the run.
#[derive(Debug, Error)]
pub enum Error {
    /// A method declaration found by file and line has a different arity than its descriptor
    #[error("Arity mismatch for {method}: source declares {declared} {role}, descriptor has {expected}")]
    ArityMismatch {
        /// Method name
        method:   String,
        /// `parameters` or `results`
        role:     &'static str,
        /// Count recovered from source
        declared: usize,
        /// Count carried by the descriptor
        expected: usize,
    },

    /// No declaration for a method exists at the recorded source position
    #[error("Source declaration not found: {0}")]
    DeclarationNotFound(String),

    /// Reading or writing a file failed
    #[error("File operation failed: {0}")]
    FileOperation(String),

    /// Configuration could not be built or loaded
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A service descriptor supplied from outside is malformed
    #[error("Invalid service descriptor: {0}")]
    InvalidDescriptor(String),

    /// Walking up from a directory never reached a `go.mod`
    #[error("No go.mod found at or above {0}")]
    ManifestNotFound(String),

    /// A positional name lookup went past the end of a declaration's field list
    #[error("Name index {index} out of range for {context}")]
    NameIndexOutOfRange {
        /// Requested position
        index:   usize,
        /// What was being named
        context: String,
    },

    /// Two different messages would be emitted under one name in one schema package
    #[error("Message name collision in schema package {package}: {name}")]
    NameCollision {
        /// Schema package
        package: String,
        /// Colliding message name
        name:    String,
    },

    /// A repeated value would have to be nested directly inside another repeated or map value
    #[error("Nested repeated type cannot be expressed: {0}")]
    NestedRepeated(String),

    /// No manifest entry or directory matches an import path
    #[error("Package not found: {0}")]
    PackageNotFound(String),

    /// Go source or a manifest could not be parsed
    #[error("Parse error in {file}:{line}: {message}")]
    Parse {
        /// Source path
        file:    String,
        /// 1-based line number
        line:    usize,
        /// What went wrong
        message: String,
    },

    /// The external schema compiler failed or exited non-zero
    #[error("Schema compiler failed: {0}")]
    SchemaCompiler(String),

    /// A type name is not declared in the package it was looked up in
    #[error("Type not found: {0}")]
    TypeNotFound(String),

    /// A type kind has no schema representation
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// A map key type is not an integral, bool, or string scalar
    #[error("Unsupported map key type: {0}")]
    UnsupportedMapKey(String),

    /// A dynamic value does not have the shape its type descriptor requires
    #[cfg(test)]
    #[error("Value does not match type: {0}")]
    ValueMismatch(String),
}

impl Error {
    // Builder methods for common patterns

    /// Create a "Failed to X" file error
    pub(crate) fn failed_to(action: &str, details: impl std::fmt::Display) -> Self {
        Self::FileOperation(format!("{MSG_FAILED_TO_PREFIX} {action}: {details}"))
    }

    /// Create an "Invalid X" configuration error
    pub(crate) fn invalid(what: &str, details: impl std::fmt::Display) -> Self {
        Self::InvalidConfiguration(format!("{MSG_INVALID_PREFIX} {what}: {details}"))
    }

    /// Create error for IO operations
    pub(crate) fn io_failed(operation: &str, path: &Path, error: impl std::fmt::Display) -> Self {
        Self::FileOperation(format!(
            "{MSG_FAILED_TO_PREFIX} {operation} {}: {error}",
            path.display()
        ))
    }

    /// Create a parse error positioned in a file
    pub(crate) fn parse(file: &Path, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.display().to_string(),
            line,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_messages() {
        let error = Error::io_failed("read", Path::new("/tmp/x.go"), "denied");
        assert_eq!(
            error.to_string(),
            "File operation failed: Failed to read /tmp/x.go: denied"
        );

        let error = Error::invalid("output directory", "empty path");
        assert_eq!(
            error.to_string(),
            "Invalid configuration: Invalid output directory: empty path"
        );

        let error = Error::parse(Path::new("a.go"), 7, "unterminated string");
        assert_eq!(error.to_string(), "Parse error in a.go:7: unterminated string");
    }

    #[test]
    fn test_arity_message_names_method() {
        let error = Error::ArityMismatch {
            method:   "Login".to_string(),
            role:     "parameters",
            declared: 1,
            expected: 2,
        };
        assert!(error.to_string().contains("Login"));
        assert!(error.to_string().contains("parameters"));
    }
}
