//! Error types for rampart.

use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for rampart operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Unsupported key passed to `add_variable` or `add_variable_negation`.
    #[error("invalid variable key '{key}': {message}")]
    InvalidKey {
        /// The key that was rejected.
        key: String,
        /// Why it was rejected.
        message: String,
    },

    /// Empty string or empty regex used as a variable negation key.
    #[error("invalid variable negation key, it cannot be empty")]
    EmptyKey,

    /// A variable negation targets a variable the rule does not use.
    #[error("cannot create a variable exception, the variable {name} is not used")]
    NoSuchVariable {
        /// Name of the variable that is not on the rule.
        name: &'static str,
    },

    /// Invalid transformation registration (empty or unknown name).
    #[error("invalid transformation '{name}'")]
    InvalidTransformation {
        /// The offending transformation name.
        name: String,
    },

    /// Error compiling a regex pattern.
    #[error("invalid regex pattern '{pattern}': {source}")]
    RegexCompile {
        /// The pattern that failed to compile.
        pattern: String,
        /// Underlying regex error.
        #[source]
        source: regex::Error,
    },

    /// Invalid action argument.
    #[error("invalid argument for action '{action}': {message}")]
    InvalidActionArgument {
        /// The action name.
        action: String,
        /// Error message.
        message: String,
    },

    /// The request body is not a multipart body.
    #[error("not a multipart body")]
    NotMultipart,

    /// A media type header value could not be parsed.
    #[error("malformed media type '{value}'")]
    MalformedMediaType {
        /// The value that failed to parse.
        value: String,
    },

    /// Underlying stream or filesystem failure.
    #[error("body processing I/O error: {0}")]
    Io(#[from] std::io::Error),
}
