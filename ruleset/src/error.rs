use crate::engine::error_message;
use snafu::Snafu;

/// Which of the three failure categories an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidAddress,
    InvalidNetwork,
    Validation,
}

/// Failure to parse a dotted-quad address or a `<address>/<prefix>` network.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum ParseError {
    #[snafu(display("invalid IP address '{}': {}", text, reason))]
    InvalidAddress { text: String, reason: String },

    #[snafu(display("invalid network '{}': {}", text, reason))]
    InvalidNetwork { text: String, reason: String },
}

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::InvalidAddress { .. } => ErrorKind::InvalidAddress,
            ParseError::InvalidNetwork { .. } => ErrorKind::InvalidNetwork,
        }
    }
}

/// Error returned by `ip_belongs_to_network`.
///
/// The display text always starts with `Invalid IP or network format`, which is
/// what hosts see when the call fails.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum ValidationError {
    #[snafu(display("Invalid IP or network format: {} must not be null or empty", names))]
    MissingArgument { names: String },

    #[snafu(display("Invalid IP or network format: {}", source))]
    Parse { source: ParseError },
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::MissingArgument { .. } => ErrorKind::Validation,
            ValidationError::Parse { source } => source.kind(),
        }
    }
}

/// Errors raised while loading, compiling or evaluating expression rules.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RuleError {
    #[snafu(display("Failed to read rules file {}: {}", path, source))]
    ReadRules {
        path: String,
        source: std::io::Error,
    },

    #[snafu(display("Failed to parse rules: {}", source))]
    ParseRules { source: serde_yaml::Error },

    #[snafu(display("Failed to compile rule '{}': {}", name, source))]
    Compile {
        name: String,
        source: rhai::ParseError,
    },

    #[snafu(display("Failed to evaluate rule '{}': {}", name, error_message(source)))]
    Evaluate {
        name: String,
        source: Box<rhai::EvalAltResult>,
    },

    #[snafu(display("Rule '{}' returned {} instead of a boolean", name, type_name))]
    NotBoolean { name: String, type_name: String },
}
