//! Error types for kexplain.
//!
//! Library crates use [`ExplainError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Grammar violations in a schema document are modelled separately as
//! [`StructuralError`] so callers can tell a malformed document apart from a
//! query that merely failed.

use std::path::PathBuf;
use std::time::Duration;

/// Maximum number of characters of raw input kept in a [`StructuralError`].
const SNIPPET_LEN: usize = 80;

/// A schema document did not match the expected grammar.
///
/// Every variant names the fully-qualified name being parsed and a raw
/// snippet of the offending text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    /// The document does not open with `DESCRIPTION:` followed by a padded line.
    #[error("{full_name}: description section missing or empty near {snippet:?}")]
    MissingDescriptionSection { full_name: String, snippet: String },

    /// No `FIELDS:` marker (or no padded line after it) follows the description.
    #[error("{full_name}: fields section missing or empty near {snippet:?}")]
    MissingFieldsSection { full_name: String, snippet: String },

    /// Text remains after the fields section was consumed.
    #[error("{full_name}: unparsed content after fields section: {snippet:?}")]
    TrailingUnparsedContent { full_name: String, snippet: String },

    /// A field-block starts with an indented line.
    #[error("{full_name}: field block starts with an indented line: {snippet:?}")]
    UnexpectedLeadingIndent { full_name: String, snippet: String },

    /// A top-level field line is not exactly `name<TAB>type`, or a scalar
    /// field has lines nested under it.
    #[error("{full_name}: malformed field line {snippet:?}")]
    MalformedFieldLine { full_name: String, snippet: String },

    /// Two sibling fields share a name.
    #[error("{full_name}: duplicate field name in {snippet:?}")]
    DuplicateFieldName { full_name: String, snippet: String },
}

impl StructuralError {
    /// The fully-qualified name of the node whose document failed to parse.
    pub fn full_name(&self) -> &str {
        match self {
            Self::MissingDescriptionSection { full_name, .. }
            | Self::MissingFieldsSection { full_name, .. }
            | Self::TrailingUnparsedContent { full_name, .. }
            | Self::UnexpectedLeadingIndent { full_name, .. }
            | Self::MalformedFieldLine { full_name, .. }
            | Self::DuplicateFieldName { full_name, .. } => full_name,
        }
    }
}

/// Truncate raw input to a short, char-boundary-safe diagnostic snippet.
pub fn snippet(raw: &str) -> String {
    match raw.char_indices().nth(SNIPPET_LEN) {
        Some((idx, _)) => format!("{}…", &raw[..idx]),
        None => raw.to_string(),
    }
}

/// Top-level error type for all kexplain operations.
#[derive(Debug, thiserror::Error)]
pub enum ExplainError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The schema document could not be parsed.
    #[error("structural parse error: {0}")]
    Structural(#[from] StructuralError),

    /// The external schema source returned an error.
    #[error("query for {full_name} failed: {message}")]
    Query { full_name: String, message: String },

    /// The external schema source did not answer in time.
    #[error("query for {full_name} timed out after {after:?}")]
    Timeout { full_name: String, after: Duration },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Output serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ExplainError>;

impl ExplainError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a query failure for `full_name`.
    pub fn query(full_name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Query {
            full_name: full_name.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for failures of the external source (error or timeout).
    pub fn is_query_failure(&self) -> bool {
        matches!(self, Self::Query { .. } | Self::Timeout { .. })
    }
}
