//! Error types for branch-guard.
//!
//! All fallible operations in the crate return [`GuardError`] through the
//! [`Result`] alias. Two variants carry most of the domain meaning:
//!
//! - [`GuardError::MalformedLogic`] is raised by the logic compiler when a
//!   branching-logic string does not follow the bracket/quote grammar.
//! - [`GuardError::MissingField`] is raised during evaluation when a rule
//!   references a field the record does not have. The checker recovers from it
//!   locally and never lets it abort a run.

use thiserror::Error;

/// The main error type for branch-guard.
#[derive(Error, Debug)]
pub enum GuardError {
    /// A branching-logic expression does not match the expected grammar.
    #[error("Malformed branching logic for '{field}' at byte {position}: {message}")]
    MalformedLogic {
        /// Governed field whose logic failed to compile
        field: String,
        /// Byte offset in the logic string where parsing stopped
        position: usize,
        /// What the compiler expected to find
        message: String,
    },

    /// A rule references a field that is absent from the record schema.
    #[error("Field '{field}' not found in record")]
    MissingField { field: String },

    /// Error from a metadata or record source.
    #[error("Data source error ({source_type}): {message}")]
    DataSource {
        /// Kind of source (e.g. "JSON", "CSV", "REDCap")
        source_type: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error related to configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// A partitioned checker task panicked or was cancelled.
    #[error("Checker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Error while rendering a report.
    #[error("Format error: {0}")]
    Format(#[from] std::fmt::Error),

    /// Error from the REDCap HTTP client.
    #[cfg(feature = "redcap")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, GuardError>`.
pub type Result<T> = std::result::Result<T, GuardError>;

impl GuardError {
    /// Creates a malformed-logic error.
    pub fn malformed(
        field: impl Into<String>,
        position: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::MalformedLogic {
            field: field.into(),
            position,
            message: message.into(),
        }
    }

    /// Creates a missing-field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Creates a new data source error.
    pub fn data_source(source_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new data source error with a source error.
    pub fn data_source_with_source(
        source_type: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Returns true for errors the checker recovers from by skipping a pair.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MissingField { .. })
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<GuardError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.with_context(|| msg.to_string())
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| match e.into() {
            GuardError::Internal(inner) => GuardError::Internal(format!("{}: {inner}", f())),
            other => GuardError::Internal(format!("{}: {other}", f())),
        })
    }
}
