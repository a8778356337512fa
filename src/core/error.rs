//! Error types for the Row Runner core.

use thiserror::Error;

/// Result type alias using the core `RunnerError`.
pub type Result<T> = std::result::Result<T, RunnerError>;

/// Errors raised by the data-driven core.
///
/// `RowNotFound` is the configuration error that must fail a test outright:
/// every test method needs a matching data row.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("TestMethodName '{method}' not found in sheet '{sheet}'")]
    RowNotFound { sheet: String, method: String },

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Column '{column}' not found in sheet '{sheet}'")]
    ColumnNotFound { sheet: String, column: String },

    #[error("Sheet already exists: {0}")]
    SheetExists(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Evidence capture failed: {0}")]
    Evidence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RunnerError {
    /// Whether this error is fatal to the test it was raised for
    /// (as opposed to a best-effort failure such as evidence capture).
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            RunnerError::RowNotFound { .. }
                | RunnerError::SheetNotFound(_)
                | RunnerError::ColumnNotFound { .. }
                | RunnerError::InvalidConfig(_)
        )
    }
}
