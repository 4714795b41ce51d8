//! CLI-specific error types and exit code mapping

use bulwark_core::error::{BulwarkError, CatalogError, ConfigError, ReportError};

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid combination of arguments.
    #[error("usage error: {0}")]
    Usage(String),

    /// The requested mode needs root.
    #[error("{0}")]
    Privilege(String),

    /// The run completed but at least one fact reported FAIL.
    #[error("{failed} compliance check(s) failed")]
    Findings { failed: usize },

    /// Fact catalog could not be built.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// Report file could not be opened or written.
    #[error("report error: {0}")]
    Report(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                               |
    /// |------|---------------------------------------|
    /// | 0    | Success                               |
    /// | 1    | General / command error               |
    /// | 2    | Configuration or usage error          |
    /// | 3    | Privilege required                    |
    /// | 4    | Run completed with FAIL findings      |
    /// | 10   | IO / report error                     |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Usage(_) => 2,
            Self::Privilege(_) => 3,
            Self::Findings { .. } => 4,
            Self::Io(_) | Self::Report(_) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Catalog(_) => 1,
        }
    }
}

impl From<BulwarkError> for CliError {
    fn from(e: BulwarkError) -> Self {
        match e {
            BulwarkError::Config(e) => e.into(),
            BulwarkError::Privilege(e) => Self::Privilege(e.to_string()),
            BulwarkError::Usage(e) => Self::Usage(e.to_string()),
            BulwarkError::Catalog(e) => e.into(),
            BulwarkError::Report(e) => e.into(),
            BulwarkError::Io(e) => Self::Io(e),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<CatalogError> for CliError {
    fn from(e: CatalogError) -> Self {
        Self::Catalog(e.to_string())
    }
}

impl From<ReportError> for CliError {
    fn from(e: ReportError) -> Self {
        Self::Report(e.to_string())
    }
}

impl From<bulwark_core::PrivilegeError> for CliError {
    fn from(e: bulwark_core::PrivilegeError) -> Self {
        Self::Privilege(e.to_string())
    }
}
