/*!
 * Error types for uidaudit
 */

use std::fmt;
use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, AuditError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_PARTIAL: i32 = 1;
pub const EXIT_FATAL: i32 = 2;
pub const EXIT_INTERRUPTED: i32 = 130;

/// Run-level errors.
///
/// Per-host collection problems are not represented here: they are isolated
/// as [`crate::core::transport::TransportError`] inside each host's
/// collection result and never abort a run.
#[derive(Debug)]
pub enum AuditError {
    /// No host list was supplied on the command line or in the config file
    MissingHostList,

    /// The host list could not be read
    HostList { path: PathBuf, source: io::Error },

    /// Configuration error
    Config(String),

    /// Staging directory could not be created or removed
    Staging { path: PathBuf, source: io::Error },

    /// I/O error
    Io(io::Error),

    /// Worker pool could not be built
    Parallel(String),

    /// The run was interrupted before it completed
    Interrupted,

    /// Report could not be written
    Report(String),
}

impl AuditError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            AuditError::MissingHostList
            | AuditError::HostList { .. }
            | AuditError::Config(_)
            | AuditError::Parallel(_) => EXIT_FATAL,
            AuditError::Interrupted => EXIT_INTERRUPTED,
            AuditError::Staging { .. } | AuditError::Io(_) | AuditError::Report(_) => {
                EXIT_PARTIAL
            }
        }
    }

    /// Fatal errors abort before any remote work is attempted
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AuditError::MissingHostList | AuditError::HostList { .. } | AuditError::Config(_)
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            AuditError::MissingHostList => ErrorCategory::Validation,
            AuditError::HostList { .. } | AuditError::Io(_) => ErrorCategory::IoError,
            AuditError::Config(_) => ErrorCategory::Configuration,
            AuditError::Staging { .. } => ErrorCategory::Resource,
            AuditError::Parallel(_) => ErrorCategory::Concurrency,
            AuditError::Interrupted => ErrorCategory::Interrupted,
            AuditError::Report(_) => ErrorCategory::Output,
        }
    }
}

/// Error category for classification and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing or invalid arguments
    Validation,
    /// I/O operation errors
    IoError,
    /// Configuration errors
    Configuration,
    /// Staging directory errors
    Resource,
    /// Worker pool errors
    Concurrency,
    /// User interrupt
    Interrupted,
    /// Report rendering errors
    Output,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::IoError => write!(f, "io"),
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Resource => write!(f, "resource"),
            ErrorCategory::Concurrency => write!(f, "concurrency"),
            ErrorCategory::Interrupted => write!(f, "interrupted"),
            ErrorCategory::Output => write!(f, "output"),
        }
    }
}

impl fmt::Display for AuditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditError::MissingHostList => {
                write!(f, "The host list (-f) argument is required to run an audit")
            }
            AuditError::HostList { path, source } => {
                write!(f, "Failed to read host list {}: {}", path.display(), source)
            }
            AuditError::Config(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
            AuditError::Staging { path, source } => {
                write!(f, "Staging directory {}: {}", path.display(), source)
            }
            AuditError::Io(err) => {
                write!(f, "I/O error: {}", err)
            }
            AuditError::Parallel(msg) => {
                write!(f, "Worker pool error: {}", msg)
            }
            AuditError::Interrupted => {
                write!(f, "Audit interrupted")
            }
            AuditError::Report(msg) => {
                write!(f, "Report error: {}", msg)
            }
        }
    }
}

impl std::error::Error for AuditError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuditError::HostList { source, .. } | AuditError::Staging { source, .. } => {
                Some(source)
            }
            AuditError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for AuditError {
    fn from(err: io::Error) -> Self {
        AuditError::Io(err)
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(err: serde_json::Error) -> Self {
        AuditError::Report(format!("JSON encode error: {}", err))
    }
}

impl From<toml::de::Error> for AuditError {
    fn from(err: toml::de::Error) -> Self {
        AuditError::Config(format!("TOML parse error: {}", err))
    }
}
