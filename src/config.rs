/*!
 * Configuration types for uidaudit
 */

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AuditError, Result};

/// Command run on each host. Prints `name:uid:gid`, one account per line.
pub const DEFAULT_REMOTE_COMMAND: &str = "cut -d: -f1,3,4 /etc/passwd";

/// Main configuration for an audit run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Line-delimited list of hosts to audit
    #[serde(default)]
    pub hosts_file: Option<PathBuf>,

    /// Base directory for per-host captures; removed at the end of every run
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,

    /// Number of hosts queried at once (0 is treated as 1)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Per-host timeout in seconds (0 = wait forever)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Remote transport program
    #[serde(default = "default_transport")]
    pub transport: String,

    /// Extra arguments placed before the host name
    #[serde(default = "default_transport_args")]
    pub transport_args: Vec<String>,

    /// Command executed on the remote host
    #[serde(default = "default_remote_command")]
    pub remote_command: String,

    /// How uid/gid tokens are validated
    #[serde(default)]
    pub id_policy: IdPolicy,

    /// Also report gid drift
    #[serde(default)]
    pub report_gid: bool,

    /// Report format
    #[serde(default)]
    pub format: OutputFormat,

    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stderr)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,

    /// Show a progress bar while collecting
    #[serde(default)]
    pub show_progress: bool,

    /// Print a run summary table at the end
    #[serde(default)]
    pub show_stats: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            hosts_file: None,
            staging_dir: default_staging_dir(),
            workers: default_workers(),
            timeout_secs: default_timeout_secs(),
            transport: default_transport(),
            transport_args: default_transport_args(),
            remote_command: default_remote_command(),
            id_policy: IdPolicy::Opaque,
            report_gid: false,
            format: OutputFormat::Text,
            log_level: LogLevel::Info,
            log_file: None,
            verbose: false,
            show_progress: false,
            show_stats: false,
        }
    }
}

/// Validation applied to the uid and gid fields of a collected line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IdPolicy {
    /// Ids are opaque tokens; any text is accepted
    #[default]
    Opaque,

    /// Ids must be unsigned 32-bit integers; other lines are dropped
    Numeric,
}

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Indented text, as read by people
    #[default]
    Text,

    /// One JSON document per output channel
    Json,
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

// Default value functions for serde
fn default_staging_dir() -> PathBuf {
    std::env::temp_dir().join("uidaudit")
}

fn default_workers() -> usize {
    5
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_transport() -> String {
    "ssh".to_string()
}

fn default_transport_args() -> Vec<String> {
    vec!["-o".to_string(), "BatchMode=yes".to_string()]
}

fn default_remote_command() -> String {
    DEFAULT_REMOTE_COMMAND.to_string()
}

impl AuditConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AuditError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: AuditConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Render the configuration as pretty TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| AuditError::Config(format!("TOML encode error: {}", e)))
    }

    /// Worker pool size, never zero
    pub fn effective_workers(&self) -> usize {
        self.workers.max(1)
    }

    /// Per-host timeout, `None` when disabled
    pub fn host_timeout(&self) -> Option<Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_secs))
        }
    }
}
