/*!
 * uidaudit - fleet UID/GID drift auditor
 *
 * Queries the account table of every host in a list over a remote transport
 * (ssh by default) and reports accounts whose numeric ids differ between
 * hosts:
 * - Bounded-parallel collection with per-host fault isolation
 * - Per-host timeouts and interrupt handling
 * - Staging directory that is always cleaned up
 * - Text or JSON reports on separate drift and failure channels
 */

pub mod cli_style;
pub mod config;
pub mod core;
pub mod error;
pub mod hosts;
pub mod logging;
pub mod report;

// Re-export commonly used types
pub use config::{AuditConfig, IdPolicy, LogLevel, OutputFormat};
pub use crate::core::{run_audit, AccountRegistry, AuditRun, IdKind, ProcessTransport, Transport};
pub use error::{AuditError, Result};
pub use report::Reporter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
