/*!
 * Core audit pipeline
 */

pub mod collector;
pub mod orchestrator;
pub mod parser;
pub mod registry;
pub mod staging;
pub mod transport;

#[cfg(test)]
pub mod mock;

pub use collector::{CollectionResult, Collector, HostFailure, Outcome};
pub use orchestrator::{run_audit, AuditRun, FailedHost, RunStats};
pub use parser::{parse_host, parse_line, AccountObservation, ParsedHost};
pub use registry::{AccountEntry, AccountRegistry, IdBucket, IdKind};
pub use staging::StagingArea;
pub use transport::{ExecContext, FailureKind, ProcessTransport, RemoteOutput, Transport, TransportError};
