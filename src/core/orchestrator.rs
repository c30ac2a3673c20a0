/*!
 * Audit run sequencing.
 *
 * Host list, staging, collection, then parsing and merging. Every host is
 * collected before the first observation is merged, so the registry is only
 * ever touched from this thread.
 */

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::config::AuditConfig;
use crate::core::collector::{Collector, Outcome};
use crate::core::parser::parse_host;
use crate::core::registry::{AccountRegistry, IdKind};
use crate::core::staging::StagingArea;
use crate::core::transport::{FailureKind, Transport};
use crate::error::{AuditError, Result};
use crate::hosts::read_hosts_file;

/// A host whose account table could not be collected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedHost {
    pub host: String,
    pub kind: FailureKind,
    pub error: String,
}

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub hosts: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub observations: usize,
    pub dropped_lines: usize,
    pub elapsed: Duration,
}

/// Everything a completed run produced
#[derive(Debug)]
pub struct AuditRun {
    pub registry: AccountRegistry,
    /// Failed hosts in host-list order
    pub failures: Vec<FailedHost>,
    pub stats: RunStats,
    /// Non-fatal problems worth telling the operator about
    pub diagnostics: Vec<String>,
    pub interrupted: bool,
}

impl AuditRun {
    pub fn drifting(&self, kind: IdKind) -> usize {
        self.registry.drifting_accounts(kind).len()
    }
}

/// Run a full audit.
///
/// Fails only when no host list is configured, the host list cannot be read,
/// or the worker pool cannot be built. Everything the run staged is removed
/// before this returns, whatever the outcome.
pub fn run_audit(
    config: &AuditConfig,
    transport: &dyn Transport,
    interrupted: &AtomicBool,
) -> Result<AuditRun> {
    let hosts_file = config
        .hosts_file
        .as_deref()
        .ok_or(AuditError::MissingHostList)?;

    let started = Instant::now();
    let mut diagnostics = Vec::new();

    let (staging, fallback) = StagingArea::create_or_fallback(&config.staging_dir)?;
    diagnostics.extend(fallback);

    let hosts = read_hosts_file(hosts_file)?;
    info!(hosts = hosts.len(), file = %hosts_file.display(), "loaded host list");

    let results =
        Collector::from_config(transport, config).collect_all(&hosts, &staging, interrupted)?;

    let mut registry = AccountRegistry::new();
    let mut failures = Vec::new();
    let mut stats = RunStats {
        hosts: hosts.len(),
        ..Default::default()
    };

    for result in results {
        match result.outcome {
            Outcome::Success(lines) => {
                let parsed = parse_host(&result.host, &lines, config.id_policy);
                if parsed.dropped > 0 {
                    info!(host = %result.host, dropped = parsed.dropped, "skipped malformed lines");
                }
                stats.succeeded += 1;
                stats.observations += parsed.observations.len();
                stats.dropped_lines += parsed.dropped;
                registry.merge_all(&parsed.observations);
            }
            Outcome::Failure(failure) => {
                stats.failed += 1;
                failures.push(FailedHost {
                    host: result.host,
                    kind: failure.kind,
                    error: failure.error,
                });
            }
        }
    }

    if let Err(e) = staging.remove() {
        warn!("{}", e);
        diagnostics.push(e.to_string());
    }

    stats.elapsed = started.elapsed();
    info!(
        accounts = registry.len(),
        uid_drift = registry.drifting_accounts(IdKind::Uid).len(),
        failed = stats.failed,
        "audit complete"
    );

    Ok(AuditRun {
        registry,
        failures,
        stats,
        diagnostics,
        interrupted: interrupted.load(Ordering::SeqCst),
    })
}
