/*!
 * Remote collector: queries every host on a bounded worker pool.
 *
 * Each worker runs one host at a time and returns that host's
 * [`CollectionResult`] directly; results come back in host-list order.
 * A failing host never affects the others.
 */

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::AuditConfig;
use crate::core::staging::StagingArea;
use crate::core::transport::{ExecContext, FailureKind, RemoteOutput, Transport, TransportError};
use crate::error::{AuditError, Result};

/// Why a host produced no account table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostFailure {
    pub kind: FailureKind,
    pub error: String,
}

/// Outcome of querying one host: lines or a failure, never both
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Non-empty output lines
    Success(Vec<String>),
    Failure(HostFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionResult {
    pub host: String,
    pub outcome: Outcome,
}

impl CollectionResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }
}

/// Bounded-parallel collector
pub struct Collector<'a> {
    transport: &'a dyn Transport,
    workers: usize,
    timeout: Option<Duration>,
    show_progress: bool,
}

impl<'a> Collector<'a> {
    pub fn new(transport: &'a dyn Transport, workers: usize) -> Self {
        Self {
            transport,
            workers: workers.max(1),
            timeout: None,
            show_progress: false,
        }
    }

    pub fn from_config(transport: &'a dyn Transport, config: &AuditConfig) -> Self {
        Self::new(transport, config.effective_workers())
            .with_timeout(config.host_timeout())
            .with_progress(config.show_progress)
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Query every host, at most `workers` at a time.
    ///
    /// Returns exactly one result per host, in the order of `hosts`. Only a
    /// failure to build the worker pool is an error.
    pub fn collect_all(
        &self,
        hosts: &[String],
        staging: &StagingArea,
        interrupted: &AtomicBool,
    ) -> Result<Vec<CollectionResult>> {
        if hosts.is_empty() {
            return Ok(Vec::new());
        }

        let threads = self.workers.min(hosts.len());
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("uidaudit-worker-{}", i))
            .build()
            .map_err(|e| AuditError::Parallel(format!("Failed to create thread pool: {}", e)))?;

        info!(hosts = hosts.len(), workers = threads, "collecting account tables");

        let progress = self.progress_bar(hosts.len());
        let capture_dir = staging.capture_dir();

        let results = pool.install(|| {
            hosts
                .par_iter()
                .enumerate()
                .map(|(slot, host)| {
                    let ctx = ExecContext {
                        slot,
                        capture_dir: &capture_dir,
                        timeout: self.timeout,
                        interrupted,
                    };
                    let result = self.collect_one(host, &ctx);
                    stage(staging, &result);
                    progress.inc(1);
                    result
                })
                .collect::<Vec<_>>()
        });

        progress.finish_and_clear();
        Ok(results)
    }

    fn collect_one(&self, host: &str, ctx: &ExecContext<'_>) -> CollectionResult {
        let outcome = if ctx.interrupted.load(Ordering::SeqCst) {
            failure(TransportError::Interrupted)
        } else {
            debug!(host, "querying");
            match self.transport.execute(host, ctx) {
                Ok(output) => classify(output),
                Err(e) => failure(e),
            }
        };

        if let Outcome::Failure(ref f) = outcome {
            warn!(host, kind = %f.kind, "collection failed: {}", f.error.trim());
        }

        CollectionResult {
            host: host.to_string(),
            outcome,
        }
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} hosts")
                .map(|style| style.progress_chars("#>-"))
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar
    }
}

/// Decide success or failure from the raw remote output.
///
/// Any error-stream text marks the host failed, even with a zero exit code.
pub fn classify(output: RemoteOutput) -> Outcome {
    // Any stderr byte counts, whitespace included, and is kept verbatim
    if !output.stderr.is_empty() {
        return failure(TransportError::Remote(output.stderr));
    }
    match output.exit_code {
        Some(0) => Outcome::Success(non_empty_lines(&output.stdout)),
        Some(code) => failure(TransportError::ExitStatus(code)),
        None => failure(TransportError::Killed),
    }
}

fn non_empty_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn failure(error: TransportError) -> Outcome {
    Outcome::Failure(HostFailure {
        kind: error.kind(),
        error: error.to_string(),
    })
}

fn stage(staging: &StagingArea, result: &CollectionResult) {
    let persisted = match &result.outcome {
        Outcome::Success(lines) => staging.persist_success(&result.host, lines),
        Outcome::Failure(f) => staging.persist_failure(&result.host, &f.error),
    };
    if let Err(e) = persisted {
        warn!(host = %result.host, "could not stage result: {}", e);
    }
}
