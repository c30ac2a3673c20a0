/*!
 * Drift and failure reports.
 *
 * The drift report and the failure list go to separate writers; the binary
 * passes stdout and stderr. Nothing here prints on its own.
 */

use std::io::Write;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::config::{AuditConfig, OutputFormat};
use crate::core::orchestrator::FailedHost;
use crate::core::registry::{AccountEntry, AccountRegistry, IdKind};
use crate::error::Result;

pub const FAILURE_HEADING: &str = "Hosts that were not completed:";

/// Renders an audit result in the configured format
#[derive(Debug, Clone)]
pub struct Reporter {
    format: OutputFormat,
    include_gid: bool,
    generated_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct DriftDocument<'a> {
    generated_at: String,
    uid_drift: Vec<JsonAccount<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gid_drift: Option<Vec<JsonAccount<'a>>>,
}

#[derive(Serialize)]
struct JsonAccount<'a> {
    account: &'a str,
    ids: Vec<JsonId<'a>>,
}

#[derive(Serialize)]
struct JsonId<'a> {
    id: &'a str,
    count: usize,
    hosts: &'a [String],
}

#[derive(Serialize)]
struct FailureDocument<'a> {
    failed_hosts: Vec<JsonFailure<'a>>,
}

#[derive(Serialize)]
struct JsonFailure<'a> {
    host: &'a str,
    kind: String,
    error: &'a str,
}

impl Reporter {
    pub fn new(format: OutputFormat, include_gid: bool) -> Self {
        Self {
            format,
            include_gid,
            generated_at: Utc::now(),
        }
    }

    pub fn from_config(config: &AuditConfig) -> Self {
        Self::new(config.format, config.report_gid)
    }

    /// Fix the timestamp stamped on JSON reports
    pub fn with_timestamp(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = generated_at;
        self
    }

    /// Write the drift report for every account whose ids disagree
    pub fn write_drift<W: Write>(&self, out: &mut W, registry: &AccountRegistry) -> Result<()> {
        match self.format {
            OutputFormat::Text => self.write_drift_text(out, registry),
            OutputFormat::Json => self.write_drift_json(out, registry),
        }
    }

    /// Write the failed-host list. Always writes something, even when every
    /// host succeeded.
    pub fn write_failures<W: Write>(&self, out: &mut W, failures: &[FailedHost]) -> Result<()> {
        match self.format {
            OutputFormat::Text => {
                writeln!(out)?;
                writeln!(out, "{}", FAILURE_HEADING)?;
                for failure in failures {
                    writeln!(out, "{}", failure.host)?;
                }
            }
            OutputFormat::Json => {
                let document = FailureDocument {
                    failed_hosts: failures
                        .iter()
                        .map(|f| JsonFailure {
                            host: &f.host,
                            kind: f.kind.to_string(),
                            error: &f.error,
                        })
                        .collect(),
                };
                serde_json::to_writer_pretty(&mut *out, &document)?;
                writeln!(out)?;
            }
        }
        out.flush()?;
        Ok(())
    }

    /// Write the drift report to `out` and the failure list to `err`.
    ///
    /// The failure list is written even when the drift report fails; the
    /// first error is returned afterwards.
    pub fn write_report<O: Write, E: Write>(
        &self,
        out: &mut O,
        err: &mut E,
        registry: &AccountRegistry,
        failures: &[FailedHost],
    ) -> Result<()> {
        let drift = self.write_drift(out, registry);
        let failed = self.write_failures(err, failures);
        drift.and(failed)
    }

    /// Drift report as a string
    pub fn render_drift(&self, registry: &AccountRegistry) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_drift(&mut buffer, registry)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    fn write_drift_text<W: Write>(&self, out: &mut W, registry: &AccountRegistry) -> Result<()> {
        if self.include_gid {
            writeln!(out, "UID drift:")?;
            write_accounts(out, &registry.drifting_accounts(IdKind::Uid), IdKind::Uid)?;
            writeln!(out, "GID drift:")?;
            write_accounts(out, &registry.drifting_accounts(IdKind::Gid), IdKind::Gid)?;
        } else {
            write_accounts(out, &registry.drifting_accounts(IdKind::Uid), IdKind::Uid)?;
        }
        out.flush()?;
        Ok(())
    }

    fn write_drift_json<W: Write>(&self, out: &mut W, registry: &AccountRegistry) -> Result<()> {
        let document = DriftDocument {
            generated_at: self.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            uid_drift: json_accounts(registry, IdKind::Uid),
            gid_drift: self
                .include_gid
                .then(|| json_accounts(registry, IdKind::Gid)),
        };
        serde_json::to_writer_pretty(&mut *out, &document)?;
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }
}

fn write_accounts<W: Write>(out: &mut W, accounts: &[&AccountEntry], kind: IdKind) -> Result<()> {
    for entry in accounts {
        writeln!(out, "{}:", entry.name())?;
        for bucket in entry.buckets(kind) {
            writeln!(out, "\t{}:  {}", bucket.id(), bucket.host_count())?;
            for host in bucket.hosts() {
                writeln!(out, "\t\t{}", host)?;
            }
        }
    }
    Ok(())
}

fn json_accounts(registry: &AccountRegistry, kind: IdKind) -> Vec<JsonAccount<'_>> {
    registry
        .drifting_accounts(kind)
        .into_iter()
        .map(|entry| JsonAccount {
            account: entry.name(),
            ids: entry
                .buckets(kind)
                .iter()
                .map(|bucket| JsonId {
                    id: bucket.id(),
                    count: bucket.host_count(),
                    hosts: bucket.hosts(),
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::AccountObservation;
    use crate::core::transport::FailureKind;
    use chrono::TimeZone;

    fn registry(rows: &[(&str, &str, &str, &str)]) -> AccountRegistry {
        let mut registry = AccountRegistry::new();
        for (account, uid, gid, host) in rows {
            registry.merge(&AccountObservation {
                account: account.to_string(),
                uid: uid.to_string(),
                gid: gid.to_string(),
                host: host.to_string(),
            });
        }
        registry
    }

    fn two_host_fleet() -> AccountRegistry {
        registry(&[
            ("alice", "1001", "1001", "h1"),
            ("root", "0", "0", "h1"),
            ("alice", "1002", "1002", "h2"),
            ("root", "0", "0", "h2"),
        ])
    }

    #[test]
    fn test_text_drift_report() {
        let report = Reporter::new(OutputFormat::Text, false)
            .render_drift(&two_host_fleet())
            .unwrap();
        assert_eq!(report, "alice:\n\t1001:  1\n\t\th1\n\t1002:  1\n\t\th2\n");
    }

    #[test]
    fn test_no_drift_is_empty() {
        let fleet = registry(&[("root", "0", "0", "h1"), ("root", "0", "0", "h2")]);
        let report = Reporter::new(OutputFormat::Text, false).render_drift(&fleet).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn test_gid_section() {
        let fleet = registry(&[("bob", "1005", "100", "h1"), ("bob", "1005", "200", "h2")]);
        let report = Reporter::new(OutputFormat::Text, true).render_drift(&fleet).unwrap();
        assert_eq!(
            report,
            "UID drift:\nGID drift:\nbob:\n\t100:  1\n\t\th1\n\t200:  1\n\t\th2\n"
        );
    }

    #[test]
    fn test_report_is_deterministic() {
        let reporter = Reporter::new(OutputFormat::Text, true);
        let first = reporter.render_drift(&two_host_fleet()).unwrap();
        let second = reporter.render_drift(&two_host_fleet()).unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn test_failures_always_written() {
        let reporter = Reporter::new(OutputFormat::Text, false);

        let mut empty = Vec::new();
        reporter.write_failures(&mut empty, &[]).unwrap();
        assert_eq!(String::from_utf8(empty).unwrap(), "\nHosts that were not completed:\n");

        let mut listed = Vec::new();
        let failures = vec![FailedHost {
            host: "h2".to_string(),
            kind: FailureKind::Transport,
            error: "Connection refused".to_string(),
        }];
        reporter.write_failures(&mut listed, &failures).unwrap();
        assert_eq!(
            String::from_utf8(listed).unwrap(),
            "\nHosts that were not completed:\nh2\n"
        );
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failures_written_when_drift_output_breaks() {
        let failures = vec![FailedHost {
            host: "bad".to_string(),
            kind: FailureKind::Transport,
            error: "Connection refused".to_string(),
        }];
        let mut err = Vec::new();

        let result = Reporter::new(OutputFormat::Text, false).write_report(
            &mut ClosedPipe,
            &mut err,
            &two_host_fleet(),
            &failures,
        );

        assert!(matches!(result, Err(crate::error::AuditError::Io(_))));
        assert_eq!(
            String::from_utf8(err).unwrap(),
            "\nHosts that were not completed:\nbad\n"
        );
    }

    #[test]
    fn test_json_drift_report() {
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let report = Reporter::new(OutputFormat::Json, false)
            .with_timestamp(at)
            .render_drift(&two_host_fleet())
            .unwrap();

        let value: serde_json::Value = serde_json::from_str(&report).unwrap();
        assert_eq!(value["generated_at"], "2026-01-02T03:04:05Z");
        assert!(value.get("gid_drift").is_none());
        let drift = value["uid_drift"].as_array().unwrap();
        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0]["account"], "alice");
        assert_eq!(drift[0]["ids"][0]["id"], "1001");
        assert_eq!(drift[0]["ids"][0]["count"], 1);
        assert_eq!(drift[0]["ids"][1]["hosts"][0], "h2");
    }

    #[test]
    fn test_json_failures() {
        let failures = vec![FailedHost {
            host: "h3".to_string(),
            kind: FailureKind::Timeout,
            error: "timed out after 30s".to_string(),
        }];
        let mut buffer = Vec::new();
        Reporter::new(OutputFormat::Json, false)
            .write_failures(&mut buffer, &failures)
            .unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value["failed_hosts"][0]["host"], "h3");
        assert_eq!(value["failed_hosts"][0]["kind"], "timeout");
    }
}
