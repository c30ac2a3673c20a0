//! Host list loading.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::warn;

use crate::error::{AuditError, Result};

/// Read a line-delimited host list.
///
/// Blank lines and `#` comments are skipped, surrounding whitespace and
/// double quotes are removed. Order and duplicates are preserved.
///
/// Entries starting with `-` are skipped with a warning: placed before the
/// remote command they would be read as transport options.
pub fn read_hosts_file(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|source| AuditError::HostList {
        path: path.to_path_buf(),
        source,
    })?;

    let mut hosts = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|source| AuditError::HostList {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(host) = normalize_host(&line) {
            hosts.push(host);
        }
    }

    Ok(hosts)
}

fn normalize_host(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let host = trimmed.trim_matches('"').trim();
    if host.is_empty() {
        return None;
    }
    if host.starts_with('-') {
        warn!(entry = host, "skipping host list entry that looks like an option");
        return None;
    }
    Some(host.to_string())
}
