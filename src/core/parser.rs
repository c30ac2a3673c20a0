//! Turns raw `name:uid:gid` lines into account observations.

use tracing::debug;

use crate::config::IdPolicy;

/// One account as reported by one host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountObservation {
    pub account: String,
    pub uid: String,
    pub gid: String,
    pub host: String,
}

/// Parse result for one host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedHost {
    pub observations: Vec<AccountObservation>,
    /// Lines rejected as malformed
    pub dropped: usize,
}

/// Parse every collected line of `host`. Malformed lines are counted and
/// skipped; they never stop the remaining lines from being parsed.
pub fn parse_host(host: &str, lines: &[String], policy: IdPolicy) -> ParsedHost {
    let mut parsed = ParsedHost::default();

    for line in lines {
        match parse_line(line, policy) {
            Some((account, uid, gid)) => parsed.observations.push(AccountObservation {
                account: account.to_string(),
                uid: uid.to_string(),
                gid: gid.to_string(),
                host: host.to_string(),
            }),
            None => {
                debug!(host, line = %line, "dropping malformed account line");
                parsed.dropped += 1;
            }
        }
    }

    parsed
}

/// Split a line into `(name, uid, gid)`. Fields past the third are ignored.
pub fn parse_line(line: &str, policy: IdPolicy) -> Option<(&str, &str, &str)> {
    let mut fields = line.split(':');
    let name = fields.next()?;
    let uid = fields.next()?;
    let gid = fields.next()?;

    match policy {
        IdPolicy::Opaque => Some((name, uid, gid)),
        IdPolicy::Numeric => {
            if uid.parse::<u32>().is_ok() && gid.parse::<u32>().is_ok() {
                Some((name, uid, gid))
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_parse_line_fields() {
        assert_eq!(
            parse_line("alice:1001:100", IdPolicy::Opaque),
            Some(("alice", "1001", "100"))
        );
        assert_eq!(
            parse_line("bob:1002:100:extra", IdPolicy::Opaque),
            Some(("bob", "1002", "100"))
        );
        assert_eq!(parse_line("carol:1003", IdPolicy::Opaque), None);
        assert_eq!(parse_line("", IdPolicy::Opaque), None);
    }

    #[test]
    fn test_malformed_line_does_not_stop_batch() {
        let parsed = parse_host(
            "h1",
            &lines(&["root:0:0", "garbage", "alice:1001:1001"]),
            IdPolicy::Opaque,
        );
        assert_eq!(parsed.dropped, 1);
        let names: Vec<_> = parsed.observations.iter().map(|o| o.account.as_str()).collect();
        assert_eq!(names, vec!["root", "alice"]);
        assert!(parsed.observations.iter().all(|o| o.host == "h1"));
    }

    #[test]
    fn test_opaque_ids_accepted() {
        let parsed = parse_host("h1", &lines(&["svc:x:-"]), IdPolicy::Opaque);
        assert_eq!(parsed.observations[0].uid, "x");
        assert_eq!(parsed.observations[0].gid, "-");
    }

    #[test]
    fn test_numeric_policy_rejects_tokens() {
        let parsed = parse_host(
            "h1",
            &lines(&["svc:x:100", "svc2:100:-1", "ok:42:42"]),
            IdPolicy::Numeric,
        );
        assert_eq!(parsed.dropped, 2);
        assert_eq!(parsed.observations.len(), 1);
        assert_eq!(parsed.observations[0].account, "ok");
    }
}
