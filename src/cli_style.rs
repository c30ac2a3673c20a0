/*!
 * uidaudit CLI Style System
 *
 * Styling for the diagnostic side of the CLI: warnings, errors and the
 * optional run summary table. The drift report itself is never styled.
 */

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use console::{style, StyledObject};

use crate::core::orchestrator::AuditRun;
use crate::core::registry::IdKind;

// ============================================================================
// THEME COLORS
// ============================================================================

pub struct Theme;

impl Theme {
    pub fn warning<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).yellow()
    }

    pub fn error<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).red()
    }

    /// Muted/secondary text (dim)
    pub fn muted<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).dim()
    }
}

// ============================================================================
// ICONS
// ============================================================================

pub struct Icons;

impl Icons {
    pub const ERROR: &'static str = "✗";
    pub const WARNING: &'static str = "⚠";
    pub const ARROW_RIGHT: &'static str = "→";
}

// ============================================================================
// TABLES
// ============================================================================

/// Create a minimal table (no outer borders)
pub fn create_minimal_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_NO_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Create a key-value table for stats
pub fn stats_table(items: &[(&str, String)]) -> Table {
    let mut table = create_minimal_table();

    for (key, value) in items {
        table.add_row(vec![
            Cell::new(key).fg(Color::Cyan),
            Cell::new(value)
                .fg(Color::White)
                .add_attribute(Attribute::Bold),
        ]);
    }

    table
}

/// Summary rows for a finished run
pub fn run_summary_items(run: &AuditRun, include_gid: bool) -> Vec<(&'static str, String)> {
    let stats = &run.stats;
    let mut items = vec![
        ("Hosts", stats.hosts.to_string()),
        ("Succeeded", stats.succeeded.to_string()),
        ("Failed", stats.failed.to_string()),
        ("Accounts", run.registry.len().to_string()),
        ("UID drift", run.drifting(IdKind::Uid).to_string()),
    ];
    if include_gid {
        items.push(("GID drift", run.drifting(IdKind::Gid).to_string()));
    }
    items.push(("Dropped lines", stats.dropped_lines.to_string()));
    items.push(("Elapsed", format_duration(stats.elapsed.as_secs_f64())));
    items
}

/// Run summary table
pub fn run_summary_table(run: &AuditRun, include_gid: bool) -> Table {
    stats_table(&run_summary_items(run, include_gid))
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Format duration into human-readable string
pub fn format_duration(secs: f64) -> String {
    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else if secs < 3600.0 {
        let mins = (secs / 60.0).floor();
        let remaining = secs % 60.0;
        format!("{}m {:.0}s", mins, remaining)
    } else {
        let hours = (secs / 3600.0).floor();
        let mins = ((secs % 3600.0) / 60.0).floor();
        format!("{}h {}m", hours, mins)
    }
}

/// Print a styled error message with optional suggestion
pub fn print_error(message: &str, suggestion: Option<&str>) {
    eprintln!(
        "{} {}",
        Theme::error(format!("{} Error:", Icons::ERROR)),
        message
    );

    if let Some(hint) = suggestion {
        eprintln!(
            "  {} {}",
            Theme::muted(Icons::ARROW_RIGHT),
            Theme::muted(hint)
        );
    }
}

/// Print a styled warning message
pub fn print_warning(message: &str) {
    eprintln!(
        "{} {}",
        Theme::warning(Icons::WARNING.to_string()),
        Theme::warning(message)
    );
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::orchestrator::RunStats;
    use crate::core::registry::AccountRegistry;
    use std::time::Duration;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.5), "500ms");
        assert_eq!(format_duration(1.0), "1.0s");
        assert_eq!(format_duration(65.0), "1m 5s");
        assert_eq!(format_duration(3665.0), "1h 1m");
    }

    #[test]
    fn test_run_summary_items() {
        let run = AuditRun {
            registry: AccountRegistry::new(),
            failures: Vec::new(),
            stats: RunStats {
                hosts: 3,
                succeeded: 2,
                failed: 1,
                observations: 10,
                dropped_lines: 4,
                elapsed: Duration::from_millis(1500),
            },
            diagnostics: Vec::new(),
            interrupted: false,
        };

        let items = run_summary_items(&run, false);
        assert_eq!(items[0], ("Hosts", "3".to_string()));
        assert_eq!(items[2], ("Failed", "1".to_string()));
        assert!(items.iter().all(|(key, _)| *key != "GID drift"));
        assert_eq!(items.last().unwrap(), &("Elapsed", "1.5s".to_string()));

        let with_gid = run_summary_items(&run, true);
        assert!(with_gid.iter().any(|(key, _)| *key == "GID drift"));
    }
}
