//! Output formatting for CLI
//!
//! Provides consistent output formatting for a reconciliation pass:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use jsqlon_core::{Action, Decision, PassReport};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print what a pass did
    pub fn print_report(&self, report: &PassReport) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Human => {
                for line in human_lines(report) {
                    println!("{}", line);
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(report)?);
            }
            OutputFormat::Quiet => {
                println!("{}", outcome(report));
            }
        }
        Ok(())
    }
}

fn describe(step: &str, decision: &Option<Decision>) -> String {
    match decision {
        Some(d) => {
            let action = match d.action {
                Action::Nothing => "nothing to do",
                Action::Restore => "restore database",
                Action::Refresh => "refresh backup",
            };
            format!("{:<9}{} ({})", step, action, d.reason)
        }
        None => format!("{:<9}skipped", step),
    }
}

fn human_lines(report: &PassReport) -> Vec<String> {
    let mut lines = vec![
        format!("Database: {}", report.database.display()),
        format!("Backup:   {}", report.backup.display()),
    ];
    if report.dry_run {
        lines.push("Dry run, no files were changed".to_string());
    }
    lines.push(String::new());
    lines.push(describe("Enter:", &report.enter));
    lines.push(describe("Exit:", &report.exit));

    if let Some(ref snapshot) = report.snapshot {
        lines.push(format!("Previous database kept at {}", snapshot.display()));
    }
    if let Some(ref load) = report.restored {
        if load.dry_run {
            lines.push(format!("Would run {} statement(s):", load.statements));
            for statement in &load.recorded {
                lines.push(format!("  {}", statement));
            }
        } else {
            lines.push(format!("✓ Restored with {} statement(s)", load.statements));
        }
    }
    if let Some(ref refresh) = report.refreshed {
        let verb = if refresh.dry_run { "Would write" } else { "✓ Wrote" };
        lines.push(format!(
            "{} {} table(s), {} row(s) to the backup",
            verb, refresh.tables, refresh.rows
        ));
    }
    lines
}

/// One word summing up the pass
fn outcome(report: &PassReport) -> &'static str {
    if report.restored.is_some() {
        "restored"
    } else if report.refreshed.is_some() {
        "refreshed"
    } else {
        "unchanged"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsqlon_core::{LoadReport, Reason, RefreshReport};
    use std::path::PathBuf;

    fn report() -> PassReport {
        PassReport {
            database: PathBuf::from("/data/app.db"),
            backup: PathBuf::from("/data/app.db.json"),
            ..PassReport::default()
        }
    }

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_outcome() {
        let mut r = report();
        assert_eq!(outcome(&r), "unchanged");

        r.refreshed = Some(RefreshReport {
            tables: 1,
            rows: 2,
            dry_run: false,
        });
        assert_eq!(outcome(&r), "refreshed");

        r.refreshed = None;
        r.restored = Some(LoadReport::default());
        assert_eq!(outcome(&r), "restored");
    }

    #[test]
    fn test_human_lines_for_restore() {
        let mut r = report();
        r.enter = Some(Decision {
            action: Action::Restore,
            reason: Reason::BackupNewer,
        });
        r.exit = Some(Decision {
            action: Action::Nothing,
            reason: Reason::Recovered,
        });
        r.snapshot = Some(PathBuf::from("/data/app.db.2026-10-18T0930.bak"));
        r.restored = Some(LoadReport {
            statements: 3,
            recorded: Vec::new(),
            dry_run: false,
        });

        let lines = human_lines(&r);
        assert_eq!(lines[0], "Database: /data/app.db");
        assert!(lines.contains(
            &"Enter:   restore database (JSON backup is newer than the database)".to_string()
        ));
        assert!(lines.contains(&"Previous database kept at /data/app.db.2026-10-18T0930.bak".to_string()));
        assert!(lines.contains(&"✓ Restored with 3 statement(s)".to_string()));
    }

    #[test]
    fn test_human_lines_for_dry_run() {
        let mut r = report();
        r.dry_run = true;
        r.restored = Some(LoadReport {
            statements: 1,
            recorded: vec!["CREATE TABLE t (a INTEGER);".to_string()],
            dry_run: true,
        });

        let lines = human_lines(&r);
        assert!(lines.contains(&"Dry run, no files were changed".to_string()));
        assert!(lines.contains(&"Exit:    skipped".to_string()));
        assert!(lines.contains(&"  CREATE TABLE t (a INTEGER);".to_string()));
    }

    #[test]
    fn test_json_report_shape() {
        let mut r = report();
        r.exit = Some(Decision {
            action: Action::Refresh,
            reason: Reason::NoBackup,
        });

        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["exit"]["action"], "refresh");
        assert_eq!(json["exit"]["reason"], "no_backup");
        assert!(json["restored"].is_null());
    }
}
