//! Applying a restore plan to the live database
//!
//! The whole plan runs as one transaction: schema statements first, then
//! data statements. Either every statement lands or none does.

use serde::Serialize;
use tracing::{debug, info};

use crate::error::SyncResult;
use crate::schema::RestorePlan;
use crate::storage::sqlite::SqliteStore;

/// What a load did (or would have done)
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct LoadReport {
    /// Number of statements in the plan
    pub statements: usize,
    /// Statements recorded instead of executed (dry run only)
    pub recorded: Vec<String>,
    pub dry_run: bool,
}

/// Executes restore plans, or records them in dry-run mode
#[derive(Debug, Clone, Copy, Default)]
pub struct Loader {
    dry_run: bool,
}

impl Loader {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Apply every statement of `plan` to `store` in a single transaction
    ///
    /// In dry-run mode nothing touches the database; the statements are
    /// logged and returned in the report.
    pub fn apply(&self, store: &SqliteStore, plan: &RestorePlan) -> SyncResult<LoadReport> {
        if self.dry_run {
            let recorded: Vec<String> = plan.statements().map(String::from).collect();
            for statement in &recorded {
                info!("[dry run] {}", statement);
            }
            return Ok(LoadReport {
                statements: recorded.len(),
                recorded,
                dry_run: true,
            });
        }

        debug!(
            "Loading {} schema and {} data statements into {:?}",
            plan.schema.len(),
            plan.data.len(),
            store.path()
        );
        let statements = store.execute_transaction(plan.statements())?;

        Ok(LoadReport {
            statements,
            recorded: Vec::new(),
            dry_run: false,
        })
    }
}
