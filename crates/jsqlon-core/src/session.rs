//! Reconciliation passes
//!
//! A `Session` is one pass over a database and its JSON backup:
//!
//! - **enter**: restore the database from the backup if the database is
//!   missing, or if the backup is newer and differs in content
//! - **exit**: write a fresh backup if there is none yet, or if the database
//!   is not older than the backup and differs in content
//!
//! A pass that restored never writes a backup on exit. The exit step always
//! runs: `Session::run` calls it after the caller's closure returns, on
//! success and on error, and dropping an unfinished session runs it too.
//!
//! ## Usage
//!
//! ```ignore
//! let config = Config::for_database("data.db");
//! let (rows, report) = Session::run(&config, |session| {
//!     session.store().query_rows("SELECT * FROM users")
//! })?;
//! ```

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{SyncError, SyncResult};
use crate::fingerprint::Fingerprint;
use crate::models::BackupDocument;
use crate::policy::{self, Action, Decision, Observation, Reason};
use crate::schema::RestorePlan;
use crate::storage::backup::with_suffix;
use crate::storage::{introspect, BackupFile, LoadReport, Loader, SqliteStore};

/// Summary of a refresh (backup rewritten from the database)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshReport {
    pub tables: usize,
    pub rows: usize,
    /// Backup left untouched because of dry run
    pub dry_run: bool,
}

/// What a pass did
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PassReport {
    pub database: PathBuf,
    pub backup: PathBuf,
    pub dry_run: bool,
    pub enter: Option<Decision>,
    pub exit: Option<Decision>,
    /// Where the previous database was moved before a restore
    pub snapshot: Option<PathBuf>,
    pub restored: Option<LoadReport>,
    pub refreshed: Option<RefreshReport>,
}

/// One reconciliation pass over a database and its backup
pub struct Session {
    store: SqliteStore,
    backup: BackupFile,
    loader: Loader,
    /// Set once this pass restored the database
    recovered: bool,
    /// Set once the exit step ran (or must not run)
    finished: bool,
    report: PassReport,
}

impl Session {
    fn new(config: &Config) -> Self {
        let store = SqliteStore::new(&config.database_path);
        let backup = BackupFile::for_database(&config.database_path);
        let report = PassReport {
            database: store.path().to_path_buf(),
            backup: backup.path().to_path_buf(),
            dry_run: config.dry_run,
            ..PassReport::default()
        };

        Self {
            store,
            backup,
            loader: Loader::new(config.dry_run),
            recovered: false,
            finished: false,
            report,
        }
    }

    /// Start a pass: run the enter step
    ///
    /// If the enter step fails, no exit step runs.
    pub fn enter(config: &Config) -> SyncResult<Self> {
        let mut session = Self::new(config);
        if let Err(err) = session.enter_step() {
            session.finished = true;
            return Err(err);
        }
        Ok(session)
    }

    /// Finish the pass: run the exit step and return what the pass did
    pub fn exit(mut self) -> SyncResult<PassReport> {
        self.exit_step()?;
        Ok(std::mem::take(&mut self.report))
    }

    /// Run `f` inside a pass
    ///
    /// The exit step runs whether `f` succeeds or fails. An error from `f`
    /// takes priority over an error from the exit step, which is logged.
    pub fn run<T, E, F>(config: &Config, f: F) -> Result<(T, PassReport), E>
    where
        F: FnOnce(&mut Session) -> Result<T, E>,
        E: From<SyncError>,
    {
        let mut session = Session::enter(config)?;
        let result = f(&mut session);
        let exit = session.exit();

        match (result, exit) {
            (Ok(value), Ok(report)) => Ok((value, report)),
            (Ok(_), Err(err)) => Err(err.into()),
            (Err(err), Ok(_)) => Err(err),
            (Err(err), Err(exit_err)) => {
                warn!("Backup step failed after an earlier error: {}", exit_err);
                Err(err)
            }
        }
    }

    /// The live database
    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// The JSON backup
    pub fn backup(&self) -> &BackupFile {
        &self.backup
    }

    /// Whether this pass restored the database
    pub fn recovered(&self) -> bool {
        self.recovered
    }

    /// What the pass has done so far
    pub fn report(&self) -> &PassReport {
        &self.report
    }

    /// Read the whole database
    pub fn document(&self) -> SyncResult<BackupDocument> {
        introspect(&self.store)
    }

    /// Fingerprint of the database contents
    pub fn fingerprint(&self) -> SyncResult<Fingerprint> {
        Fingerprint::of(&self.document()?)
    }

    /// Fingerprint of the backup contents
    pub fn backup_fingerprint(&self) -> SyncResult<Fingerprint> {
        Fingerprint::of(&self.backup.load()?)
    }

    /// Whether database and backup hold the same content
    pub fn backup_is_same(&self) -> SyncResult<bool> {
        Ok(self.fingerprint()? == self.backup_fingerprint()?)
    }

    fn observe(&self) -> SyncResult<Observation> {
        let database_modified = if self.store.exists() {
            Some(self.store.modified()?)
        } else {
            None
        };
        let backup_modified = if self.backup.exists() {
            Some(self.backup.modified()?)
        } else {
            None
        };
        let same_content = match (database_modified, backup_modified) {
            (Some(_), Some(_)) => self.backup_is_same()?,
            _ => false,
        };

        Ok(Observation {
            database_modified,
            backup_modified,
            same_content,
        })
    }

    fn enter_step(&mut self) -> SyncResult<()> {
        let decision = policy::on_enter(&self.observe()?);
        debug!("Enter: {:?} ({})", decision.action, decision.reason);
        self.report.enter = Some(decision);

        if decision.action == Action::Restore {
            info!("{}", decision.reason);
            self.restore()?;
        }
        Ok(())
    }

    fn exit_step(&mut self) -> SyncResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        let decision = if self.recovered {
            policy::on_exit(&Observation::default(), true)
        } else {
            policy::on_exit(&self.observe()?, false)
        };
        debug!("Exit: {:?} ({})", decision.action, decision.reason);
        self.report.exit = Some(decision);

        match decision.action {
            Action::Refresh => {
                info!("{}", decision.reason);
                self.refresh()
            }
            _ => {
                if decision.reason == Reason::DatabaseMissing {
                    warn!("No database at {:?}; nothing to back up", self.store.path());
                }
                Ok(())
            }
        }
    }

    /// Rebuild the database from the backup
    fn restore(&mut self) -> SyncResult<()> {
        let doc = self.backup.load()?;
        let plan = RestorePlan::from_document(&doc)?;

        if self.loader.is_dry_run() {
            self.report.restored = Some(self.loader.apply(&self.store, &plan)?);
            self.recovered = true;
            return Ok(());
        }

        let snapshot = if self.store.exists() {
            Some(set_aside(self.store.path())?)
        } else {
            None
        };

        match self.loader.apply(&self.store, &plan) {
            Ok(load) => self.report.restored = Some(load),
            Err(err) => {
                undo_restore(self.store.path(), snapshot.as_deref());
                return Err(err);
            }
        }

        if !self.store.exists() {
            // an empty backup leaves nothing for SQLite to write
            File::create(self.store.path()).map_err(|e| SyncError::from_io(e, self.store.path()))?;
        }
        if !self.store.quick_check()? {
            warn!("Integrity check failed on restored database {:?}", self.store.path());
        }

        info!(
            "Recovered SQLite database from text backup {:?}",
            self.backup.path()
        );
        self.report.snapshot = snapshot;
        self.recovered = true;
        Ok(())
    }

    /// Rewrite the backup from the database
    fn refresh(&mut self) -> SyncResult<()> {
        let doc = self.document()?;
        let dry_run = self.loader.is_dry_run();

        if dry_run {
            info!(
                "[dry run] Would write text backup {:?} ({} tables)",
                self.backup.path(),
                doc.len()
            );
        } else {
            info!("Writing text backup for database {:?}", self.store.path());
            self.backup.save(&doc)?;
        }

        self.report.refreshed = Some(RefreshReport {
            tables: doc.len(),
            rows: doc.row_count(),
            dry_run,
        });
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(err) = self.exit_step() {
            warn!("Backup step failed while closing session: {}", err);
        }
    }
}

/// Move the database aside to `<database>.<YYYY-MM-DDTHHMM>.bak`
///
/// An earlier snapshot from the same minute is never replaced; the new one
/// gets a `-1`, `-2`, ... suffix instead.
fn set_aside(database: &Path) -> SyncResult<PathBuf> {
    let stamp = Local::now().format("%Y-%m-%dT%H%M").to_string();
    let mut snapshot = with_suffix(database, &format!(".{}.bak", stamp));
    let mut attempt = 1;
    while snapshot.exists() {
        snapshot = with_suffix(database, &format!(".{}-{}.bak", stamp, attempt));
        attempt += 1;
    }

    fs::rename(database, &snapshot).map_err(|e| SyncError::from_io(e, database))?;
    info!("Moved existing database to {:?}", snapshot);
    Ok(snapshot)
}

/// Put things back after a failed restore
fn undo_restore(database: &Path, snapshot: Option<&Path>) {
    if database.exists() {
        if let Err(err) = fs::remove_file(database) {
            warn!("Could not remove partially restored database {:?}: {}", database, err);
            return;
        }
    }
    if let Some(snapshot) = snapshot {
        match fs::rename(snapshot, database) {
            Ok(()) => info!("Restored previous database from {:?}", snapshot),
            Err(err) => warn!(
                "Could not move {:?} back to {:?}: {}",
                snapshot, database, err
            ),
        }
    }
}
