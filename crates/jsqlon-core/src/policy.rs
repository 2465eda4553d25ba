//! Deciding which way to sync
//!
//! Pure functions over what is on disk. Content equality always wins over
//! modification times, so touching a file without changing it never causes
//! a restore or a refresh.

use std::fmt;
use std::time::SystemTime;

use serde::Serialize;

/// The state of both stores at one point in a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Observation {
    /// Modification time of the database, `None` if it does not exist
    pub database_modified: Option<SystemTime>,
    /// Modification time of the backup, `None` if it does not exist
    pub backup_modified: Option<SystemTime>,
    /// Whether both fingerprints match; ignored unless both stores exist
    pub same_content: bool,
}

/// What a step of the pass does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Nothing,
    /// Rebuild the database from the backup
    Restore,
    /// Rewrite the backup from the database
    Refresh,
}

/// Why a step decided what it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    NoBackup,
    DatabaseMissing,
    Unchanged,
    BackupNewer,
    DatabaseNewer,
    /// The database was restored earlier in this pass
    Recovered,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Reason::NoBackup => "JSON backup does not exist yet",
            Reason::DatabaseMissing => "database does not exist",
            Reason::Unchanged => "database and backup have the same content",
            Reason::BackupNewer => "JSON backup is newer than the database",
            Reason::DatabaseNewer => "database is newer than the JSON backup",
            Reason::Recovered => "database was just restored from the backup",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub action: Action,
    pub reason: Reason,
}

impl Decision {
    fn new(action: Action, reason: Reason) -> Self {
        Self { action, reason }
    }
}

fn backup_strictly_newer(database: SystemTime, backup: SystemTime) -> bool {
    backup > database
}

/// Decide the enter step: restore or leave the database alone
pub fn on_enter(obs: &Observation) -> Decision {
    let Some(backup) = obs.backup_modified else {
        return Decision::new(Action::Nothing, Reason::NoBackup);
    };
    let Some(database) = obs.database_modified else {
        return Decision::new(Action::Restore, Reason::DatabaseMissing);
    };

    if obs.same_content {
        Decision::new(Action::Nothing, Reason::Unchanged)
    } else if backup_strictly_newer(database, backup) {
        Decision::new(Action::Restore, Reason::BackupNewer)
    } else {
        // refreshing is left to the exit step
        Decision::new(Action::Nothing, Reason::DatabaseNewer)
    }
}

/// Decide the exit step: refresh the backup or leave it alone
///
/// Nothing is written after a restore in the same pass.
pub fn on_exit(obs: &Observation, recovered: bool) -> Decision {
    if recovered {
        return Decision::new(Action::Nothing, Reason::Recovered);
    }
    let Some(database) = obs.database_modified else {
        return Decision::new(Action::Nothing, Reason::DatabaseMissing);
    };
    let Some(backup) = obs.backup_modified else {
        return Decision::new(Action::Refresh, Reason::NoBackup);
    };

    if obs.same_content {
        Decision::new(Action::Nothing, Reason::Unchanged)
    } else if backup_strictly_newer(database, backup) {
        Decision::new(Action::Nothing, Reason::BackupNewer)
    } else {
        Decision::new(Action::Refresh, Reason::DatabaseNewer)
    }
}
