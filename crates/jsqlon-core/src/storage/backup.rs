//! JSON backup persistence
//!
//! Reads and writes the text backup that sits next to the database at
//! `<database>.json`. Uses atomic writes (write to temp file, then rename)
//! so a crash mid-write never leaves a truncated backup behind.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::codec;
use crate::error::{SyncError, SyncResult};
use crate::models::BackupDocument;

/// Suffix appended to the database path to name its backup
pub const BACKUP_SUFFIX: &str = ".json";

/// Append a suffix to the full file name (`data.db` -> `data.db.json`)
pub(crate) fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// The backup file belonging to a database
#[derive(Debug, Clone)]
pub struct BackupFile {
    path: PathBuf,
}

impl BackupFile {
    /// Backup for the database at `database_path`
    pub fn for_database(database_path: &Path) -> Self {
        Self {
            path: with_suffix(database_path, BACKUP_SUFFIX),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the backup exists on disk
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Last modification time of the backup
    pub fn modified(&self) -> SyncResult<SystemTime> {
        fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .map_err(|e| SyncError::from_io(e, &self.path))
    }

    /// Read and decode the backup
    pub fn load(&self) -> SyncResult<BackupDocument> {
        let text = fs::read_to_string(&self.path).map_err(|e| SyncError::from_io(e, &self.path))?;
        codec::decode_at(&text, &self.path)
    }

    /// Encode and write the backup, replacing any previous one atomically
    pub fn save(&self, doc: &BackupDocument) -> SyncResult<()> {
        let text = codec::encode(doc)?;
        atomic_write(&self.path, text.as_bytes())
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
fn atomic_write(path: &Path, data: &[u8]) -> SyncResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| SyncError::from_io(e, parent))?;
    }

    let temp_path = with_suffix(path, ".tmp");

    let mut file = File::create(&temp_path).map_err(|e| SyncError::from_io(e, &temp_path))?;
    file.write_all(data)
        .map_err(|e| SyncError::from_io(e, &temp_path))?;

    // Sync to disk before rename
    file.sync_all()
        .map_err(|e| SyncError::from_io(e, &temp_path))?;

    fs::rename(&temp_path, path).map_err(|e| SyncError::from_io(e, path))?;

    Ok(())
}
