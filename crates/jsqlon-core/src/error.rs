//! Error handling
//!
//! Typed errors for reconciliation passes with descriptive messages
//! and recovery suggestions.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reconciling a database with its backup
#[derive(Error, Debug)]
pub enum SyncError {
    /// The storage engine rejected an operation
    #[error("Database error on '{path}': {source}")]
    StoreAccess {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// A single-row lookup returned nothing
    #[error("No results returned for query: \"{query}\"")]
    EmptyResult { query: String },

    /// Schema definition text is outside the supported shape
    #[error("Unsupported table definition: {details} (in `{sql}`)")]
    SchemaParse { sql: String, details: String },

    /// A table or column definition breaks a model invariant
    #[error("Invalid definition for table '{table}': {details}")]
    InvalidSchema { table: String, details: String },

    /// A value is not an integer, float, text or null
    #[error("Unsupported value type {kind} in {context}")]
    UnsupportedValueType { kind: String, context: String },

    /// One statement of a transactional batch failed; nothing was applied
    #[error("Statement failed, batch rolled back: {statement}: {source}")]
    StatementFailed {
        statement: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Backup text does not match the expected layout
    #[error("Invalid backup format in '{path}': {details}")]
    BackupFormat { path: PathBuf, details: String },

    /// Permission denied accessing path
    #[error("Permission denied: cannot access '{path}'. Check file permissions.")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// File not found (when expected to exist)
    #[error("File not found: '{path}'")]
    NotFound { path: PathBuf },

    /// Disk is full or quota exceeded
    #[error(
        "Disk full or quota exceeded while writing to '{path}'. Free up disk space and try again."
    )]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Any other I/O failure on a path
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SyncError {
    /// Create an error from an I/O error with path context
    ///
    /// Classifies the error based on its kind (permission, disk full, etc.)
    pub fn from_io(error: io::Error, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match error.kind() {
            io::ErrorKind::PermissionDenied => SyncError::PermissionDenied {
                path,
                source: error,
            },
            io::ErrorKind::NotFound => SyncError::NotFound { path },
            _ if is_disk_full_error(&error) => SyncError::DiskFull {
                path,
                source: error,
            },
            _ => SyncError::Io {
                path,
                source: error,
            },
        }
    }

    /// Wrap an engine error with the database path it happened on
    pub fn store(source: rusqlite::Error, path: impl Into<PathBuf>) -> Self {
        SyncError::StoreAccess {
            path: path.into(),
            source,
        }
    }

    /// Whether this error came from the storage engine side of a pass
    pub fn is_store_access(&self) -> bool {
        matches!(
            self,
            SyncError::StoreAccess { .. }
                | SyncError::EmptyResult { .. }
                | SyncError::StatementFailed { .. }
        )
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            SyncError::DiskFull { .. } => Some("Free up disk space and try again."),
            SyncError::PermissionDenied { .. } => {
                Some("Check file and directory permissions of the database and its backup.")
            }
            SyncError::SchemaParse { .. } => Some(
                "Only single tables with a flat column list can be backed up. \
                 Composite keys, foreign keys and CHECK constraints are not supported.",
            ),
            SyncError::BackupFormat { .. } => Some(
                "Fix or remove the JSON backup; it will be regenerated from the database.",
            ),
            SyncError::StatementFailed { .. } => {
                Some("The database was left untouched. Correct the offending backup entry and retry.")
            }
            _ => None,
        }
    }
}

/// Check if an I/O error indicates disk full condition
fn is_disk_full_error(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left")
        || msg.contains("disk full")
        || msg.contains("quota exceeded")
        || msg.contains("not enough space")
}

/// Result type for reconciliation operations
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_classification() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err = SyncError::from_io(io_err, "/test/path");

        assert!(matches!(err, SyncError::PermissionDenied { .. }));
        assert!(err.recovery_suggestion().is_some());
        assert!(!err.is_store_access());
    }

    #[test]
    fn test_not_found_classification() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err = SyncError::from_io(io_err, "/missing/file");

        assert!(matches!(err, SyncError::NotFound { .. }));
    }

    #[test]
    fn test_disk_full_detection() {
        let io_err = io::Error::new(io::ErrorKind::Other, "No space left on device");
        let err = SyncError::from_io(io_err, "/full/disk");

        assert!(matches!(err, SyncError::DiskFull { .. }));
    }

    #[test]
    fn test_store_access_family() {
        let empty = SyncError::EmptyResult {
            query: "SELECT 1 WHERE 0".to_string(),
        };
        assert!(empty.is_store_access());

        let failed = SyncError::StatementFailed {
            statement: "INSERT INTO t (a) VALUES (1);".to_string(),
            source: rusqlite::Error::InvalidQuery,
        };
        assert!(failed.is_store_access());
        assert!(failed.to_string().contains("INSERT INTO t"));

        let parse = SyncError::SchemaParse {
            sql: "CREATE VIEW v AS SELECT 1".to_string(),
            details: "not a CREATE TABLE statement".to_string(),
        };
        assert!(!parse.is_store_access());
    }

    #[test]
    fn test_error_display() {
        let err = SyncError::UnsupportedValueType {
            kind: "boolean".to_string(),
            context: "row 0 of table 'users'".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("boolean"));
        assert!(msg.contains("users"));
    }
}
