//! Storage layer
//!
//! Both sides of a reconciliation pass:
//!
//! - **SQLite**: the live database, read by introspection and rebuilt by the loader
//! - **JSON backup**: the text copy at `<database>.json`

pub mod backup;
pub mod introspect;
pub mod loader;
pub mod sqlite;

pub use backup::{BackupFile, BACKUP_SUFFIX};
pub use introspect::introspect;
pub use loader::{LoadReport, Loader};
pub use sqlite::SqliteStore;
