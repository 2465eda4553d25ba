//! jsqlon Core Library
//!
//! Keeps a SQLite database and a JSON text backup of it reconciled. A
//! reconciliation pass restores the database from the backup when the
//! database is missing or stale, and rewrites the backup when the database
//! has newer content.
//!
//! # Architecture
//!
//! - **SQLite**: the live database, read through its catalog and rebuilt
//!   with generated `CREATE TABLE`/`INSERT` statements in one transaction
//! - **JSON backup**: `<database>.json`, the whole database as text
//!
//! Change detection compares SHA-256 fingerprints of both sides first and
//! only falls back to modification times when the content differs.
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::for_database("data.db");
//! let ((), report) = Session::run(&config, |_| Ok::<_, SyncError>(()))?;
//! ```
//!
//! # Modules
//!
//! - `session`: enter/exit lifecycle of a pass (main entry point)
//! - `models`: tables, columns, rows and values
//! - `schema`: `CREATE TABLE` parsing and statement generation
//! - `codec`: the JSON backup format
//! - `fingerprint`: content digests
//! - `policy`: which way to sync
//! - `storage`: SQLite access, introspection, loading and the backup file
//! - `config`: application configuration

pub mod codec;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod models;
pub mod policy;
pub mod schema;
pub mod session;
pub mod storage;

pub use config::Config;
pub use error::{SyncError, SyncResult};
pub use fingerprint::Fingerprint;
pub use models::{BackupDocument, ColumnSpec, Row, TableData, TableSpec, Value};
pub use policy::{Action, Decision, Reason};
pub use session::{PassReport, RefreshReport, Session};
pub use storage::{BackupFile, LoadReport, SqliteStore};
