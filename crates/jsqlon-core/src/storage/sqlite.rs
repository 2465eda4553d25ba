//! SQLite access
//!
//! Every operation opens its own connection and closes it before returning,
//! on success and on error alike. Reads use a read-only connection so that
//! looking at a database never creates one.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::models::{Row, Value};

/// Handle on the live SQLite database file
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the database file exists
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Last modification time of the database file
    pub fn modified(&self) -> SyncResult<SystemTime> {
        fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .map_err(|e| SyncError::from_io(e, &self.path))
    }

    fn open_read_only(&self) -> SyncResult<Connection> {
        if !self.exists() {
            return Err(SyncError::NotFound {
                path: self.path.clone(),
            });
        }
        Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| SyncError::store(e, &self.path))
    }

    fn open_read_write(&self) -> SyncResult<Connection> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SyncError::from_io(e, parent))?;
        }
        Connection::open(&self.path).map_err(|e| SyncError::store(e, &self.path))
    }

    /// Run a query and return all rows
    ///
    /// No rows is a valid result.
    pub fn query_rows(&self, sql: &str) -> SyncResult<Vec<Row>> {
        let conn = self.open_read_only()?;
        self.read_rows(&conn, sql)
    }

    /// Run a query expected to return at least one row and return the first
    pub fn query_one(&self, sql: &str) -> SyncResult<Row> {
        self.query_rows(sql)?
            .into_iter()
            .next()
            .ok_or_else(|| SyncError::EmptyResult {
                query: sql.to_string(),
            })
    }

    fn read_rows(&self, conn: &Connection, sql: &str) -> SyncResult<Vec<Row>> {
        let db = |e: rusqlite::Error| SyncError::store(e, &self.path);

        let mut stmt = conn.prepare(sql).map_err(db)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query([]).map_err(db)?;
        let mut result = Vec::new();
        while let Some(row) = rows.next().map_err(db)? {
            let mut values = Row::new();
            for (i, name) in columns.iter().enumerate() {
                let context = format!("column '{}' of `{}`", name, sql);
                let value = Value::from_sql(row.get_ref(i).map_err(db)?, &context)?;
                values.set(name.clone(), value);
            }
            result.push(values);
        }

        Ok(result)
    }

    /// Execute statements in a single transaction
    ///
    /// The first failing statement aborts the batch and is reported with
    /// the engine error; nothing from the batch is committed. Creates the
    /// database file if it does not exist yet. Returns the number of
    /// statements executed.
    pub fn execute_transaction<'a, I>(&self, statements: I) -> SyncResult<usize>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let db = |e: rusqlite::Error| SyncError::store(e, &self.path);

        let mut conn = self.open_read_write()?;
        let tx = conn.transaction().map_err(db)?;

        let mut executed = 0;
        for statement in statements {
            debug!("Executing: {}", statement);
            tx.execute_batch(statement)
                .map_err(|source| SyncError::StatementFailed {
                    statement: statement.to_string(),
                    source,
                })?;
            executed += 1;
        }

        tx.commit().map_err(db)?;
        Ok(executed)
    }

    /// Run SQLite's quick integrity check
    pub fn quick_check(&self) -> SyncResult<bool> {
        let row = self.query_one("PRAGMA quick_check")?;
        let ok = matches!(row.iter().next(), Some((_, Value::Text(s))) if s == "ok");
        Ok(ok)
    }
}
