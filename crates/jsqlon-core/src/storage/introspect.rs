//! Reading a live database into a `BackupDocument`
//!
//! Table definitions come from `sqlite_master` and go through the DDL
//! parser; rows come from `SELECT *` in the database's natural order.

use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::models::{BackupDocument, Row, TableData, Value};
use crate::schema::{normalize_whitespace, parse_create_table, quote_identifier};
use crate::storage::sqlite::SqliteStore;

/// User tables only; SQLite's own tables (`sqlite_sequence`, ...) are skipped
const CATALOG_QUERY: &str = "SELECT name, sql FROM sqlite_master \
     WHERE type = 'table' AND sql IS NOT NULL AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'";

/// Materialize the whole database: every user table with all its rows
///
/// Tables with a definition the parser does not support fail the whole
/// read with `SchemaParse`. Empty tables and empty databases are fine.
pub fn introspect(store: &SqliteStore) -> SyncResult<BackupDocument> {
    let mut doc = BackupDocument::new();

    for entry in store.query_rows(CATALOG_QUERY)? {
        let Some(Value::Text(sql)) = entry.get("sql") else {
            continue;
        };

        let spec = parse_create_table(&normalize_whitespace(sql))?;
        if let Some(Value::Text(name)) = entry.get("name") {
            if !name.eq_ignore_ascii_case(&spec.name) {
                return Err(SyncError::SchemaParse {
                    sql: sql.clone(),
                    details: format!("definition names '{}' but table is '{}'", spec.name, name),
                });
            }
        }

        let query = format!("SELECT * FROM {};", quote_identifier(&spec.name));
        let mut rows = Vec::new();
        for raw in store.query_rows(&query)? {
            let mut row = Row::new();
            for column in &spec.columns {
                let value = raw.get(&column.name).ok_or_else(|| SyncError::SchemaParse {
                    sql: sql.clone(),
                    details: format!(
                        "column '{}' is declared but missing from the table's rows",
                        column.name
                    ),
                })?;
                row.set(column.name.clone(), value.clone());
            }
            rows.push(row);
        }

        debug!("Read table '{}' with {} rows", spec.name, rows.len());
        doc.insert(TableData::with_rows(spec, rows));
    }

    Ok(doc)
}
