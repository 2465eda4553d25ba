//! SQL statement generation
//!
//! Turns table definitions and rows back into `CREATE TABLE` and `INSERT`
//! statements for rebuilding a database from its backup.

use std::borrow::Cow;

use crate::error::{SyncError, SyncResult};
use crate::models::{BackupDocument, ColumnSpec, Row, TableSpec, Value};

/// Render a value as a SQL literal
///
/// Text is double-quoted with embedded quotes doubled. Floats always keep a
/// fractional part so the database reads them back as REAL.
pub fn render_literal(value: &Value, context: &str) -> SyncResult<String> {
    match value {
        Value::Integer(i) => Ok(i.to_string()),
        Value::Float(f) if f.is_finite() => Ok(format!("{:?}", f)),
        Value::Float(f) => Err(SyncError::UnsupportedValueType {
            kind: format!("non-finite float ({})", f),
            context: context.to_string(),
        }),
        Value::Text(s) => Ok(format!("\"{}\"", s.replace('"', "\"\""))),
        Value::Null => Ok("NULL".to_string()),
    }
}

/// A table or column name as it appears in generated SQL
///
/// Plain names are written as is; anything else is double-quoted.
pub fn quote_identifier(name: &str) -> Cow<'_, str> {
    let mut chars = name.chars();
    let plain = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if plain {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("\"{}\"", name.replace('"', "\"\"")))
    }
}

fn column_definition(table: &str, column: &ColumnSpec) -> SyncResult<String> {
    let mut sql = format!("{} {}", quote_identifier(&column.name), column.datatype);

    if let Some(ref default) = column.default {
        let context = format!("default of column '{}' in table '{}'", column.name, table);
        sql.push_str(" DEFAULT ");
        sql.push_str(&render_literal(default, &context)?);
    }
    if column.not_null {
        sql.push_str(" NOT NULL");
    }
    if column.unique {
        sql.push_str(" UNIQUE");
    }
    if column.primary_key {
        sql.push_str(" PRIMARY KEY");
        if column.autoincrement {
            sql.push_str(" AUTOINCREMENT");
        }
    }

    Ok(sql)
}

/// Build the `CREATE TABLE` statement for a table definition
pub fn build_create_statement(spec: &TableSpec) -> SyncResult<String> {
    let columns = spec
        .columns
        .iter()
        .map(|c| column_definition(&spec.name, c))
        .collect::<SyncResult<Vec<_>>>()?;

    Ok(format!(
        "CREATE TABLE {} ({});",
        quote_identifier(&spec.name),
        columns.join(", ")
    ))
}

/// Build the `INSERT` statement for one row
///
/// Null values are left out entirely so the database applies column
/// defaults. Columns appear in the row's own order.
pub fn build_insert_statement(table: &str, row: &Row) -> SyncResult<String> {
    let mut columns = Vec::new();
    let mut values = Vec::new();

    for (column, value) in row.iter().filter(|(_, v)| !v.is_null()) {
        let context = format!("column '{}' of table '{}'", column, table);
        columns.push(quote_identifier(column));
        values.push(render_literal(value, &context)?);
    }

    if columns.is_empty() {
        return Ok(format!(
            "INSERT INTO {} DEFAULT VALUES;",
            quote_identifier(table)
        ));
    }

    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({});",
        quote_identifier(table),
        columns.join(","),
        values.join(", ")
    ))
}

/// The statements needed to rebuild a database from a backup
///
/// All schema statements come before all data statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RestorePlan {
    pub schema: Vec<String>,
    pub data: Vec<String>,
}

impl RestorePlan {
    /// Generate statements for every table, in document order
    pub fn from_document(doc: &BackupDocument) -> SyncResult<Self> {
        let mut plan = Self::default();

        for table in doc.tables() {
            table.validate()?;
            plan.schema.push(build_create_statement(&table.spec)?);
        }
        for table in doc.tables() {
            for row in &table.rows {
                plan.data.push(build_insert_statement(table.name(), row)?);
            }
        }

        Ok(plan)
    }

    /// All statements in execution order
    pub fn statements(&self) -> impl Iterator<Item = &str> {
        self.schema.iter().chain(self.data.iter()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.schema.len() + self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schema.is_empty() && self.data.is_empty()
    }
}
