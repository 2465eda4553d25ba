//! Data models for jsqlon
//!
//! Structural representation of a database's contents: tables, columns and
//! rows. Every collection here is an ordered sequence, because table order,
//! column declaration order and row order all have to survive a trip through
//! the JSON backup unchanged.

use std::fmt;

use rusqlite::types::ValueRef;

use crate::error::{SyncError, SyncResult};

/// A single cell value
///
/// Only the four kinds the backup format can carry exist. Anything else is
/// rejected when the value is constructed, never coerced.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
    Null,
}

impl Value {
    /// Whether this value is SQL NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Build a float value, rejecting NaN and infinities
    pub fn float(value: f64, context: &str) -> SyncResult<Self> {
        if value.is_finite() {
            Ok(Value::Float(value))
        } else {
            Err(SyncError::UnsupportedValueType {
                kind: format!("non-finite float ({})", value),
                context: context.to_string(),
            })
        }
    }

    /// Convert a JSON value from a backup file
    pub fn from_json(value: serde_json::Value, context: &str) -> SyncResult<Self> {
        let unsupported = |kind: &str| SyncError::UnsupportedValueType {
            kind: kind.to_string(),
            context: context.to_string(),
        };

        match value {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::String(s) => Ok(Value::Text(s)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Integer(i))
                } else if n.is_u64() {
                    Err(unsupported("integer out of 64-bit range"))
                } else if let Some(f) = n.as_f64() {
                    Value::float(f, context)
                } else {
                    Err(unsupported("number"))
                }
            }
            serde_json::Value::Bool(_) => Err(unsupported("boolean")),
            serde_json::Value::Array(_) => Err(unsupported("array")),
            serde_json::Value::Object(_) => Err(unsupported("object")),
        }
    }

    /// Convert a value read from the database
    pub fn from_sql(value: ValueRef<'_>, context: &str) -> SyncResult<Self> {
        match value {
            ValueRef::Null => Ok(Value::Null),
            ValueRef::Integer(i) => Ok(Value::Integer(i)),
            ValueRef::Real(f) => Value::float(f, context),
            ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
                Ok(s) => Ok(Value::Text(s.to_string())),
                Err(_) => Err(SyncError::UnsupportedValueType {
                    kind: "non UTF-8 text".to_string(),
                    context: context.to_string(),
                }),
            },
            ValueRef::Blob(_) => Err(SyncError::UnsupportedValueType {
                kind: "blob".to_string(),
                context: context.to_string(),
            }),
        }
    }

    /// Convert into the JSON value written to a backup file
    ///
    /// NaN and infinities have no JSON form and are rejected.
    pub fn to_json(&self, context: &str) -> SyncResult<serde_json::Value> {
        match self {
            Value::Integer(i) => Ok(serde_json::Value::from(*i)),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .ok_or_else(|| SyncError::UnsupportedValueType {
                    kind: format!("non-finite float ({})", f),
                    context: context.to_string(),
                }),
            Value::Text(s) => Ok(serde_json::Value::String(s.clone())),
            Value::Null => Ok(serde_json::Value::Null),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Text(s) => write!(f, "{}", s),
            Value::Null => write!(f, "NULL"),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value.into())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

/// A column definition
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnSpec {
    /// Column name
    pub name: String,
    /// Engine-native type name (e.g. `INTEGER`, `TEXT`)
    pub datatype: String,
    /// Default applied by the database when an insert omits this column
    pub default: Option<Value>,
    pub not_null: bool,
    pub unique: bool,
    pub primary_key: bool,
    /// Only meaningful together with `primary_key`
    pub autoincrement: bool,
}

impl ColumnSpec {
    /// Create a column with no constraints
    pub fn new(name: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            datatype: datatype.into(),
            ..Self::default()
        }
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = if value.is_null() { None } else { Some(value) };
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn autoincrement(mut self) -> Self {
        self.autoincrement = true;
        self
    }

    /// Check the column's own invariants
    pub fn validate(&self, table: &str) -> SyncResult<()> {
        if self.autoincrement && !self.primary_key {
            return Err(SyncError::InvalidSchema {
                table: table.to_string(),
                details: format!(
                    "column '{}' is AUTOINCREMENT but not PRIMARY KEY",
                    self.name
                ),
            });
        }
        Ok(())
    }
}

/// A table definition: name plus columns in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
}

impl TableSpec {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnSpec>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Check column invariants and that column names are unique
    pub fn validate(&self) -> SyncResult<()> {
        for (i, column) in self.columns.iter().enumerate() {
            column.validate(&self.name)?;
            if self.columns[..i].iter().any(|c| c.name == column.name) {
                return Err(SyncError::InvalidSchema {
                    table: self.name.clone(),
                    details: format!("duplicate column '{}'", column.name),
                });
            }
        }
        Ok(())
    }
}

/// One row: column names mapped to values, in the row's own order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    values: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column's value
    ///
    /// An existing column keeps its position; a new one is appended.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.values.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.values.push((column, value)),
        }
    }

    /// Builder form of [`Row::set`]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.set(column, value);
        }
        row
    }
}

/// A table definition together with its rows
#[derive(Debug, Clone, PartialEq)]
pub struct TableData {
    pub spec: TableSpec,
    pub rows: Vec<Row>,
}

impl TableData {
    pub fn new(spec: TableSpec) -> Self {
        Self {
            spec,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(spec: TableSpec, rows: Vec<Row>) -> Self {
        Self { spec, rows }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Check the table definition and that rows only name declared columns
    pub fn validate(&self) -> SyncResult<()> {
        self.spec.validate()?;
        for (index, row) in self.rows.iter().enumerate() {
            if let Some((column, _)) = row.iter().find(|(c, _)| self.spec.column(c).is_none()) {
                return Err(SyncError::InvalidSchema {
                    table: self.spec.name.clone(),
                    details: format!("row {} names undeclared column '{}'", index, column),
                });
            }
        }
        Ok(())
    }
}

/// The whole contents of a database, tables in order
///
/// Built fresh for each reconciliation pass and dropped at its end.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BackupDocument {
    tables: Vec<TableData>,
}

impl BackupDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table; a table with the same name is replaced in place
    pub fn insert(&mut self, table: TableData) {
        match self.tables.iter_mut().find(|t| t.name() == table.name()) {
            Some(slot) => *slot = table,
            None => self.tables.push(table),
        }
    }

    pub fn get(&self, name: &str) -> Option<&TableData> {
        self.tables.iter().find(|t| t.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut TableData> {
        self.tables.iter_mut().find(|t| t.name() == name)
    }

    pub fn tables(&self) -> &[TableData] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Total number of rows across all tables
    pub fn row_count(&self) -> usize {
        self.tables.iter().map(|t| t.rows.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_set_keeps_position() {
        let mut row = Row::new().with("id", 1).with("name", "Alice");
        row.set("id", 2);

        let columns: Vec<&str> = row.iter().map(|(c, _)| c).collect();
        assert_eq!(columns, vec!["id", "name"]);
        assert_eq!(row.get("id"), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_autoincrement_requires_primary_key() {
        let column = ColumnSpec::new("id", "INTEGER").autoincrement();
        assert!(matches!(
            column.validate("users"),
            Err(SyncError::InvalidSchema { .. })
        ));

        let column = column.primary_key();
        assert!(column.validate("users").is_ok());
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let spec = TableSpec::new(
            "t",
            vec![ColumnSpec::new("a", "TEXT"), ColumnSpec::new("a", "INTEGER")],
        );
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_rows_must_name_declared_columns() {
        let spec = TableSpec::new("t", vec![ColumnSpec::new("a", "TEXT")]);
        let data = TableData::with_rows(spec, vec![Row::new().with("b", 1)]);

        let err = data.validate().unwrap_err();
        assert!(err.to_string().contains("'b'"));
    }

    #[test]
    fn test_document_insert_replaces_in_place() {
        let mut doc = BackupDocument::new();
        doc.insert(TableData::new(TableSpec::new("a", vec![])));
        doc.insert(TableData::new(TableSpec::new("b", vec![])));
        doc.insert(TableData::with_rows(
            TableSpec::new("a", vec![ColumnSpec::new("x", "INTEGER")]),
            vec![Row::new().with("x", 1)],
        ));

        let names: Vec<&str> = doc.tables().iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(doc.row_count(), 1);
    }

    #[test]
    fn test_json_values() {
        assert_eq!(
            Value::from_json(serde_json::json!(3), "t").unwrap(),
            Value::Integer(3)
        );
        assert_eq!(
            Value::from_json(serde_json::json!(2.5), "t").unwrap(),
            Value::Float(2.5)
        );
        assert_eq!(
            Value::from_json(serde_json::json!(null), "t").unwrap(),
            Value::Null
        );
        assert!(matches!(
            Value::from_json(serde_json::json!(true), "t"),
            Err(SyncError::UnsupportedValueType { .. })
        ));
        assert!(matches!(
            Value::from_json(serde_json::json!([1, 2]), "t"),
            Err(SyncError::UnsupportedValueType { .. })
        ));
    }

    #[test]
    fn test_large_json_integer_is_not_coerced() {
        let too_big = serde_json::json!(u64::MAX);
        assert!(matches!(
            Value::from_json(too_big, "t"),
            Err(SyncError::UnsupportedValueType { .. })
        ));
        assert_eq!(
            Value::from_json(serde_json::json!(i64::MAX), "t").unwrap(),
            Value::Integer(i64::MAX)
        );
    }

    #[test]
    fn test_non_finite_float_has_no_json_form() {
        assert!(matches!(
            Value::Float(f64::NAN).to_json("t"),
            Err(SyncError::UnsupportedValueType { .. })
        ));
        assert_eq!(
            Value::Float(0.1).to_json("t").unwrap(),
            serde_json::json!(0.1)
        );
    }

    #[test]
    fn test_sql_values() {
        assert_eq!(
            Value::from_sql(ValueRef::Text(b"hi"), "t").unwrap(),
            Value::Text("hi".to_string())
        );
        assert!(matches!(
            Value::from_sql(ValueRef::Blob(&[0, 1]), "t"),
            Err(SyncError::UnsupportedValueType { .. })
        ));
        assert!(Value::from_sql(ValueRef::Real(f64::INFINITY), "t").is_err());
    }

    #[test]
    fn test_float_display_keeps_fraction() {
        assert_eq!(Value::Float(100.0).to_string(), "100.0");
        assert_eq!(Value::Float(0.25).to_string(), "0.25");
    }
}
