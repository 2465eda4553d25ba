//! JSON backup format
//!
//! One object per table, tables in database order:
//!
//! ```text
//! { "<table>": {
//!     "columns": { "<col>": { "datatype": "<TYPE>", "not_null": true, ... } },
//!     "rows": [ { "<col>": <value>, ... }, ... ]
//! } }
//! ```
//!
//! Object key order carries meaning (table order, column declaration order,
//! the order of values within a row), so encoding and decoding go through
//! insertion-ordered JSON maps.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::{SyncError, SyncResult};
use crate::models::{BackupDocument, ColumnSpec, Row, TableData, TableSpec, Value};

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct TableEntry {
    columns: Map<String, JsonValue>,
    #[serde(default)]
    rows: Vec<Map<String, JsonValue>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ColumnEntry {
    datatype: String,
    #[serde(default, skip_serializing_if = "is_false")]
    not_null: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    unique: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    primary_key: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    autoincrement: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<JsonValue>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ColumnEntry {
    fn from_spec(table: &str, column: &ColumnSpec) -> SyncResult<Self> {
        let default = match column.default {
            Some(ref value) => {
                let context = format!("default of column '{}' in table '{}'", column.name, table);
                Some(value.to_json(&context)?)
            }
            None => None,
        };

        Ok(Self {
            datatype: column.datatype.clone(),
            not_null: column.not_null,
            unique: column.unique,
            primary_key: column.primary_key,
            autoincrement: column.autoincrement,
            default,
        })
    }
}

fn encoding_error(e: serde_json::Error) -> SyncError {
    SyncError::BackupFormat {
        path: "<document>".into(),
        details: e.to_string(),
    }
}

fn document_to_json(doc: &BackupDocument) -> SyncResult<JsonValue> {
    let mut tables = Map::new();

    for table in doc.tables() {
        let mut columns = Map::new();
        for column in &table.spec.columns {
            let entry = ColumnEntry::from_spec(table.name(), column)?;
            columns.insert(
                column.name.clone(),
                serde_json::to_value(entry).map_err(encoding_error)?,
            );
        }

        let mut rows = Vec::with_capacity(table.rows.len());
        for (index, row) in table.rows.iter().enumerate() {
            let context = format!("row {} of table '{}'", index, table.name());
            let mut values = Map::new();
            for (column, value) in row.iter() {
                values.insert(column.to_string(), value.to_json(&context)?);
            }
            rows.push(values);
        }

        let entry = TableEntry { columns, rows };
        tables.insert(
            table.name().to_string(),
            serde_json::to_value(entry).map_err(encoding_error)?,
        );
    }

    Ok(JsonValue::Object(tables))
}

/// Encode a document as pretty-printed backup text
///
/// Two-space indentation with a trailing newline.
pub fn encode(doc: &BackupDocument) -> SyncResult<String> {
    let mut text =
        serde_json::to_string_pretty(&document_to_json(doc)?).map_err(encoding_error)?;
    text.push('\n');
    Ok(text)
}

/// Encode a document in compact canonical form
///
/// Used for fingerprints: formatting never affects the result, only
/// content and order do.
pub fn encode_compact(doc: &BackupDocument) -> SyncResult<String> {
    serde_json::to_string(&document_to_json(doc)?).map_err(encoding_error)
}

/// Decode backup text that did not come from a file
pub fn decode(text: &str) -> SyncResult<BackupDocument> {
    decode_at(text, Path::new("<input>"))
}

/// Decode backup text read from `path`
///
/// `path` is only used in error messages.
pub fn decode_at(text: &str, path: &Path) -> SyncResult<BackupDocument> {
    let format_error = |details: String| SyncError::BackupFormat {
        path: path.to_path_buf(),
        details,
    };

    let tables: Map<String, JsonValue> =
        serde_json::from_str(text).map_err(|e| format_error(e.to_string()))?;

    let mut doc = BackupDocument::new();
    for (name, entry) in tables {
        let entry: TableEntry = serde_json::from_value(entry)
            .map_err(|e| format_error(format!("table '{}': {}", name, e)))?;

        let mut columns = Vec::with_capacity(entry.columns.len());
        for (column_name, column) in entry.columns {
            let column: ColumnEntry = serde_json::from_value(column).map_err(|e| {
                format_error(format!("column '{}' of table '{}': {}", column_name, name, e))
            })?;
            let default = match column.default {
                Some(value) => {
                    let context = format!("default of column '{}' in table '{}'", column_name, name);
                    Some(Value::from_json(value, &context)?).filter(|v| !v.is_null())
                }
                None => None,
            };
            columns.push(ColumnSpec {
                name: column_name,
                datatype: column.datatype,
                default,
                not_null: column.not_null,
                unique: column.unique,
                primary_key: column.primary_key,
                autoincrement: column.autoincrement,
            });
        }

        let mut rows = Vec::with_capacity(entry.rows.len());
        for (index, values) in entry.rows.into_iter().enumerate() {
            let context = format!("row {} of table '{}'", index, name);
            let row = values
                .into_iter()
                .map(|(column, value)| -> SyncResult<(String, Value)> {
                    Ok((column, Value::from_json(value, &context)?))
                })
                .collect::<SyncResult<Row>>()?;
            rows.push(row);
        }

        let table = TableData::with_rows(TableSpec::new(name, columns), rows);
        table.validate()?;
        doc.insert(table);
    }

    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BackupDocument {
        let mut doc = BackupDocument::new();
        doc.insert(TableData::with_rows(
            TableSpec::new(
                "users",
                vec![
                    ColumnSpec::new("id", "INTEGER").primary_key().autoincrement(),
                    ColumnSpec::new("name", "TEXT").not_null().unique(),
                    ColumnSpec::new("score", "REAL").with_default(Value::Float(0.0)),
                ],
            ),
            vec![
                Row::new().with("id", 1).with("name", "Alice").with("score", Value::Float(1.5)),
                Row::new().with("id", 2).with("name", "Bob").with("score", Value::Null),
            ],
        ));
        doc.insert(TableData::with_rows(
            TableSpec::new("audit", vec![ColumnSpec::new("note", "TEXT")]),
            vec![Row::new().with("note", "quote \" inside")],
        ));
        doc
    }

    #[test]
    fn test_encode_layout() {
        let text = encode(&sample()).unwrap();

        assert!(text.ends_with("}\n"));
        assert!(text.find("\"users\"").unwrap() < text.find("\"audit\"").unwrap());
        assert!(text.find("\"columns\"").unwrap() < text.find("\"rows\"").unwrap());
        assert!(text.contains("\"primary_key\": true"));
        assert!(text.contains("\"default\": 0.0"));
        // false flags are left out
        assert!(!text.contains("false"));
    }

    #[test]
    fn test_decode_inverts_encode() {
        let doc = sample();
        let decoded = decode(&encode(&doc).unwrap()).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn test_order_follows_text_not_names() {
        let text = r#"{
            "zeta": {"columns": {"b": {"datatype": "TEXT"}, "a": {"datatype": "INTEGER"}},
                     "rows": [{"b": "x", "a": 1}]},
            "alpha": {"rows": [], "columns": {"only": {"datatype": "TEXT"}}}
        }"#;
        let doc = decode(text).unwrap();

        let tables: Vec<&str> = doc.tables().iter().map(|t| t.name()).collect();
        assert_eq!(tables, vec!["zeta", "alpha"]);

        let zeta = doc.get("zeta").unwrap();
        let columns: Vec<&str> = zeta.spec.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(columns, vec!["b", "a"]);
        let row: Vec<&str> = zeta.rows[0].iter().map(|(c, _)| c).collect();
        assert_eq!(row, vec!["b", "a"]);

        let reencoded = decode(&encode(&doc).unwrap()).unwrap();
        assert_eq!(reencoded, doc);
    }

    #[test]
    fn test_rows_key_optional() {
        let doc = decode(r#"{"t": {"columns": {"a": {"datatype": "TEXT"}}}}"#).unwrap();
        assert!(doc.get("t").unwrap().rows.is_empty());
    }

    #[test]
    fn test_unknown_column_key_rejected() {
        let err = decode(r#"{"t": {"columns": {"a": {"datatype": "TEXT", "check": "a > 0"}}}}"#)
            .unwrap_err();
        assert!(matches!(err, SyncError::BackupFormat { .. }));
    }

    #[test]
    fn test_boolean_value_rejected() {
        let err = decode(r#"{"t": {"columns": {"a": {"datatype": "INTEGER"}}, "rows": [{"a": true}]}}"#)
            .unwrap_err();
        assert!(matches!(err, SyncError::UnsupportedValueType { .. }));
    }

    #[test]
    fn test_autoincrement_without_primary_key_rejected() {
        let err = decode(r#"{"t": {"columns": {"a": {"datatype": "INTEGER", "autoincrement": true}}}}"#)
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidSchema { .. }));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            decode("{ not json"),
            Err(SyncError::BackupFormat { .. })
        ));
    }

    #[test]
    fn test_floats_survive_encode_and_decode() {
        let values = [
            989.9951327998887,
            0.1,
            1.0 / 3.0,
            123456.78901234567,
            2.2250738585072014e-308,
            -7.450580596923828e-9,
        ];
        let mut doc = BackupDocument::new();
        doc.insert(TableData::with_rows(
            TableSpec::new("m", vec![ColumnSpec::new("v", "REAL")]),
            values
                .iter()
                .map(|v| Row::new().with("v", Value::Float(*v)))
                .collect(),
        ));

        for text in [encode(&doc).unwrap(), encode_compact(&doc).unwrap()] {
            let decoded = decode(&text).unwrap();
            let read: Vec<&Value> = decoded
                .get("m")
                .unwrap()
                .rows
                .iter()
                .map(|r| r.get("v").unwrap())
                .collect();
            assert_eq!(read.len(), values.len());
            for (value, expected) in read.into_iter().zip(values) {
                assert_eq!(*value, Value::Float(expected));
            }
        }
    }

    #[test]
    fn test_non_finite_float_cannot_be_encoded() {
        let mut doc = BackupDocument::new();
        doc.insert(TableData::with_rows(
            TableSpec::new("m", vec![ColumnSpec::new("v", "REAL")]),
            vec![Row::new().with("v", Value::Float(f64::INFINITY))],
        ));

        assert!(matches!(
            encode(&doc),
            Err(SyncError::UnsupportedValueType { .. })
        ));
    }

    #[test]
    fn test_compact_ignores_formatting() {
        let doc = sample();
        let compact = encode_compact(&doc).unwrap();
        assert!(!compact.contains('\n'));
        assert_eq!(decode(&compact).unwrap(), doc);
    }
}
