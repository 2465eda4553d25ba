//! Parsing of `CREATE TABLE` statements
//!
//! Only the flat shape `CREATE TABLE <name> (<col>, <col>, ...)` is
//! understood. Each column is `<name> <type>` followed by any of
//! `DEFAULT <literal>`, `NOT NULL`, `UNIQUE`, `PRIMARY KEY` and
//! `AUTOINCREMENT`. Column names may be quoted (`"x"`, `` `x` ``, `[x]`);
//! the quotes are not part of the name. Anything needing parentheses
//! (composite keys, foreign keys, CHECK constraints, sized types) is
//! rejected.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{SyncError, SyncResult};
use crate::models::{ColumnSpec, TableSpec, Value};

fn create_table_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)^\s*CREATE\s+TABLE\s+(\w+)\s*\((.*)\)\s*;?\s*$")
            .expect("CREATE TABLE pattern is valid")
    })
}

/// Collapse a multi-line definition onto a single line
pub fn normalize_whitespace(sql: &str) -> String {
    sql.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse one `CREATE TABLE` statement into a table definition
pub fn parse_create_table(sql: &str) -> SyncResult<TableSpec> {
    let fail = |details: &str| SyncError::SchemaParse {
        sql: sql.to_string(),
        details: details.to_string(),
    };

    let caps = create_table_re()
        .captures(sql)
        .ok_or_else(|| fail("expected `CREATE TABLE <name> (<columns>)`"))?;
    let name = caps[1].to_string();

    let mut columns = Vec::new();
    for fragment in split_columns(&caps[2]).map_err(|details| fail(&details))? {
        columns.push(parse_column(&fragment).map_err(|details| fail(&details))?);
    }

    let spec = TableSpec::new(name, columns);
    spec.validate()?;
    Ok(spec)
}

/// Split a column list on commas that are not inside quotes
fn split_columns(body: &str) -> Result<Vec<String>, String> {
    let mut fragments = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in body.chars() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
                current.push(ch);
            }
            None => match ch {
                '\'' | '"' | '`' => {
                    quote = Some(ch);
                    current.push(ch);
                }
                '(' | ')' => {
                    return Err(
                        "nested parentheses are not supported (composite keys, \
                         foreign keys, CHECK constraints and sized types)"
                            .to_string(),
                    )
                }
                ',' => fragments.push(std::mem::take(&mut current)),
                _ => current.push(ch),
            },
        }
    }

    if quote.is_some() {
        return Err("unterminated quoted text".to_string());
    }
    fragments.push(current);

    let fragments: Vec<String> = fragments.into_iter().map(|f| f.trim().to_string()).collect();
    if fragments.iter().any(String::is_empty) {
        return Err("empty column definition".to_string());
    }
    Ok(fragments)
}

/// Split a column fragment on whitespace, keeping quoted text in one token
fn tokenize(fragment: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in fragment.chars() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
                current.push(ch);
            }
            None if ch.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            None => {
                if matches!(ch, '\'' | '"' | '`') {
                    quote = Some(ch);
                }
                current.push(ch);
            }
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn parse_column(fragment: &str) -> Result<ColumnSpec, String> {
    let tokens = tokenize(fragment);
    if tokens.len() < 2 {
        return Err(format!(
            "column definition `{}` needs at least a name and a type",
            fragment
        ));
    }

    let mut column = ColumnSpec::new(unquote_identifier(&tokens[0])?, tokens[1].clone());

    // Keywords are matched on the unquoted remainder with the DEFAULT
    // literal taken out.
    let mut constraints = Vec::new();
    let mut rest = tokens[2..].iter();
    while let Some(token) = rest.next() {
        if token.eq_ignore_ascii_case("DEFAULT") {
            let literal = rest
                .next()
                .ok_or_else(|| format!("DEFAULT without a value in `{}`", fragment))?;
            column.default = parse_default(literal)?;
        } else if !is_quoted(token) {
            constraints.push(token.to_ascii_uppercase());
        }
    }

    let constraints = constraints.join(" ");
    column.not_null = constraints.contains("NOT NULL");
    column.unique = constraints.contains("UNIQUE");
    column.primary_key = constraints.contains("PRIMARY KEY");
    column.autoincrement = constraints.contains("AUTOINCREMENT");

    Ok(column)
}

/// Column name without its identifier quotes
fn unquote_identifier(token: &str) -> Result<String, String> {
    let enclosed = |open: char, close: char| {
        token.len() >= 2 && token.starts_with(open) && token.ends_with(close)
    };
    let inner = || &token[1..token.len() - 1];

    let name = if enclosed('"', '"') {
        inner().replace("\"\"", "\"")
    } else if enclosed('`', '`') {
        inner().replace("``", "`")
    } else if enclosed('\'', '\'') {
        inner().replace("''", "'")
    } else if enclosed('[', ']') {
        inner().to_string()
    } else if token.starts_with(['"', '`', '\'', '[']) {
        return Err(format!("malformed quoted column name `{}`", token));
    } else {
        token.to_string()
    };

    if name.is_empty() {
        return Err("empty column name".to_string());
    }
    Ok(name)
}

fn is_quoted(token: &str) -> bool {
    token.starts_with(['\'', '"', '`'])
}

/// Read a DEFAULT literal; `NULL` means no default
fn parse_default(literal: &str) -> Result<Option<Value>, String> {
    if literal.eq_ignore_ascii_case("NULL") {
        return Ok(None);
    }

    for q in ['\'', '"'] {
        if literal.len() >= 2 && literal.starts_with(q) && literal.ends_with(q) {
            let inner = &literal[1..literal.len() - 1];
            let doubled: String = [q, q].iter().collect();
            return Ok(Some(Value::Text(inner.replace(&doubled, &q.to_string()))));
        }
    }

    if let Ok(i) = literal.parse::<i64>() {
        return Ok(Some(Value::Integer(i)));
    }
    match literal.parse::<f64>() {
        Ok(f) if f.is_finite() => Ok(Some(Value::Float(f))),
        _ => Err(format!("unsupported DEFAULT expression `{}`", literal)),
    }
}
