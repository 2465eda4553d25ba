//! Table definitions as SQL
//!
//! Both directions between the model and SQL text:
//!
//! - `ddl`: `CREATE TABLE` text read from the database catalog into a `TableSpec`
//! - `statements`: `TableSpec`s and rows back into `CREATE TABLE` and `INSERT` statements

pub mod ddl;
pub mod statements;

pub use ddl::{normalize_whitespace, parse_create_table};
pub use statements::{
    build_create_statement, build_insert_statement, quote_identifier, render_literal, RestorePlan,
};
