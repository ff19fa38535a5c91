//! Rendering of the SQL commands issued by [`crate::Session`].
//!
//! Table names, filters and values are inlined verbatim. Filters passed as
//! plain strings are raw SQL; build them with [`crate::Query`] when any part
//! comes from untrusted input.

use crate::schema::ColumnSpec;
use std::fmt::Display;

/// `CREATE TABLE <id> ( <c1>, <c2>, ... );`
pub fn create_table(table: &str, columns: &[ColumnSpec]) -> String {
    let columns = columns
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {table} ( {columns} );")
}

/// `DROP TABLE <id>;`
pub fn drop_table(table: &str) -> String {
    format!("DROP TABLE {table};")
}

/// `SELECT * FROM <id>[ WHERE <filter>];`
pub fn select(table: &str, filter: &str) -> String {
    if filter.trim().is_empty() {
        format!("SELECT * FROM {table};")
    } else {
        format!("SELECT * FROM {table} WHERE {filter};")
    }
}

/// `INSERT INTO <id> (<cols>) VALUES (<vals>);`
pub fn insert<K, V>(table: &str, values: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: Display,
{
    let columns = values
        .iter()
        .map(|(k, _)| k.as_ref())
        .collect::<Vec<_>>()
        .join(", ");
    let literals = values
        .iter()
        .map(|(_, v)| v.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO {table} ({columns}) VALUES ({literals});")
}

/// `DELETE FROM <id>[ WHERE ( <filter> )];`
pub fn delete(table: &str, filter: &str) -> String {
    if filter.trim().is_empty() {
        format!("DELETE FROM {table};")
    } else {
        format!("DELETE FROM {table} WHERE ( {filter} );")
    }
}
