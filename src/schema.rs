//! Column DSL used to build `CREATE TABLE` statements.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar type of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Char,
    Varchar,
    Text,
    Int,
    BigInt,
    Decimal,
    Date,
    Time,
    Timestamp,
    Binary,
    VarBinary,
    Blob,
    Boolean,
}

impl ColumnType {
    /// SQL keyword for the type.
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Char => "CHAR",
            Self::Varchar => "VARCHAR",
            Self::Text => "TEXT",
            Self::Int => "INT",
            Self::BigInt => "BIGINT",
            Self::Decimal => "DECIMAL",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::Timestamp => "TIMESTAMP",
            Self::Binary => "BINARY",
            Self::VarBinary => "VARBINARY",
            Self::Blob => "BLOB",
            Self::Boolean => "BOOLEAN",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Per-column attribute appended after the type.
///
/// Rendering is purely textual: nothing checks that a modifier makes sense for
/// the column type, so `Length` on a `BOOLEAN` renders just the same.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnModifier {
    /// `DEFAULT <value>`, the value is inlined verbatim.
    Default(String),
    /// `(<n>)`
    Length(u32),
    Nullable,
    ZeroFill,
    Unsigned,
    /// `COMMENT '<text>'`
    Comment(String),
}

impl ColumnModifier {
    pub fn default_value(&self) -> Option<&str> {
        match self {
            Self::Default(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn length(&self) -> Option<u32> {
        match self {
            Self::Length(n) => Some(*n),
            _ => None,
        }
    }

    pub fn comment(&self) -> Option<&str> {
        match self {
            Self::Comment(text) => Some(text.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default(value) => write!(f, "DEFAULT {value}"),
            Self::Length(n) => write!(f, "({n})"),
            Self::Nullable => f.write_str("NULL"),
            Self::ZeroFill => f.write_str("ZEROFILL"),
            Self::Unsigned => f.write_str("UNSIGNED"),
            Self::Comment(text) => write!(f, "COMMENT '{text}'"),
        }
    }
}

/// One column definition: name, type and ordered modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    id: String,
    column_type: ColumnType,
    #[serde(default)]
    modifiers: Vec<ColumnModifier>,
}

impl ColumnSpec {
    pub fn new(id: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            id: id.into(),
            column_type,
            modifiers: Vec::new(),
        }
    }

    /// Build a column with all of its modifiers at once.
    pub fn with_modifiers(
        id: impl Into<String>,
        column_type: ColumnType,
        modifiers: impl IntoIterator<Item = ColumnModifier>,
    ) -> Self {
        Self {
            id: id.into(),
            column_type,
            modifiers: modifiers.into_iter().collect(),
        }
    }

    /// Append a modifier; modifiers render in the order they were added.
    pub fn with(mut self, modifier: ColumnModifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn modifiers(&self) -> &[ColumnModifier] {
        &self.modifiers
    }
}

impl fmt::Display for ColumnSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.column_type)?;
        for modifier in &self.modifiers {
            write!(f, " {modifier}")?;
        }
        Ok(())
    }
}

/// A table the service creates on start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }
}

/// Schema definition for the SQLite database
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub tables: Vec<TableDefinition>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(mut self, table: TableDefinition) -> Self {
        self.tables.push(table);
        self
    }
}
