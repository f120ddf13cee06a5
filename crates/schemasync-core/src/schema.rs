//! Canonical schema model.
//!
//! These types describe tables, columns and indexes. They are used both for
//! the desired schema (what the model declares) and for the actual schema
//! (what introspection observed in the live database).

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Engine-neutral semantic type of a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogicalType {
    /// Signed 8-bit integer.
    Int8,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 8-bit integer.
    UInt8,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Unsigned 32-bit integer.
    UInt32,
    /// Unsigned 64-bit integer.
    UInt64,
    /// Boolean.
    Bool,
    /// Single precision float.
    Float32,
    /// Double precision float.
    Float64,
    /// Variable-length character string.
    String,
    /// Variable-length byte string.
    Binary,
    /// Date and time.
    Timestamp,
    /// Any type name the model layer does not know; passed through to the
    /// engine unchanged (uppercased).
    Other(String),
}

impl LogicalType {
    /// Parses a logical type name.
    ///
    /// Accepts canonical tags (`integer-32`, `unsigned-integer-64`, `string`,
    /// ...), short names (`int32`, `uint8`, `float64`) and Rust type names
    /// (`i32`, `u64`, `String`, `Vec<u8>`, `DateTime<Utc>`). Anything else
    /// becomes [`LogicalType::Other`].
    #[must_use]
    pub fn parse(name: &str) -> Self {
        let key: String = name
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "int8" | "i8" | "integer-8" => Self::Int8,
            "int16" | "i16" | "integer-16" => Self::Int16,
            "int32" | "i32" | "int" | "integer-32" => Self::Int32,
            "int64" | "i64" | "isize" | "integer-64" => Self::Int64,
            "uint8" | "u8" | "unsigned-integer-8" => Self::UInt8,
            "uint16" | "u16" | "unsigned-integer-16" => Self::UInt16,
            "uint32" | "u32" | "uint" | "unsigned-integer-32" => Self::UInt32,
            "uint64" | "u64" | "usize" | "unsigned-integer-64" => Self::UInt64,
            "bool" | "boolean" => Self::Bool,
            "float32" | "f32" => Self::Float32,
            "float64" | "f64" | "double" => Self::Float64,
            "string" | "str" | "&str" => Self::String,
            "binary" | "bytes" | "vec<u8>" | "[u8]" => Self::Binary,
            "timestamp"
            | "datetime"
            | "datetime<utc>"
            | "chrono::datetime<chrono::utc>"
            | "naivedatetime"
            | "chrono::naivedatetime"
            | "systemtime" => Self::Timestamp,
            _ => Self::Other(name.trim().to_string()),
        }
    }

    /// Returns the canonical tag for this type.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::Int8 => "integer-8",
            Self::Int16 => "integer-16",
            Self::Int32 => "integer-32",
            Self::Int64 => "integer-64",
            Self::UInt8 => "unsigned-integer-8",
            Self::UInt16 => "unsigned-integer-16",
            Self::UInt32 => "unsigned-integer-32",
            Self::UInt64 => "unsigned-integer-64",
            Self::Bool => "boolean",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::String => "string",
            Self::Binary => "binary",
            Self::Timestamp => "timestamp",
            Self::Other(name) => name,
        }
    }

    /// Returns `true` for signed and unsigned integer types.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::Int8
                | Self::Int16
                | Self::Int32
                | Self::Int64
                | Self::UInt8
                | Self::UInt16
                | Self::UInt32
                | Self::UInt64
        )
    }

    /// Returns `true` for unsigned integer types.
    #[must_use]
    pub const fn is_unsigned(&self) -> bool {
        matches!(
            self,
            Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64
        )
    }
}

impl From<String> for LogicalType {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl From<&str> for LogicalType {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

impl From<LogicalType> for String {
    fn from(ty: LogicalType) -> Self {
        ty.tag().to_string()
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Secondary index membership of a single column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnIndex {
    /// Index name.
    pub name: String,
    /// Whether the index is UNIQUE.
    #[serde(default)]
    pub unique: bool,
}

/// A secondary index, assembled from the columns that name it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Index name.
    pub name: String,
    /// Whether the index is UNIQUE.
    pub unique: bool,
    /// Indexed columns, in table column order.
    pub columns: Vec<String>,
}

impl Index {
    /// Two indexes are equivalent when uniqueness and the set of covered
    /// columns match.
    #[must_use]
    pub fn equivalent(&self, other: &Self) -> bool {
        let ours: BTreeSet<&str> = self.columns.iter().map(String::as_str).collect();
        let theirs: BTreeSet<&str> = other.columns.iter().map(String::as_str).collect();
        self.unique == other.unique && ours == theirs
    }
}

/// A single column, desired or observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Engine-neutral type.
    #[serde(rename = "type")]
    pub logical_type: LogicalType,
    /// Length for sized types (`VARCHAR(n)`, `STRING(n)`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Concrete engine type. Observed for actual columns, filled in by
    /// [`resolve_schema`](crate::dialect::resolve_schema) for desired ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_type: Option<String>,
    /// Whether NULL is allowed.
    #[serde(default)]
    pub nullable: bool,
    /// Default value as the engine reports it (unquoted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Part of the primary key.
    #[serde(default)]
    pub primary_key: bool,
    /// Auto-incrementing.
    #[serde(default)]
    pub auto_increment: bool,
    /// Secondary index membership.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<ColumnIndex>,
    /// Column comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Engine-specific column options; informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
}

impl Column {
    /// Creates a NOT NULL column with no default, index or comment.
    #[must_use]
    pub fn new(name: impl Into<String>, logical_type: impl Into<LogicalType>) -> Self {
        Self {
            name: name.into(),
            logical_type: logical_type.into(),
            size: None,
            engine_type: None,
            nullable: false,
            default: None,
            primary_key: false,
            auto_increment: false,
            index: None,
            comment: None,
            extra: None,
        }
    }

    /// Sets the length.
    #[must_use]
    pub const fn size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Allows NULL.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Marks the column as (part of) the primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Marks the column as auto-incrementing.
    #[must_use]
    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Adds the column to a non-unique index.
    #[must_use]
    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.index = Some(ColumnIndex {
            name: name.into(),
            unique: false,
        });
        self
    }

    /// Adds the column to a unique index.
    #[must_use]
    pub fn unique_index(mut self, name: impl Into<String>) -> Self {
        self.index = Some(ColumnIndex {
            name: name.into(),
            unique: true,
        });
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Sets the concrete engine type.
    #[must_use]
    pub fn engine_type(mut self, engine_type: impl Into<String>) -> Self {
        self.engine_type = Some(engine_type.into());
        self
    }

    /// Sets engine-specific column options.
    #[must_use]
    pub fn extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into());
        self
    }
}

/// A table: an ordered list of uniquely named columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,
    /// Columns in declaration (or ordinal) order.
    pub columns: Vec<Column>,
}

impl Table {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Appends a column. Duplicates are caught by [`Schema::add_table`];
    /// use [`Table::push_column`] for a checked insert.
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Appends a column, rejecting duplicate names.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateColumn`] if a column with the same
    /// name already exists.
    pub fn push_column(&mut self, column: Column) -> Result<(), SchemaError> {
        if self.get_column(&column.name).is_some() {
            return Err(SchemaError::DuplicateColumn {
                table: self.name.clone(),
                column: column.name,
            });
        }
        self.columns.push(column);
        Ok(())
    }

    /// Gets a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Primary key column names, in declaration order.
    #[must_use]
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Secondary indexes keyed by name.
    ///
    /// Columns naming the same index are grouped into one [`Index`]. If they
    /// disagree on uniqueness the index counts as unique; [`Table::validate`]
    /// reports the conflict.
    #[must_use]
    pub fn indexes(&self) -> BTreeMap<&str, Index> {
        let mut indexes: BTreeMap<&str, Index> = BTreeMap::new();
        for column in &self.columns {
            let Some(ref idx) = column.index else {
                continue;
            };
            let entry = indexes.entry(idx.name.as_str()).or_insert_with(|| Index {
                name: idx.name.clone(),
                unique: idx.unique,
                columns: Vec::new(),
            });
            entry.unique |= idx.unique;
            entry.columns.push(column.name.clone());
        }
        indexes
    }

    /// Checks column name uniqueness and index consistency.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchemaError`] found.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut seen = BTreeSet::new();
        let mut uniqueness: BTreeMap<&str, bool> = BTreeMap::new();
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(SchemaError::DuplicateColumn {
                    table: self.name.clone(),
                    column: column.name.clone(),
                });
            }
            if let Some(ref idx) = column.index {
                match uniqueness.entry(idx.name.as_str()) {
                    Entry::Vacant(slot) => {
                        slot.insert(idx.unique);
                    }
                    Entry::Occupied(slot) if *slot.get() != idx.unique => {
                        return Err(SchemaError::ConflictingIndex {
                            table: self.name.clone(),
                            index: idx.name.clone(),
                        });
                    }
                    Entry::Occupied(_) => {}
                }
            }
        }
        Ok(())
    }
}

/// A full schema: tables keyed by name, iterated in lexical order.
///
/// Serialized as a list of tables; deserialization validates every table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Table>", into = "Vec<Table>")]
pub struct Schema {
    tables: BTreeMap<String, Table>,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table, validating it first.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateTable`] if the name is taken, or the
    /// table's own validation error.
    pub fn add_table(&mut self, table: Table) -> Result<(), SchemaError> {
        table.validate()?;
        match self.tables.entry(table.name.clone()) {
            Entry::Occupied(_) => Err(SchemaError::DuplicateTable(table.name)),
            Entry::Vacant(slot) => {
                slot.insert(table);
                Ok(())
            }
        }
    }

    /// Builder variant of [`Schema::add_table`].
    ///
    /// # Errors
    ///
    /// Same as [`Schema::add_table`].
    pub fn with_table(mut self, table: Table) -> Result<Self, SchemaError> {
        self.add_table(table)?;
        Ok(self)
    }

    /// Gets a table by name.
    #[must_use]
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Gets a column by table and column name.
    #[must_use]
    pub fn get_column(&self, table: &str, column: &str) -> Option<&Column> {
        self.get_table(table).and_then(|t| t.get_column(column))
    }

    /// Tables in lexical name order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    /// Mutable access to the tables, in lexical name order.
    pub(crate) fn tables_mut(&mut self) -> impl Iterator<Item = &mut Table> {
        self.tables.values_mut()
    }

    /// Table names in lexical order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Keeps only the tables whose name satisfies `keep`.
    pub fn retain_tables(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.tables.retain(|name, _| keep(name));
    }

    /// Number of tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns `true` if the schema has no tables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl TryFrom<Vec<Table>> for Schema {
    type Error = SchemaError;

    fn try_from(tables: Vec<Table>) -> Result<Self, Self::Error> {
        let mut schema = Self::new();
        for table in tables {
            schema.add_table(table)?;
        }
        Ok(schema)
    }
}

impl From<Schema> for Vec<Table> {
    fn from(schema: Schema) -> Self {
        schema.tables.into_values().collect()
    }
}
