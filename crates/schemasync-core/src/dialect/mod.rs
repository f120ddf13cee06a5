//! Dialect capability layer.
//!
//! Every engine quirk lives behind the [`Dialect`] trait: type mapping,
//! quoting, auto-increment syntax, catalog query text, version-dependent
//! normalization of catalog values and DDL rendering. Nothing outside this
//! module branches on the engine or its version.

mod mysql;
mod spanner;

pub use mysql::MySqlDialect;
pub use spanner::SpannerDialect;

use std::fmt;

use crate::error::RenderError;
use crate::operation::{
    AddColumnOp, AddIndexOp, AddPrimaryKeyOp, CreateTableOp, DropColumnOp, DropIndexOp,
    DropPrimaryKeyOp, DropTableOp, ModifyColumnOp, Operation,
};
use crate::schema::{Column, LogicalType, Schema};

/// Result of mapping a logical type onto an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedType {
    /// Rendered engine type, e.g. `VARCHAR(255)` or `INT UNSIGNED`.
    pub sql: String,
    /// Whether the engine accepts NULL for this type.
    pub nullable_supported: bool,
    /// Whether AUTO_INCREMENT (or equivalent) can be applied.
    pub auto_increment_supported: bool,
}

/// Parsed server version, e.g. `10.4.12-MariaDB-log`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerVersion {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
    /// Patch version.
    pub patch: u32,
    /// Everything after the first `-`, if present.
    pub name: Option<String>,
}

impl ServerVersion {
    /// Creates a version without a distribution name.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            name: None,
        }
    }

    /// Parses `MAJOR.MINOR.PATCH[-NAME]`. Returns `None` if the numeric part
    /// is malformed.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (numbers, name) = match raw.split_once('-') {
            Some((numbers, name)) => (numbers, Some(name.to_string())),
            None => (raw, None),
        };
        let mut parts = numbers.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        // Some builds append a suffix directly to the patch number.
        let patch_raw = parts.next()?;
        let digits: String = patch_raw.chars().take_while(char::is_ascii_digit).collect();
        let patch = digits.parse().ok()?;
        Some(Self {
            major,
            minor,
            patch,
            name,
        })
    }

    /// Returns `true` for MariaDB servers.
    #[must_use]
    pub fn is_mariadb(&self) -> bool {
        self.name
            .as_deref()
            .is_some_and(|n| n.to_ascii_lowercase().contains("mariadb"))
    }

    /// Returns `true` if this version is `major.minor.patch` or newer.
    #[must_use]
    pub fn at_least(&self, major: u32, minor: u32, patch: u32) -> bool {
        (self.major, self.minor, self.patch) >= (major, minor, patch)
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(ref name) = self.name {
            write!(f, "-{name}")?;
        }
        Ok(())
    }
}

/// A column attribute an engine cannot express.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    /// Column default values.
    Default,
    /// Column comments.
    Comment,
    /// Auto-incrementing columns.
    AutoIncrement,
    /// NULL values for this column type.
    Nullable,
    /// NULL values in a primary key column.
    NullablePrimaryKey,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Default => "default",
            Self::Comment => "comment",
            Self::AutoIncrement => "auto_increment",
            Self::Nullable => "nullable",
            Self::NullablePrimaryKey => "nullable primary key",
        })
    }
}

/// A desired attribute dropped during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityGap {
    /// Table name.
    pub table: String,
    /// Column name.
    pub column: String,
    /// The unsupported attribute.
    pub capability: Capability,
    /// Dialect name.
    pub dialect: &'static str,
}

impl fmt::Display for CapabilityGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} does not support {} on {}.{}; attribute dropped",
            self.dialect, self.capability, self.table, self.column
        )
    }
}

/// A desired schema after resolution against a dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Schema with engine types filled in and unsupported attributes removed.
    pub schema: Schema,
    /// Attributes that were removed.
    pub gaps: Vec<CapabilityGap>,
}

/// Resolves a desired schema against a dialect.
///
/// Computes `engine_type` for every column and removes attributes the engine
/// cannot express, reporting each removal as a [`CapabilityGap`]. Primary key
/// columns are made NOT NULL the same way.
#[must_use]
pub fn resolve_schema(dialect: &dyn Dialect, desired: &Schema) -> Resolved {
    let mut schema = desired.clone();
    let mut gaps = Vec::new();
    for table in schema.tables_mut() {
        for column in &mut table.columns {
            let mapped = dialect.map_type(&column.logical_type, column.size, column.auto_increment);
            let dropped = [
                (
                    Capability::AutoIncrement,
                    column.auto_increment
                        && !(dialect.supports_auto_increment()
                            && mapped.auto_increment_supported),
                ),
                (
                    Capability::Default,
                    column.default.is_some() && !dialect.supports_default(),
                ),
                (
                    Capability::Comment,
                    column.comment.is_some() && !dialect.supports_comment(),
                ),
                (
                    Capability::Nullable,
                    column.nullable && !mapped.nullable_supported,
                ),
                (
                    Capability::NullablePrimaryKey,
                    column.nullable && column.primary_key,
                ),
            ];
            for (capability, missing) in dropped {
                if !missing {
                    continue;
                }
                match capability {
                    Capability::AutoIncrement => column.auto_increment = false,
                    Capability::Default => column.default = None,
                    Capability::Comment => column.comment = None,
                    Capability::Nullable | Capability::NullablePrimaryKey => {
                        column.nullable = false;
                    }
                }
                gaps.push(CapabilityGap {
                    table: table.name.clone(),
                    column: column.name.clone(),
                    capability,
                    dialect: dialect.name(),
                });
            }
            column.engine_type = Some(mapped.sql);
        }
    }
    Resolved { schema, gaps }
}

/// Engine capabilities, catalog access text and DDL rendering.
///
/// Implementations must be pure: the same input always yields the same
/// output.
pub trait Dialect {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    // ========================================================================
    // Types and quoting
    // ========================================================================

    /// Maps a logical type onto the engine.
    fn map_type(
        &self,
        logical: &LogicalType,
        size: Option<u64>,
        auto_increment: bool,
    ) -> MappedType;

    /// Maps an engine type back to a logical type and size.
    fn logical_type_of(&self, engine_type: &str) -> (LogicalType, Option<u64>);

    /// Quotes an identifier.
    fn quote_identifier(&self, name: &str) -> String;

    /// Quotes a string literal.
    fn quote_literal(&self, value: &str) -> String;

    /// The auto-increment column clause, if the engine has one.
    fn auto_increment_clause(&self) -> Option<&'static str>;

    /// Whether a batch of DDL statements can be rolled back as a unit.
    fn transactional_ddl(&self) -> bool;

    /// Whether columns can carry default values.
    fn supports_default(&self) -> bool;

    /// Whether columns can carry comments.
    fn supports_comment(&self) -> bool;

    /// Whether columns can auto-increment.
    fn supports_auto_increment(&self) -> bool {
        self.auto_increment_clause().is_some()
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    /// Query returning the current database name, if the engine has one.
    fn current_database_query(&self) -> Option<&'static str>;

    /// Query returning the server version string, if the engine has one.
    fn version_query(&self) -> Option<&'static str>;

    /// Column catalog query.
    ///
    /// Binds the database name first, then `table_count` table names. Rows
    /// are ordered by table name, then ordinal position, and carry the
    /// columns of [`CatalogColumn`](crate::introspect::CatalogColumn) in
    /// declaration order.
    fn column_catalog_query(&self, table_count: usize) -> String;

    /// Index catalog query.
    ///
    /// Binds the database name. Rows carry table name, column name, index
    /// name, unique flag and primary flag.
    fn index_catalog_query(&self) -> String;

    /// Parses the server version string.
    fn parse_version(&self, raw: &str) -> Option<ServerVersion> {
        ServerVersion::parse(raw)
    }

    /// Normalizes the reported column type for comparison with a mapped one.
    fn normalize_column_type(&self, raw: &str, _version: &ServerVersion) -> String {
        raw.to_string()
    }

    /// Normalizes a reported default value to its unquoted form.
    fn normalize_default(&self, raw: Option<&str>, _version: &ServerVersion) -> Option<String> {
        raw.map(ToString::to_string)
    }

    /// Whether the catalog's extra column marks auto-increment.
    fn is_auto_increment(&self, _extra: &str) -> bool {
        false
    }

    /// Engine-specific column options worth keeping from the catalog's
    /// extra column.
    fn column_extra(&self, extra: &str) -> Option<String> {
        let extra = extra.trim();
        (!extra.is_empty()).then(|| extra.to_string())
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Renders one column definition.
    ///
    /// With `inline_primary_key` the definition carries its own
    /// `PRIMARY KEY` clause where the engine allows it.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Unsupported`] for attributes the engine cannot
    /// express, such as auto-increment without an auto-increment clause.
    fn column_definition(
        &self,
        column: &Column,
        inline_primary_key: bool,
    ) -> Result<String, RenderError>;

    /// Renders the column's engine type, falling back to the mapping when
    /// the column was not resolved.
    fn column_type(&self, column: &Column) -> String {
        column.engine_type.clone().unwrap_or_else(|| {
            self.map_type(&column.logical_type, column.size, column.auto_increment)
                .sql
        })
    }

    /// Renders one operation.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if the dialect cannot express the operation.
    fn generate_sql(&self, operation: &Operation) -> Result<String, RenderError> {
        match operation {
            Operation::CreateTable(op) => self.create_table(op),
            Operation::DropTable(op) => Ok(self.drop_table(op)),
            Operation::AddColumn(op) => self.add_column(op),
            Operation::DropColumn(op) => Ok(self.drop_column(op)),
            Operation::ModifyColumn(op) => self.modify_column(op),
            Operation::AddIndex(op) => Ok(self.create_index(op)),
            Operation::DropIndex(op) => Ok(self.drop_index(op)),
            Operation::AddPrimaryKey(op) => self.add_primary_key(op),
            Operation::DropPrimaryKey(op) => self.drop_primary_key(op),
        }
    }

    /// Generates SQL for CREATE TABLE.
    ///
    /// # Errors
    ///
    /// Propagates column definition errors.
    fn create_table(&self, op: &CreateTableOp) -> Result<String, RenderError>;

    /// Generates SQL for DROP TABLE.
    fn drop_table(&self, op: &DropTableOp) -> String {
        format!("DROP TABLE {}", self.quote_identifier(&op.table))
    }

    /// Generates SQL for ADD COLUMN.
    ///
    /// # Errors
    ///
    /// Propagates column definition errors.
    fn add_column(&self, op: &AddColumnOp) -> Result<String, RenderError> {
        Ok(format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote_identifier(&op.table),
            self.column_definition(&op.column, op.primary_key)?
        ))
    }

    /// Generates SQL for DROP COLUMN.
    fn drop_column(&self, op: &DropColumnOp) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.quote_identifier(&op.table),
            self.quote_identifier(&op.column)
        )
    }

    /// Generates SQL for a column redefinition.
    ///
    /// # Errors
    ///
    /// Propagates column definition errors.
    fn modify_column(&self, op: &ModifyColumnOp) -> Result<String, RenderError>;

    /// Generates SQL for CREATE INDEX.
    fn create_index(&self, op: &AddIndexOp) -> String {
        let columns: Vec<String> = op
            .index
            .columns
            .iter()
            .map(|c| self.quote_identifier(c))
            .collect();
        format!(
            "CREATE {}INDEX {} ON {} ({})",
            if op.index.unique { "UNIQUE " } else { "" },
            self.quote_identifier(&op.index.name),
            self.quote_identifier(&op.table),
            columns.join(", ")
        )
    }

    /// Generates SQL for DROP INDEX.
    fn drop_index(&self, op: &DropIndexOp) -> String;

    /// Generates SQL for ADD PRIMARY KEY.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Unsupported`] on engines that fix the primary
    /// key at table creation.
    fn add_primary_key(&self, op: &AddPrimaryKeyOp) -> Result<String, RenderError>;

    /// Generates SQL for DROP PRIMARY KEY.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Unsupported`] on engines that fix the primary
    /// key at table creation.
    fn drop_primary_key(&self, op: &DropPrimaryKeyOp) -> Result<String, RenderError>;
}

/// Prefixes a column-level render error target with its table.
pub(crate) fn retarget(err: RenderError, table: &str) -> RenderError {
    let RenderError::Unsupported {
        dialect,
        feature,
        target,
    } = err;
    RenderError::Unsupported {
        dialect,
        feature,
        target: format!("{table}.{target}"),
    }
}

/// Quotes `name` with `quote`, doubling embedded quote characters.
pub(crate) fn quote_doubled(name: &str, quote: char) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push(quote);
    for c in name.chars() {
        if c == quote {
            out.push(quote);
        }
        out.push(c);
    }
    out.push(quote);
    out
}
