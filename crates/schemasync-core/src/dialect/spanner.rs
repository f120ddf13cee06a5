//! Cloud Spanner dialect.
//!
//! Spanner has no auto-increment, no column defaults and no column comments.
//! The primary key is part of the table definition and cannot be altered.

use super::{quote_doubled, retarget, Dialect, MappedType, ServerVersion};
use crate::error::RenderError;
use crate::operation::{
    AddColumnOp, AddPrimaryKeyOp, CreateTableOp, DropIndexOp, DropPrimaryKeyOp, ModifyColumnOp,
};
use crate::schema::{Column, LogicalType};

/// Cloud Spanner dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpannerDialect;

impl SpannerDialect {
    /// Creates a new Spanner dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    const fn unsupported(feature: &'static str, target: String) -> RenderError {
        RenderError::Unsupported {
            dialect: "spanner",
            feature,
            target,
        }
    }

    fn sized(name: &str, size: Option<u64>) -> String {
        size.map_or_else(|| format!("{name}(MAX)"), |n| format!("{name}({n})"))
    }

    /// Splits `STRING(64)` into `("STRING", Some(64))`; `MAX` has no size.
    fn split_size(engine_type: &str) -> Option<(&str, Option<u64>)> {
        let (name, rest) = engine_type.split_once('(')?;
        let inner = rest.strip_suffix(')')?;
        if inner == "MAX" {
            return Some((name, None));
        }
        inner.parse().ok().map(|n| (name, Some(n)))
    }
}

impl Dialect for SpannerDialect {
    fn name(&self) -> &'static str {
        "spanner"
    }

    fn map_type(
        &self,
        logical: &LogicalType,
        size: Option<u64>,
        _auto_increment: bool,
    ) -> MappedType {
        let sql = match logical {
            LogicalType::Int8
            | LogicalType::Int16
            | LogicalType::Int32
            | LogicalType::Int64
            | LogicalType::UInt8
            | LogicalType::UInt16
            | LogicalType::UInt32
            | LogicalType::UInt64 => "INT64".to_string(),
            LogicalType::Bool => "BOOL".to_string(),
            LogicalType::Float32 | LogicalType::Float64 => "FLOAT64".to_string(),
            LogicalType::String => Self::sized("STRING", size),
            LogicalType::Binary => Self::sized("BYTES", size),
            LogicalType::Timestamp => "TIMESTAMP".to_string(),
            LogicalType::Other(name) => {
                let name = name.trim().to_ascii_uppercase();
                match name.as_str() {
                    "STRING" | "BYTES" => Self::sized(&name, size),
                    _ => name,
                }
            }
        };
        MappedType {
            sql,
            nullable_supported: true,
            auto_increment_supported: false,
        }
    }

    fn logical_type_of(&self, engine_type: &str) -> (LogicalType, Option<u64>) {
        let normalized = engine_type.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "INT64" => return (LogicalType::Int64, None),
            "BOOL" => return (LogicalType::Bool, None),
            "FLOAT64" => return (LogicalType::Float64, None),
            "TIMESTAMP" => return (LogicalType::Timestamp, None),
            _ => {}
        }
        match Self::split_size(&normalized) {
            Some(("STRING", size)) => (LogicalType::String, size),
            Some(("BYTES", size)) => (LogicalType::Binary, size),
            _ => (LogicalType::Other(normalized), None),
        }
    }

    fn quote_identifier(&self, name: &str) -> String {
        quote_doubled(name, '`')
    }

    fn quote_literal(&self, value: &str) -> String {
        quote_doubled(value, '\'')
    }

    fn auto_increment_clause(&self) -> Option<&'static str> {
        None
    }

    /// Schema updates are applied statement by statement.
    fn transactional_ddl(&self) -> bool {
        false
    }

    fn supports_default(&self) -> bool {
        false
    }

    fn supports_comment(&self) -> bool {
        false
    }

    fn current_database_query(&self) -> Option<&'static str> {
        None
    }

    fn version_query(&self) -> Option<&'static str> {
        None
    }

    fn column_catalog_query(&self, table_count: usize) -> String {
        let mut parts: Vec<String> = [
            "SELECT",
            "  c.TABLE_NAME,",
            "  c.COLUMN_NAME,",
            "  CAST(NULL AS STRING),",
            "  c.IS_NULLABLE,",
            "  c.SPANNER_TYPE,",
            "  CAST(NULL AS INT64),",
            "  CAST(NULL AS INT64),",
            "  CAST(NULL AS INT64),",
            "  CAST(NULL AS INT64),",
            "  c.SPANNER_TYPE,",
            "  '',",
            "  IF(o.OPTION_NAME IS NULL, '', CONCAT(o.OPTION_NAME, ' = ', LOWER(o.OPTION_VALUE))),",
            "  ''",
            "FROM information_schema.COLUMNS AS c",
            "LEFT JOIN information_schema.COLUMN_OPTIONS AS o",
            "  ON o.TABLE_SCHEMA = c.TABLE_SCHEMA",
            "  AND o.TABLE_NAME = c.TABLE_NAME",
            "  AND o.COLUMN_NAME = c.COLUMN_NAME",
            "WHERE c.TABLE_SCHEMA = @p1",
        ]
        .into_iter()
        .map(ToString::to_string)
        .collect();
        if table_count > 0 {
            let params: Vec<String> = (2..=table_count + 1).map(|i| format!("@p{i}")).collect();
            parts.push(format!("AND c.TABLE_NAME IN ({})", params.join(",")));
        }
        parts.push("ORDER BY c.TABLE_NAME, c.ORDINAL_POSITION".to_string());
        parts.join("\n")
    }

    fn index_catalog_query(&self) -> String {
        [
            "SELECT",
            "  ic.TABLE_NAME,",
            "  ic.COLUMN_NAME,",
            "  ic.INDEX_NAME,",
            "  i.IS_UNIQUE,",
            "  i.INDEX_TYPE = 'PRIMARY_KEY'",
            "FROM information_schema.INDEX_COLUMNS AS ic",
            "JOIN information_schema.INDEXES AS i",
            "  ON i.TABLE_SCHEMA = ic.TABLE_SCHEMA",
            "  AND i.TABLE_NAME = ic.TABLE_NAME",
            "  AND i.INDEX_NAME = ic.INDEX_NAME",
            "WHERE ic.TABLE_SCHEMA = @p1",
            "AND i.SPANNER_IS_MANAGED = FALSE",
            "ORDER BY ic.TABLE_NAME, ic.INDEX_NAME, ic.ORDINAL_POSITION",
        ]
        .join("\n")
    }

    fn normalize_column_type(&self, raw: &str, _version: &ServerVersion) -> String {
        raw.trim().to_ascii_uppercase()
    }

    fn normalize_default(&self, _raw: Option<&str>, _version: &ServerVersion) -> Option<String> {
        None
    }

    fn column_definition(
        &self,
        column: &Column,
        _inline_primary_key: bool,
    ) -> Result<String, RenderError> {
        if column.auto_increment {
            return Err(Self::unsupported("AUTO_INCREMENT", column.name.clone()));
        }
        if column.default.is_some() {
            return Err(Self::unsupported("DEFAULT", column.name.clone()));
        }
        if column.comment.is_some() {
            return Err(Self::unsupported("COMMENT", column.name.clone()));
        }
        let mut sql = format!(
            "{} {}",
            self.quote_identifier(&column.name),
            self.column_type(column)
        );
        if !column.nullable {
            sql.push_str(" NOT NULL");
        }
        Ok(sql)
    }

    fn create_table(&self, op: &CreateTableOp) -> Result<String, RenderError> {
        let defs = op
            .columns
            .iter()
            .map(|c| {
                self.column_definition(c, false)
                    .map(|d| format!("    {d}"))
                    .map_err(|e| retarget(e, &op.table))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let keys: Vec<String> = op
            .columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| self.quote_identifier(&c.name))
            .collect();
        Ok(format!(
            "CREATE TABLE {} (\n{}\n) PRIMARY KEY ({})",
            self.quote_identifier(&op.table),
            defs.join(",\n"),
            keys.join(", ")
        ))
    }

    fn add_column(&self, op: &AddColumnOp) -> Result<String, RenderError> {
        if op.primary_key {
            return Err(Self::unsupported("changing the primary key", op.table.clone()));
        }
        let definition = self
            .column_definition(&op.column, false)
            .map_err(|e| retarget(e, &op.table))?;
        Ok(format!(
            "ALTER TABLE {} ADD COLUMN {definition}",
            self.quote_identifier(&op.table)
        ))
    }

    fn modify_column(&self, op: &ModifyColumnOp) -> Result<String, RenderError> {
        let definition = self
            .column_definition(&op.column, false)
            .map_err(|e| retarget(e, &op.table))?;
        Ok(format!(
            "ALTER TABLE {} ALTER COLUMN {definition}",
            self.quote_identifier(&op.table)
        ))
    }

    fn drop_index(&self, op: &DropIndexOp) -> String {
        format!("DROP INDEX {}", self.quote_identifier(&op.name))
    }

    fn add_primary_key(&self, op: &AddPrimaryKeyOp) -> Result<String, RenderError> {
        Err(Self::unsupported("changing the primary key", op.table.clone()))
    }

    fn drop_primary_key(&self, op: &DropPrimaryKeyOp) -> Result<String, RenderError> {
        Err(Self::unsupported("changing the primary key", op.table.clone()))
    }
}
