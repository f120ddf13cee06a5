//! MySQL / MariaDB dialect.

use std::sync::LazyLock;

use regex::Regex;

use super::{quote_doubled, retarget, Dialect, MappedType, ServerVersion};
use crate::error::RenderError;
use crate::operation::{
    AddColumnOp, AddPrimaryKeyOp, CreateTableOp, DropIndexOp, DropPrimaryKeyOp, ModifyColumnOp,
};
use crate::schema::{Column, LogicalType};

static ENGINE_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z]+)(?:\((\d+)\))?( UNSIGNED)?$").expect("valid regex")
});

static DISPLAY_WIDTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(TINYINT|SMALLINT|MEDIUMINT|INT|INTEGER|BIGINT)\(\d+\)")
        .expect("valid regex")
});

static NUMERIC_DEFAULT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("valid regex"));

static TEMPORAL_DEFAULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(CURRENT_TIMESTAMP(\(\d*\))?|NOW\(\d*\))$").expect("valid regex")
});

static NUMERIC_ENGINE_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^\s*(TINYINT|SMALLINT|MEDIUMINT|INT|INTEGER|BIGINT|DECIMAL|NUMERIC",
        r"|FLOAT|DOUBLE|REAL|BIT|BOOL|BOOLEAN|YEAR)\b",
    ))
    .expect("valid regex")
});

static TEMPORAL_ENGINE_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(DATETIME|TIMESTAMP)\b").expect("valid regex"));

const DEFAULT_STRING_SIZE: u64 = 255;

/// MySQL dialect. Also covers MariaDB.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Applies the engine default size to a bare sized type.
    fn default_size(name: &str) -> String {
        match name {
            "BIT" => "BIT(1)".to_string(),
            "DECIMAL" => "DECIMAL(10,0)".to_string(),
            "VARCHAR" => format!("VARCHAR({DEFAULT_STRING_SIZE})"),
            "VARBINARY" => format!("VARBINARY({DEFAULT_STRING_SIZE})"),
            "CHAR" => "CHAR(1)".to_string(),
            "BINARY" => "BINARY(1)".to_string(),
            "YEAR" => "YEAR(4)".to_string(),
            other => other.to_string(),
        }
    }

    /// Leaves `NULL`, numbers on numeric columns and the current time on
    /// temporal columns unquoted. Everything else is a string literal.
    fn default_clause(&self, column: &Column, value: &str) -> String {
        let trimmed = value.trim();
        let (numeric, temporal) = match column.logical_type {
            LogicalType::Bool | LogicalType::Float32 | LogicalType::Float64 => (true, false),
            LogicalType::Timestamp => (false, true),
            LogicalType::Other(ref name) => (
                NUMERIC_ENGINE_TYPE.is_match(name),
                TEMPORAL_ENGINE_TYPE.is_match(name),
            ),
            ref other => (other.is_integer(), false),
        };
        let raw = trimmed.eq_ignore_ascii_case("NULL")
            || (numeric && NUMERIC_DEFAULT.is_match(trimmed))
            || (temporal && TEMPORAL_DEFAULT.is_match(trimmed));
        if raw {
            trimmed.to_string()
        } else {
            self.quote_literal(value)
        }
    }

    const fn unsupported(feature: &'static str, target: String) -> RenderError {
        RenderError::Unsupported {
            dialect: "mysql",
            feature,
            target,
        }
    }
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn map_type(
        &self,
        logical: &LogicalType,
        size: Option<u64>,
        _auto_increment: bool,
    ) -> MappedType {
        let base = match logical {
            LogicalType::Int8 | LogicalType::UInt8 => "TINYINT",
            LogicalType::Int16 | LogicalType::UInt16 => "SMALLINT",
            LogicalType::Int32 | LogicalType::UInt32 => "INT",
            LogicalType::Int64 | LogicalType::UInt64 => "BIGINT",
            LogicalType::Bool => "TINYINT(1)",
            LogicalType::Float32 => "FLOAT",
            LogicalType::Float64 => "DOUBLE",
            LogicalType::String => "VARCHAR",
            LogicalType::Binary => "VARBINARY",
            LogicalType::Timestamp => "DATETIME",
            LogicalType::Other(name) => name.as_str(),
        };
        let base = base.trim().to_ascii_uppercase();
        let sized = matches!(
            logical,
            LogicalType::String | LogicalType::Binary | LogicalType::Other(_)
        );
        let mut sql = match size {
            Some(size) if sized && !base.contains('(') => format!("{base}({size})"),
            _ => Self::default_size(&base),
        };
        if logical.is_unsigned() {
            sql.push_str(" UNSIGNED");
        }
        MappedType {
            sql,
            nullable_supported: true,
            auto_increment_supported: logical.is_integer(),
        }
    }

    fn logical_type_of(&self, engine_type: &str) -> (LogicalType, Option<u64>) {
        let normalized = engine_type.trim().to_ascii_uppercase();
        let other = || (LogicalType::Other(normalized.clone()), None);
        let Some(caps) = ENGINE_TYPE.captures(&normalized) else {
            return other();
        };
        let size: Option<u64> = caps.get(2).and_then(|m| m.as_str().parse().ok());
        let unsigned = caps.get(3).is_some();
        let integer = |signed, unsigned_ty| {
            if size.is_some() {
                other()
            } else if unsigned {
                (unsigned_ty, None)
            } else {
                (signed, None)
            }
        };
        match &caps[1] {
            "TINYINT" if size == Some(1) && !unsigned => (LogicalType::Bool, None),
            "TINYINT" => integer(LogicalType::Int8, LogicalType::UInt8),
            "SMALLINT" => integer(LogicalType::Int16, LogicalType::UInt16),
            "INT" | "INTEGER" => integer(LogicalType::Int32, LogicalType::UInt32),
            "BIGINT" => integer(LogicalType::Int64, LogicalType::UInt64),
            "FLOAT" if size.is_none() && !unsigned => (LogicalType::Float32, None),
            "DOUBLE" if size.is_none() && !unsigned => (LogicalType::Float64, None),
            "DATETIME" if size.is_none() && !unsigned => (LogicalType::Timestamp, None),
            "VARCHAR" if !unsigned => (
                LogicalType::String,
                size.filter(|s| *s != DEFAULT_STRING_SIZE),
            ),
            "VARBINARY" if !unsigned => (
                LogicalType::Binary,
                size.filter(|s| *s != DEFAULT_STRING_SIZE),
            ),
            _ => other(),
        }
    }

    fn quote_identifier(&self, name: &str) -> String {
        quote_doubled(name, '`')
    }

    fn quote_literal(&self, value: &str) -> String {
        quote_doubled(value, '\'')
    }

    fn auto_increment_clause(&self) -> Option<&'static str> {
        Some("AUTO_INCREMENT")
    }

    /// MySQL commits every DDL statement implicitly.
    fn transactional_ddl(&self) -> bool {
        false
    }

    fn supports_default(&self) -> bool {
        true
    }

    fn supports_comment(&self) -> bool {
        true
    }

    fn current_database_query(&self) -> Option<&'static str> {
        Some("SELECT DATABASE()")
    }

    fn version_query(&self) -> Option<&'static str> {
        Some("SELECT VERSION()")
    }

    fn column_catalog_query(&self, table_count: usize) -> String {
        let mut parts = vec![
            "SELECT",
            "  CAST(TABLE_NAME AS CHAR),",
            "  CAST(COLUMN_NAME AS CHAR),",
            "  CAST(COLUMN_DEFAULT AS CHAR),",
            "  CAST(IS_NULLABLE AS CHAR),",
            "  CAST(DATA_TYPE AS CHAR),",
            "  CAST(CHARACTER_MAXIMUM_LENGTH AS UNSIGNED),",
            "  CAST(NUMERIC_PRECISION AS UNSIGNED),",
            "  CAST(NUMERIC_SCALE AS UNSIGNED),",
            "  CAST(DATETIME_PRECISION AS UNSIGNED),",
            "  CAST(COLUMN_TYPE AS CHAR),",
            "  CAST(COLUMN_KEY AS CHAR),",
            "  CAST(EXTRA AS CHAR),",
            "  CAST(COLUMN_COMMENT AS CHAR)",
            "FROM information_schema.COLUMNS",
            "WHERE TABLE_SCHEMA = ?",
        ]
        .into_iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();
        if table_count > 0 {
            parts.push(format!(
                "AND TABLE_NAME IN ({})",
                vec!["?"; table_count].join(",")
            ));
        }
        parts.push("ORDER BY TABLE_NAME, ORDINAL_POSITION".to_string());
        parts.join("\n")
    }

    fn index_catalog_query(&self) -> String {
        [
            "SELECT",
            "  CAST(TABLE_NAME AS CHAR),",
            "  CAST(COLUMN_NAME AS CHAR),",
            "  CAST(INDEX_NAME AS CHAR),",
            "  CAST(NON_UNIQUE = 0 AS SIGNED),",
            "  CAST(INDEX_NAME = 'PRIMARY' AS SIGNED)",
            "FROM information_schema.STATISTICS",
            "WHERE TABLE_SCHEMA = ?",
            "ORDER BY TABLE_NAME, INDEX_NAME, SEQ_IN_INDEX",
        ]
        .join("\n")
    }

    /// Strips integer display widths (`int(11)` becomes `INT`), keeping
    /// `TINYINT(1)`.
    fn normalize_column_type(&self, raw: &str, _version: &ServerVersion) -> String {
        let upper = raw.trim().to_ascii_uppercase();
        if upper.starts_with("TINYINT(1)") {
            return upper;
        }
        DISPLAY_WIDTH.replace(&upper, "$1").into_owned()
    }

    /// MariaDB 10.2.7 and later report defaults as SQL expressions.
    fn normalize_default(&self, raw: Option<&str>, version: &ServerVersion) -> Option<String> {
        let raw = raw?;
        if !(version.is_mariadb() && version.at_least(10, 2, 7)) {
            return Some(raw.to_string());
        }
        if raw.eq_ignore_ascii_case("NULL") {
            return None;
        }
        if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
            return Some(raw[1..raw.len() - 1].replace("''", "'"));
        }
        if let Some(rest) = raw
            .to_ascii_lowercase()
            .strip_prefix("current_timestamp")
        {
            let precision = rest.trim_start_matches('(').trim_end_matches(')');
            return Some(if precision.is_empty() {
                "CURRENT_TIMESTAMP".to_string()
            } else {
                format!("CURRENT_TIMESTAMP({precision})")
            });
        }
        Some(raw.to_string())
    }

    fn is_auto_increment(&self, extra: &str) -> bool {
        extra
            .split_whitespace()
            .any(|w| w.eq_ignore_ascii_case("auto_increment"))
    }

    fn column_extra(&self, extra: &str) -> Option<String> {
        let kept: Vec<&str> = extra
            .split_whitespace()
            .filter(|w| {
                !w.eq_ignore_ascii_case("auto_increment")
                    && !w.eq_ignore_ascii_case("default_generated")
            })
            .collect();
        (!kept.is_empty()).then(|| kept.join(" "))
    }

    fn column_definition(
        &self,
        column: &Column,
        inline_primary_key: bool,
    ) -> Result<String, RenderError> {
        let mut sql = format!(
            "{} {}",
            self.quote_identifier(&column.name),
            self.column_type(column)
        );
        sql.push_str(if column.nullable { " NULL" } else { " NOT NULL" });
        if let Some(ref default) = column.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&self.default_clause(column, default));
        }
        if column.auto_increment {
            let mapped = self.map_type(&column.logical_type, column.size, true);
            if !mapped.auto_increment_supported {
                return Err(Self::unsupported(
                    "AUTO_INCREMENT on a non-integer column",
                    column.name.clone(),
                ));
            }
            sql.push_str(" AUTO_INCREMENT");
        }
        if inline_primary_key && column.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if let Some(ref comment) = column.comment {
            sql.push_str(" COMMENT ");
            sql.push_str(&self.quote_literal(comment));
        }
        Ok(sql)
    }

    fn create_table(&self, op: &CreateTableOp) -> Result<String, RenderError> {
        let pk_count = op.columns.iter().filter(|c| c.primary_key).count();
        let mut defs = op
            .columns
            .iter()
            .map(|c| {
                self.column_definition(c, pk_count == 1)
                    .map(|d| format!("    {d}"))
                    .map_err(|e| retarget(e, &op.table))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if pk_count > 1 {
            let keys: Vec<String> = op
                .columns
                .iter()
                .filter(|c| c.primary_key)
                .map(|c| self.quote_identifier(&c.name))
                .collect();
            defs.push(format!("    PRIMARY KEY ({})", keys.join(", ")));
        }
        Ok(format!(
            "CREATE TABLE {} (\n{}\n)",
            self.quote_identifier(&op.table),
            defs.join(",\n")
        ))
    }

    fn add_column(&self, op: &AddColumnOp) -> Result<String, RenderError> {
        let definition = self
            .column_definition(&op.column, op.primary_key)
            .map_err(|e| retarget(e, &op.table))?;
        let position = op.after.as_ref().map_or_else(
            || " FIRST".to_string(),
            |prev| format!(" AFTER {}", self.quote_identifier(prev)),
        );
        Ok(format!(
            "ALTER TABLE {} ADD COLUMN {definition}{position}",
            self.quote_identifier(&op.table)
        ))
    }

    fn modify_column(&self, op: &ModifyColumnOp) -> Result<String, RenderError> {
        let definition = self
            .column_definition(&op.column, false)
            .map_err(|e| retarget(e, &op.table))?;
        Ok(format!(
            "ALTER TABLE {} MODIFY COLUMN {definition}",
            self.quote_identifier(&op.table)
        ))
    }

    fn drop_index(&self, op: &DropIndexOp) -> String {
        format!(
            "DROP INDEX {} ON {}",
            self.quote_identifier(&op.name),
            self.quote_identifier(&op.table)
        )
    }

    fn add_primary_key(&self, op: &AddPrimaryKeyOp) -> Result<String, RenderError> {
        let keys: Vec<String> = op.columns.iter().map(|c| self.quote_identifier(c)).collect();
        Ok(format!(
            "ALTER TABLE {} ADD PRIMARY KEY ({})",
            self.quote_identifier(&op.table),
            keys.join(", ")
        ))
    }

    fn drop_primary_key(&self, op: &DropPrimaryKeyOp) -> Result<String, RenderError> {
        Ok(format!(
            "ALTER TABLE {} DROP PRIMARY KEY",
            self.quote_identifier(&op.table)
        ))
    }
}
