//! Reconciliation operations.
//!
//! One [`Operation`] renders to exactly one DDL statement.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::{Column, Index};

/// All DDL operations the reconciliation engine can emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Create a table with all its columns.
    CreateTable(CreateTableOp),
    /// Drop a table. Destructive.
    DropTable(DropTableOp),
    /// Add a column to an existing table.
    AddColumn(AddColumnOp),
    /// Drop a column. Destructive.
    DropColumn(DropColumnOp),
    /// Redefine an existing column.
    ModifyColumn(ModifyColumnOp),
    /// Create a secondary index.
    AddIndex(AddIndexOp),
    /// Drop a secondary index.
    DropIndex(DropIndexOp),
    /// Add the primary key.
    AddPrimaryKey(AddPrimaryKeyOp),
    /// Drop the primary key.
    DropPrimaryKey(DropPrimaryKeyOp),
}

/// CREATE TABLE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTableOp {
    /// Table name.
    pub table: String,
    /// Columns in declaration order.
    pub columns: Vec<Column>,
}

/// DROP TABLE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropTableOp {
    /// Table name.
    pub table: String,
}

/// ADD COLUMN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddColumnOp {
    /// Table name.
    pub table: String,
    /// Full desired column.
    pub column: Column,
    /// The desired column preceding this one; `None` means first.
    pub after: Option<String>,
    /// Declare the column as the whole primary key in the same statement.
    #[serde(default)]
    pub primary_key: bool,
}

/// DROP COLUMN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropColumnOp {
    /// Table name.
    pub table: String,
    /// Column name.
    pub column: String,
}

/// MODIFY / ALTER COLUMN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyColumnOp {
    /// Table name.
    pub table: String,
    /// Full desired column.
    pub column: Column,
}

/// CREATE INDEX.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddIndexOp {
    /// Table name.
    pub table: String,
    /// Index to create.
    pub index: Index,
}

/// DROP INDEX.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropIndexOp {
    /// Table name.
    pub table: String,
    /// Index name.
    pub name: String,
}

/// ADD PRIMARY KEY.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddPrimaryKeyOp {
    /// Table name.
    pub table: String,
    /// Key columns, in declaration order.
    pub columns: Vec<String>,
}

/// DROP PRIMARY KEY.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropPrimaryKeyOp {
    /// Table name.
    pub table: String,
}

impl Operation {
    /// Creates a create table operation.
    #[must_use]
    pub fn create_table(table: impl Into<String>, columns: Vec<Column>) -> Self {
        Self::CreateTable(CreateTableOp {
            table: table.into(),
            columns,
        })
    }

    /// Creates a drop table operation.
    #[must_use]
    pub fn drop_table(table: impl Into<String>) -> Self {
        Self::DropTable(DropTableOp {
            table: table.into(),
        })
    }

    /// Creates an add column operation.
    #[must_use]
    pub fn add_column(table: impl Into<String>, column: Column, after: Option<String>) -> Self {
        Self::AddColumn(AddColumnOp {
            table: table.into(),
            column,
            after,
            primary_key: false,
        })
    }

    /// Creates an add column operation for a column that becomes the whole
    /// primary key.
    #[must_use]
    pub fn add_key_column(
        table: impl Into<String>,
        column: Column,
        after: Option<String>,
    ) -> Self {
        Self::AddColumn(AddColumnOp {
            table: table.into(),
            column,
            after,
            primary_key: true,
        })
    }

    /// Creates a drop column operation.
    #[must_use]
    pub fn drop_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::DropColumn(DropColumnOp {
            table: table.into(),
            column: column.into(),
        })
    }

    /// Creates a modify column operation.
    #[must_use]
    pub fn modify_column(table: impl Into<String>, column: Column) -> Self {
        Self::ModifyColumn(ModifyColumnOp {
            table: table.into(),
            column,
        })
    }

    /// Creates an add index operation.
    #[must_use]
    pub fn add_index(table: impl Into<String>, index: Index) -> Self {
        Self::AddIndex(AddIndexOp {
            table: table.into(),
            index,
        })
    }

    /// Creates a drop index operation.
    #[must_use]
    pub fn drop_index(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::DropIndex(DropIndexOp {
            table: table.into(),
            name: name.into(),
        })
    }

    /// Creates an add primary key operation.
    #[must_use]
    pub fn add_primary_key(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self::AddPrimaryKey(AddPrimaryKeyOp {
            table: table.into(),
            columns,
        })
    }

    /// Creates a drop primary key operation.
    #[must_use]
    pub fn drop_primary_key(table: impl Into<String>) -> Self {
        Self::DropPrimaryKey(DropPrimaryKeyOp {
            table: table.into(),
        })
    }

    /// The table this operation applies to.
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::CreateTable(op) => &op.table,
            Self::DropTable(op) => &op.table,
            Self::AddColumn(op) => &op.table,
            Self::DropColumn(op) => &op.table,
            Self::ModifyColumn(op) => &op.table,
            Self::AddIndex(op) => &op.table,
            Self::DropIndex(op) => &op.table,
            Self::AddPrimaryKey(op) => &op.table,
            Self::DropPrimaryKey(op) => &op.table,
        }
    }

    /// `table` or `table.column` for column operations; used in reports and
    /// error messages.
    #[must_use]
    pub fn target(&self) -> String {
        match self {
            Self::AddColumn(AddColumnOp { table, column, .. })
            | Self::ModifyColumn(ModifyColumnOp { table, column }) => {
                format!("{table}.{}", column.name)
            }
            Self::DropColumn(op) => format!("{}.{}", op.table, op.column),
            other => other.table().to_string(),
        }
    }

    /// Returns `true` for operations that discard data.
    #[must_use]
    pub const fn is_destructive(&self) -> bool {
        matches!(self, Self::DropTable(_) | Self::DropColumn(_))
    }

    /// Short operation name.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::CreateTable(_) => "create_table",
            Self::DropTable(_) => "drop_table",
            Self::AddColumn(_) => "add_column",
            Self::DropColumn(_) => "drop_column",
            Self::ModifyColumn(_) => "modify_column",
            Self::AddIndex(_) => "add_index",
            Self::DropIndex(_) => "drop_index",
            Self::AddPrimaryKey(_) => "add_primary_key",
            Self::DropPrimaryKey(_) => "drop_primary_key",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddIndex(op) => write!(f, "{} {}.{}", self.kind(), op.table, op.index.name),
            Self::DropIndex(op) => write!(f, "{} {}.{}", self.kind(), op.table, op.name),
            _ => write!(f, "{} {}", self.kind(), self.target()),
        }
    }
}
