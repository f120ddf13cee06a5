//! Catalog rows to schema assembly.
//!
//! Drivers fetch rows with the dialect's catalog queries and hand them to
//! [`assemble`], which joins columns with index membership and runs every
//! value through the dialect's normalization and reverse type mapping.

use std::collections::BTreeMap;
use std::fmt;

use crate::dialect::{Dialect, ServerVersion};
use crate::error::SchemaError;
use crate::schema::{Column, ColumnIndex, Index, Schema, Table};

/// One row of the column catalog, in query column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogColumn {
    /// Table name.
    pub table_name: String,
    /// Column name.
    pub column_name: String,
    /// Reported default value, raw.
    pub column_default: Option<String>,
    /// `YES` or `NO`.
    pub is_nullable: String,
    /// Bare data type, e.g. `varchar`.
    pub data_type: String,
    /// Character length for string types.
    pub character_maximum_length: Option<u64>,
    /// Numeric precision.
    pub numeric_precision: Option<u64>,
    /// Numeric scale.
    pub numeric_scale: Option<u64>,
    /// Fractional seconds precision.
    pub datetime_precision: Option<u64>,
    /// Full column type, e.g. `int(10) unsigned`.
    pub column_type: String,
    /// Key marker (`PRI`, `UNI`, `MUL`).
    pub column_key: String,
    /// Engine-specific extra information.
    pub extra: String,
    /// Column comment.
    pub column_comment: String,
}

/// One row of the index catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogIndex {
    /// Table name.
    pub table_name: String,
    /// Column name.
    pub column_name: String,
    /// Index name.
    pub index_name: String,
    /// Whether the index is unique.
    pub unique: bool,
    /// Whether this is the primary key.
    pub primary: bool,
}

/// Non-fatal conditions found while assembling a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntrospectWarning {
    /// A column participates in more than one index; only `kept` is
    /// represented in the model.
    MultipleIndexes {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Index kept on the column (or `PRIMARY` for the primary key).
        kept: String,
        /// Index ignored.
        ignored: String,
    },
}

impl fmt::Display for IntrospectWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultipleIndexes {
                table,
                column,
                kept,
                ignored,
            } => write!(
                f,
                "column {table}.{column} is in several indexes; \
                 keeping '{kept}', ignoring '{ignored}'"
            ),
        }
    }
}

/// Result of [`assemble`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Introspection {
    /// The observed schema.
    pub schema: Schema,
    /// Conditions the model cannot represent.
    pub warnings: Vec<IntrospectWarning>,
    /// Every secondary index the catalog reported, by table then name,
    /// including the ones no column carries in `schema`.
    pub indexes: BTreeMap<String, BTreeMap<String, Index>>,
}

impl Introspection {
    /// Re-points columns at the set-aside index `desired` names for them.
    ///
    /// A column in several indexes carries only one in the model. When the
    /// desired column names another index the catalog reported on it, the
    /// column carries that one instead and the warnings follow.
    pub fn prefer_indexes(&mut self, desired: &Schema) {
        for table in self.schema.tables_mut() {
            let (Some(wanted), Some(live)) =
                (desired.get_table(&table.name), self.indexes.get(&table.name))
            else {
                continue;
            };
            for column in &mut table.columns {
                let Some(want) = wanted.get_column(&column.name).and_then(|c| c.index.as_ref())
                else {
                    continue;
                };
                let Some(found) = live.get(&want.name) else {
                    continue;
                };
                let current = column.index.as_ref().map(|i| i.name.clone());
                if current.as_deref() == Some(want.name.as_str())
                    || !found.columns.contains(&column.name)
                {
                    continue;
                }
                column.index = Some(ColumnIndex {
                    name: found.name.clone(),
                    unique: found.unique,
                });
                let kept = current.unwrap_or_else(|| "PRIMARY".to_string());
                self.warnings.retain_mut(|warning| {
                    let IntrospectWarning::MultipleIndexes {
                        table: t,
                        column: c,
                        kept: k,
                        ignored: i,
                    } = warning;
                    if *t != table.name || *c != column.name {
                        return true;
                    }
                    if kept == "PRIMARY" {
                        // The primary key stays; the preferred index is now represented.
                        return *i != found.name;
                    }
                    if *i == found.name {
                        i.clone_from(&kept);
                    }
                    k.clone_from(&found.name);
                    true
                });
            }
        }
    }
}

/// Index membership of one column during the join.
enum Membership<'a> {
    Primary,
    Secondary(&'a CatalogIndex),
}

/// Builds a schema from catalog rows.
///
/// Column rows must be ordered by table, then ordinal position. A column in
/// the primary index is marked `primary_key` and carries no secondary index.
/// A column in several indexes keeps the first by name (the primary key
/// always wins) and each ignored index produces a warning. Ignored indexes
/// remain listed in [`Introspection::indexes`].
///
/// # Errors
///
/// Returns [`SchemaError`] if the rows describe duplicate columns.
pub fn assemble(
    dialect: &dyn Dialect,
    version: &ServerVersion,
    columns: &[CatalogColumn],
    indexes: &[CatalogIndex],
) -> Result<Introspection, SchemaError> {
    let mut by_column: BTreeMap<(&str, &str), Vec<&CatalogIndex>> = BTreeMap::new();
    for index in indexes {
        by_column
            .entry((index.table_name.as_str(), index.column_name.as_str()))
            .or_default()
            .push(index);
    }

    let mut warnings = Vec::new();
    let mut tables: BTreeMap<&str, Table> = BTreeMap::new();
    for row in columns {
        let membership = by_column
            .get_mut(&(row.table_name.as_str(), row.column_name.as_str()))
            .and_then(|found| pick_membership(row, found, &mut warnings));
        let column = build_column(dialect, version, row, membership);
        tables
            .entry(row.table_name.as_str())
            .or_insert_with(|| Table::new(row.table_name.clone()))
            .push_column(column)?;
    }

    let mut live: BTreeMap<String, BTreeMap<String, Index>> = BTreeMap::new();
    for row in indexes.iter().filter(|i| !i.primary) {
        if !tables.contains_key(row.table_name.as_str()) {
            continue;
        }
        let index = live
            .entry(row.table_name.clone())
            .or_default()
            .entry(row.index_name.clone())
            .or_insert_with(|| Index {
                name: row.index_name.clone(),
                unique: row.unique,
                columns: Vec::new(),
            });
        if !index.columns.contains(&row.column_name) {
            index.columns.push(row.column_name.clone());
        }
    }

    let mut schema = Schema::new();
    for table in tables.into_values() {
        schema.add_table(table)?;
    }
    Ok(Introspection {
        schema,
        warnings,
        indexes: live,
    })
}

fn pick_membership<'a>(
    row: &CatalogColumn,
    found: &mut Vec<&'a CatalogIndex>,
    warnings: &mut Vec<IntrospectWarning>,
) -> Option<Membership<'a>> {
    // Primary first, then by index name.
    found.sort_by(|a, b| {
        b.primary
            .cmp(&a.primary)
            .then_with(|| a.index_name.cmp(&b.index_name))
    });
    found.dedup_by(|a, b| a.index_name == b.index_name);
    let (first, rest) = found.split_first()?;
    let kept = if first.primary {
        "PRIMARY".to_string()
    } else {
        first.index_name.clone()
    };
    for ignored in rest {
        warnings.push(IntrospectWarning::MultipleIndexes {
            table: row.table_name.clone(),
            column: row.column_name.clone(),
            kept: kept.clone(),
            ignored: ignored.index_name.clone(),
        });
    }
    Some(if first.primary {
        Membership::Primary
    } else {
        Membership::Secondary(*first)
    })
}

fn build_column(
    dialect: &dyn Dialect,
    version: &ServerVersion,
    row: &CatalogColumn,
    membership: Option<Membership<'_>>,
) -> Column {
    let engine_type = dialect.normalize_column_type(&row.column_type, version);
    let (logical_type, size) = dialect.logical_type_of(&engine_type);
    let comment = row.column_comment.trim();
    let mut column = Column::new(row.column_name.clone(), logical_type);
    column.size = size;
    column.nullable = row.is_nullable.eq_ignore_ascii_case("YES");
    column.default = dialect.normalize_default(row.column_default.as_deref(), version);
    column.auto_increment = dialect.is_auto_increment(&row.extra);
    column.extra = dialect.column_extra(&row.extra);
    column.comment =
        (!comment.is_empty() && dialect.supports_comment()).then(|| comment.to_string());
    match membership {
        Some(Membership::Primary) => column.primary_key = true,
        Some(Membership::Secondary(index)) => {
            column.index = Some(ColumnIndex {
                name: index.index_name.clone(),
                unique: index.unique,
            });
        }
        None => {}
    }
    column.engine_type = Some(engine_type);
    column
}
