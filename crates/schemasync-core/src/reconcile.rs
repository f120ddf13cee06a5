//! Reconciliation engine.
//!
//! Compares a desired schema with an actual one and produces the ordered
//! operations that turn the actual schema into the desired one. The diff is
//! pure and dialect-agnostic; resolve the desired schema with
//! [`resolve_schema`](crate::dialect::resolve_schema) first so engine types
//! are comparable.

use std::collections::{BTreeMap, BTreeSet};

use crate::introspect::Introspection;
use crate::operation::Operation;
use crate::schema::{Column, Index, Schema, Table};

/// Computes the operations that turn `actual` into `desired`.
///
/// New tables come first (each followed by its indexes), dropped tables
/// last. For tables present on both sides the order is: drop primary key,
/// drop indexes, drop columns, add columns, modify columns, add indexes,
/// add primary key. Column order differences alone produce nothing.
///
/// An auto-increment column losing its key is redefined without
/// `AUTO_INCREMENT` ahead of the primary key drop, and a column added as
/// the whole new primary key declares the key inline.
#[must_use]
pub fn reconcile(desired: &Schema, actual: &Schema) -> Vec<Operation> {
    reconcile_with(desired, actual, &BTreeMap::new())
}

/// Like [`reconcile`], against an introspected schema.
///
/// Indexes the catalog reported but no column carries are treated as
/// present: they are never re-created, and dropped only when `desired`
/// defines the same name differently. Call
/// [`Introspection::prefer_indexes`] first so columns carry the index the
/// model names.
#[must_use]
pub fn reconcile_introspected(desired: &Schema, actual: &Introspection) -> Vec<Operation> {
    reconcile_with(desired, &actual.schema, &actual.indexes)
}

fn reconcile_with(
    desired: &Schema,
    actual: &Schema,
    live: &BTreeMap<String, BTreeMap<String, Index>>,
) -> Vec<Operation> {
    let mut ops = Vec::new();

    // ========================================================================
    // New tables
    // ========================================================================
    for table in desired.tables() {
        if actual.get_table(&table.name).is_none() {
            ops.push(Operation::create_table(&table.name, table.columns.clone()));
            ops.extend(
                table
                    .indexes()
                    .into_values()
                    .map(|index| Operation::add_index(&table.name, index)),
            );
        }
    }

    // ========================================================================
    // Changed tables
    // ========================================================================
    for table in desired.tables() {
        if let Some(current) = actual.get_table(&table.name) {
            ops.extend(diff_table(table, current, live.get(&table.name)));
        }
    }

    // ========================================================================
    // Removed tables
    // ========================================================================
    for table in actual.tables() {
        if desired.get_table(&table.name).is_none() {
            ops.push(Operation::drop_table(&table.name));
        }
    }

    ops
}

fn diff_table(
    desired: &Table,
    actual: &Table,
    live: Option<&BTreeMap<String, Index>>,
) -> Vec<Operation> {
    let name = desired.name.as_str();
    let mut ops = Vec::new();

    let desired_pk = desired.primary_key();
    let actual_pk = actual.primary_key();
    let pk_changed = desired_pk.iter().collect::<BTreeSet<_>>()
        != actual_pk.iter().collect::<BTreeSet<_>>();

    // MySQL requires an auto-increment column to stay keyed.
    let mut redefined: BTreeSet<&str> = BTreeSet::new();
    if pk_changed && !actual_pk.is_empty() {
        for current in actual_pk.iter().filter_map(|c| actual.get_column(c)) {
            if !current.auto_increment {
                continue;
            }
            match desired.get_column(&current.name) {
                Some(wanted) if wanted.auto_increment => {}
                Some(wanted) => {
                    ops.push(Operation::modify_column(name, wanted.clone()));
                    redefined.insert(wanted.name.as_str());
                }
                None => {
                    let mut stripped = current.clone();
                    stripped.auto_increment = false;
                    ops.push(Operation::modify_column(name, stripped));
                }
            }
        }
        ops.push(Operation::drop_primary_key(name));
    }

    let desired_indexes = desired.indexes();
    let mut actual_indexes = actual.indexes();
    let mut set_aside: BTreeMap<&str, &Index> = BTreeMap::new();
    for (index_name, index) in live.into_iter().flatten() {
        let Some(current) = actual_indexes.get_mut(index_name.as_str()) else {
            set_aside.insert(index_name.as_str(), index);
            continue;
        };
        current.clone_from(index);
    }
    for (index_name, index) in &actual_indexes {
        let keep = desired_indexes
            .get(index_name)
            .is_some_and(|wanted| wanted.equivalent(index));
        if !keep {
            ops.push(Operation::drop_index(name, *index_name));
        }
    }
    for (index_name, index) in &set_aside {
        let redefine = desired_indexes
            .get(index_name)
            .is_some_and(|wanted| !wanted.equivalent(index));
        if redefine {
            ops.push(Operation::drop_index(name, *index_name));
        }
    }

    let mut dropped: Vec<&str> = actual
        .column_names()
        .filter(|c| desired.get_column(c).is_none())
        .collect();
    dropped.sort_unstable();
    ops.extend(dropped.into_iter().map(|c| Operation::drop_column(name, c)));

    let inline_key = match desired_pk.as_slice() {
        [only] if pk_changed && actual.get_column(only).is_none() => Some(*only),
        _ => None,
    };
    let mut previous: Option<&str> = None;
    for column in &desired.columns {
        if actual.get_column(&column.name).is_none() {
            let after = previous.map(ToString::to_string);
            ops.push(if inline_key == Some(column.name.as_str()) {
                Operation::add_key_column(name, column.clone(), after)
            } else {
                Operation::add_column(name, column.clone(), after)
            });
        }
        previous = Some(&column.name);
    }

    let mut modified: Vec<&Column> = desired
        .columns
        .iter()
        .filter(|c| !redefined.contains(c.name.as_str()))
        .filter(|c| {
            actual
                .get_column(&c.name)
                .is_some_and(|current| column_differs(c, current))
        })
        .collect();
    modified.sort_unstable_by(|a, b| a.name.cmp(&b.name));
    ops.extend(
        modified
            .into_iter()
            .map(|c| Operation::modify_column(name, c.clone())),
    );

    for (index_name, index) in desired_indexes {
        let present = actual_indexes
            .get(index_name)
            .or_else(|| set_aside.get(index_name).copied())
            .is_some_and(|current| current.equivalent(&index));
        if !present {
            ops.push(Operation::add_index(name, index));
        }
    }

    if pk_changed && !desired_pk.is_empty() && inline_key.is_none() {
        ops.push(Operation::add_primary_key(
            name,
            desired_pk.into_iter().map(ToString::to_string).collect(),
        ));
    }

    ops
}

/// Whether `actual` must be redefined to match `desired`.
///
/// Index membership, primary key and `extra` are not compared here.
#[must_use]
pub fn column_differs(desired: &Column, actual: &Column) -> bool {
    let type_differs = match (&desired.engine_type, &actual.engine_type) {
        (Some(want), Some(have)) => normalize_type(want) != normalize_type(have),
        _ => desired.logical_type != actual.logical_type || desired.size != actual.size,
    };
    type_differs
        || desired.nullable != actual.nullable
        || desired.default != actual.default
        || desired.auto_increment != actual.auto_increment
        || desired.comment != actual.comment
}

/// Uppercases and strips insignificant whitespace so `decimal(10, 0)` and
/// `DECIMAL(10,0)` compare equal.
fn normalize_type(engine_type: &str) -> String {
    let collapsed = engine_type
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase();
    let mut out = String::with_capacity(collapsed.len());
    let mut chars = collapsed.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ' ' {
            let next_is_punct = chars.peek().is_some_and(|n| matches!(n, ',' | '(' | ')'));
            let prev_is_punct = out.ends_with([',', '(', ')']);
            if next_is_punct || prev_is_punct {
                continue;
            }
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Index, LogicalType};

    fn schema(tables: Vec<Table>) -> Schema {
        Schema::try_from(tables).unwrap()
    }

    fn users() -> Table {
        Table::new("users")
            .column(Column::new("id", LogicalType::Int32).primary_key().auto_increment())
            .column(Column::new("name", LogicalType::String))
    }

    #[test]
    fn test_identical_schemas_produce_nothing() {
        assert!(reconcile(&schema(vec![users()]), &schema(vec![users()])).is_empty());
        assert!(reconcile(&Schema::new(), &Schema::new()).is_empty());
    }

    #[test]
    fn test_create_table_with_indexes() {
        let desired = schema(vec![users().column(
            Column::new("email", LogicalType::String).unique_index("uq_email"),
        )]);
        let ops = reconcile(&desired, &Schema::new());
        assert_eq!(ops.len(), 2);
        assert!(matches!(&ops[0], Operation::CreateTable(op) if op.columns.len() == 3));
        assert_eq!(
            ops[1],
            Operation::add_index(
                "users",
                Index {
                    name: "uq_email".to_string(),
                    unique: true,
                    columns: vec!["email".to_string()],
                }
            )
        );
    }

    #[test]
    fn test_drop_table_comes_last() {
        let desired = schema(vec![Table::new("b").column(Column::new("x", LogicalType::Int32))]);
        let actual = schema(vec![
            Table::new("a").column(Column::new("x", LogicalType::Int32)),
            Table::new("b").column(Column::new("y", LogicalType::Int32)),
        ]);
        let ops = reconcile(&desired, &actual);
        assert_eq!(ops.last(), Some(&Operation::drop_table("a")));
    }

    #[test]
    fn test_add_columns_follow_declaration_order() {
        let desired = schema(vec![Table::new("t")
            .column(Column::new("a", LogicalType::Int32))
            .column(Column::new("z", LogicalType::Int32))
            .column(Column::new("b", LogicalType::Int32))]);
        let actual = schema(vec![Table::new("t").column(Column::new("a", LogicalType::Int32))]);
        let ops = reconcile(&desired, &actual);
        assert_eq!(
            ops,
            vec![
                Operation::add_column(
                    "t",
                    Column::new("z", LogicalType::Int32),
                    Some("a".to_string())
                ),
                Operation::add_column(
                    "t",
                    Column::new("b", LogicalType::Int32),
                    Some("z".to_string())
                ),
            ]
        );
    }

    #[test]
    fn test_modify_on_attribute_change() {
        let base = Column::new("status", LogicalType::String);
        let cases = [
            base.clone().nullable(),
            base.clone().default_value("new"),
            base.clone().comment("state"),
            base.clone().size(16),
        ];
        for changed in cases {
            let desired = schema(vec![Table::new("t").column(changed.clone())]);
            let actual = schema(vec![Table::new("t").column(base.clone())]);
            assert_eq!(
                reconcile(&desired, &actual),
                vec![Operation::modify_column("t", changed)]
            );
        }
    }

    #[test]
    fn test_engine_type_comparison_is_case_insensitive() {
        let desired =
            Column::new("n", LogicalType::Other("decimal".into())).engine_type("DECIMAL(10,0)");
        let actual = Column::new("n", LogicalType::Other("DECIMAL(10,0)".into()))
            .engine_type("decimal(10, 0)");
        assert!(!column_differs(&desired, &actual));
        assert!(column_differs(
            &desired,
            &actual.clone().engine_type("DECIMAL(12,2)")
        ));
    }

    #[test]
    fn test_index_change_is_drop_then_add() {
        let desired = schema(vec![Table::new("t")
            .column(Column::new("a", LogicalType::Int32).unique_index("idx_a"))]);
        let actual = schema(vec![Table::new("t")
            .column(Column::new("a", LogicalType::Int32).index("idx_a"))]);
        let ops = reconcile(&desired, &actual);
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0], Operation::drop_index("t", "idx_a"));
        assert!(matches!(&ops[1], Operation::AddIndex(op) if op.index.unique));
    }

    #[test]
    fn test_primary_key_change() {
        let desired = schema(vec![Table::new("t")
            .column(Column::new("a", LogicalType::Int32).primary_key())
            .column(Column::new("b", LogicalType::Int32).primary_key())]);
        let actual = schema(vec![Table::new("t")
            .column(Column::new("a", LogicalType::Int32).primary_key())
            .column(Column::new("b", LogicalType::Int32))]);
        assert_eq!(
            reconcile(&desired, &actual),
            vec![
                Operation::drop_primary_key("t"),
                Operation::add_primary_key("t", vec!["a".to_string(), "b".to_string()]),
            ]
        );
    }

    #[test]
    fn test_added_key_column_declares_key_inline() {
        let desired = schema(vec![Table::new("t")
            .column(Column::new("id", LogicalType::Int64).primary_key().auto_increment())
            .column(Column::new("a", LogicalType::Int32))]);
        let actual = schema(vec![Table::new("t").column(Column::new("a", LogicalType::Int32))]);
        assert_eq!(
            reconcile(&desired, &actual),
            vec![Operation::add_key_column(
                "t",
                Column::new("id", LogicalType::Int64).primary_key().auto_increment(),
                None
            )]
        );
    }

    #[test]
    fn test_auto_increment_is_stripped_before_key_drop() {
        let desired = schema(vec![Table::new("t")
            .column(Column::new("id", LogicalType::Int64))
            .column(Column::new("code", LogicalType::Int64).primary_key())]);
        let actual = schema(vec![Table::new("t")
            .column(Column::new("id", LogicalType::Int64).primary_key().auto_increment())
            .column(Column::new("code", LogicalType::Int64))]);
        assert_eq!(
            reconcile(&desired, &actual),
            vec![
                Operation::modify_column("t", Column::new("id", LogicalType::Int64)),
                Operation::drop_primary_key("t"),
                Operation::add_primary_key("t", vec!["code".to_string()]),
            ]
        );
    }

    #[test]
    fn test_dropped_auto_increment_key_is_stripped_first() {
        let desired = schema(vec![Table::new("t")
            .column(Column::new("code", LogicalType::Int64).primary_key())]);
        let actual = schema(vec![Table::new("t")
            .column(Column::new("id", LogicalType::Int64).primary_key().auto_increment())
            .column(Column::new("code", LogicalType::Int64))]);
        let ops = reconcile(&desired, &actual);
        assert_eq!(
            ops[..3],
            [
                Operation::modify_column("t", Column::new("id", LogicalType::Int64).primary_key()),
                Operation::drop_primary_key("t"),
                Operation::drop_column("t", "id"),
            ]
        );
    }

    #[test]
    fn test_set_aside_indexes_count_as_present() {
        let desired = schema(vec![Table::new("m")
            .column(Column::new("user_id", LogicalType::Int32).primary_key())
            .column(
                Column::new("group_id", LogicalType::Int32)
                    .primary_key()
                    .index("idx_group"),
            )]);
        let actual = Introspection {
            schema: schema(vec![Table::new("m")
                .column(Column::new("user_id", LogicalType::Int32).primary_key())
                .column(Column::new("group_id", LogicalType::Int32).primary_key())]),
            warnings: Vec::new(),
            indexes: BTreeMap::from([(
                "m".to_string(),
                BTreeMap::from([(
                    "idx_group".to_string(),
                    Index {
                        name: "idx_group".to_string(),
                        unique: false,
                        columns: vec!["group_id".to_string()],
                    },
                )]),
            )]),
        };
        assert!(reconcile_introspected(&desired, &actual).is_empty());
        assert_eq!(reconcile(&desired, &actual.schema).len(), 1);
    }

    #[test]
    fn test_set_aside_index_redefined_by_name() {
        let desired = schema(vec![Table::new("t")
            .column(Column::new("a", LogicalType::Int32).index("idx_a"))
            .column(Column::new("b", LogicalType::Int32).index("idx_b"))]);
        let live = BTreeMap::from([
            (
                "idx_a".to_string(),
                Index {
                    name: "idx_a".to_string(),
                    unique: false,
                    columns: vec!["a".to_string()],
                },
            ),
            (
                "idx_b".to_string(),
                Index {
                    name: "idx_b".to_string(),
                    unique: false,
                    columns: vec!["a".to_string()],
                },
            ),
        ]);
        let actual = Introspection {
            schema: schema(vec![Table::new("t")
                .column(Column::new("a", LogicalType::Int32).index("idx_a"))
                .column(Column::new("b", LogicalType::Int32))]),
            warnings: Vec::new(),
            indexes: BTreeMap::from([("t".to_string(), live)]),
        };
        let ops = reconcile_introspected(&desired, &actual);
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0], Operation::drop_index("t", "idx_b"));
        assert!(matches!(&ops[1], Operation::AddIndex(op) if op.index.columns == ["b"]));
    }

    #[test]
    fn test_group_order_within_table() {
        let desired = schema(vec![Table::new("t")
            .column(Column::new("id", LogicalType::Int64).primary_key())
            .column(Column::new("kept", LogicalType::Int64).nullable())
            .column(Column::new("added", LogicalType::String).index("idx_added"))]);
        let actual = schema(vec![Table::new("t")
            .column(Column::new("id", LogicalType::Int32).primary_key())
            .column(Column::new("kept", LogicalType::Int64).index("idx_kept"))
            .column(Column::new("gone", LogicalType::Int32))]);
        let kinds: Vec<&str> = reconcile(&desired, &actual)
            .iter()
            .map(Operation::kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                "drop_index",
                "drop_column",
                "add_column",
                "modify_column",
                "modify_column",
                "add_index",
            ]
        );
    }

    #[test]
    fn test_normalize_type() {
        assert_eq!(normalize_type("int  unsigned"), "INT UNSIGNED");
        assert_eq!(normalize_type("decimal( 10 , 0 )"), "DECIMAL(10,0)");
    }
}
