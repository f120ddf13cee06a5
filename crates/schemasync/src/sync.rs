//! Synchronization runs.
//!
//! A run resolves the desired model against the dialect, introspects the
//! live schema, reconciles the two and applies the rendered plan.

use std::path::Path;

use schemasync_core::dialect::{resolve_schema, CapabilityGap, Dialect};
use schemasync_core::introspect::IntrospectWarning;
use schemasync_core::operation::Operation;
use schemasync_core::reconcile::reconcile_introspected;
use schemasync_core::schema::Schema;
use sqlx::mysql::MySqlConnection;
use tracing::{info, warn};

use crate::catalog::{Catalog, MySqlCatalog};
use crate::error::Result;
use crate::executor::{DdlSession, Executor, MySqlSession, Plan, PlannedStatement};
use crate::introspector::Introspector;

/// Options for a synchronization run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Apply table and column drops instead of reporting them.
    pub allow_destructive: bool,
    /// Print statements instead of applying them.
    pub dry_run: bool,
    /// Restrict the run to these tables; empty means every table.
    pub tables: Vec<String>,
}

impl SyncOptions {
    /// Creates options that apply everything except drops.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows destructive operations.
    #[must_use]
    pub fn allow_destructive(mut self, enabled: bool) -> Self {
        self.allow_destructive = enabled;
        self
    }

    /// Enables dry-run mode.
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Restricts the run to the given tables.
    #[must_use]
    pub fn tables(mut self, tables: Vec<String>) -> Self {
        self.tables = tables;
        self
    }
}

/// Outcome of a synchronization run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Rendered statements in execution order.
    pub statements: Vec<PlannedStatement>,
    /// Number of statements applied; zero for a dry run.
    pub applied: usize,
    /// Destructive operations that were withheld.
    pub skipped: Vec<Operation>,
    /// Model attributes the dialect cannot represent.
    pub gaps: Vec<CapabilityGap>,
    /// Catalog conditions the model cannot represent.
    pub warnings: Vec<IntrospectWarning>,
}

impl SyncReport {
    /// Returns true if the live schema already matched the model.
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.statements.is_empty() && self.skipped.is_empty()
    }

    fn plan(&self) -> Plan {
        Plan {
            statements: self.statements.clone(),
            skipped: self.skipped.clone(),
        }
    }
}

/// Runs reconciliation for one dialect.
pub struct Synchronizer<'d> {
    dialect: &'d dyn Dialect,
    options: SyncOptions,
}

impl<'d> Synchronizer<'d> {
    /// Creates a synchronizer.
    pub fn new(dialect: &'d dyn Dialect, options: SyncOptions) -> Self {
        Self { dialect, options }
    }

    /// Returns the options.
    #[must_use]
    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Introspects and reconciles, returning the plan without applying it.
    ///
    /// # Errors
    ///
    /// Returns an error if introspection fails or an operation cannot be
    /// rendered.
    pub async fn prepare<C: Catalog>(
        &self,
        catalog: &mut C,
        desired: &Schema,
    ) -> Result<SyncReport> {
        let mut desired = desired.clone();
        if !self.options.tables.is_empty() {
            desired.retain_tables(|name| self.options.tables.iter().any(|t| t == name));
        }

        let resolved = resolve_schema(self.dialect, &desired);
        for gap in &resolved.gaps {
            warn!(table = %gap.table, column = %gap.column, "{}", gap);
        }

        let introspector = Introspector::new(self.dialect);
        let state = introspector.run_state(catalog).await?;
        let mut actual = introspector
            .introspect(catalog, &state, &self.options.tables)
            .await?;
        actual.prefer_indexes(&resolved.schema);

        let operations = reconcile_introspected(&resolved.schema, &actual);
        info!(operations = operations.len(), "Reconciled schema");

        let plan = Executor::new(self.dialect)
            .allow_destructive(self.options.allow_destructive)
            .plan(operations)?;

        Ok(SyncReport {
            statements: plan.statements,
            applied: 0,
            skipped: plan.skipped,
            gaps: resolved.gaps,
            warnings: actual.warnings,
        })
    }

    /// Applies a prepared report through the session.
    ///
    /// # Errors
    ///
    /// Returns the executor's error for the first failing statement.
    pub async fn apply<S: DdlSession>(
        &self,
        session: S,
        mut report: SyncReport,
    ) -> Result<SyncReport> {
        let executor =
            Executor::new(self.dialect).allow_destructive(self.options.allow_destructive);
        report.applied = executor.apply(session, &report.plan()).await?;
        Ok(report)
    }
}

/// Runs a full synchronization over a MySQL connection.
///
/// A dry run prints the statements and never opens a DDL session.
///
/// # Errors
///
/// Returns an error if introspection, rendering or execution fails.
pub async fn sync_mysql(
    conn: &mut MySqlConnection,
    dialect: &dyn Dialect,
    desired: &Schema,
    options: SyncOptions,
) -> Result<SyncReport> {
    let synchronizer = Synchronizer::new(dialect, options);
    let report = {
        let mut catalog = MySqlCatalog::new(&mut *conn);
        synchronizer.prepare(&mut catalog, desired).await?
    };

    if synchronizer.options().dry_run {
        report.plan().print();
        return Ok(report);
    }
    if report.statements.is_empty() {
        info!("Schema is up to date");
        return Ok(report);
    }

    let session = MySqlSession::begin(conn).await?;
    synchronizer.apply(session, report).await
}

/// Loads a desired model from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid model.
pub fn load_model(path: &Path) -> Result<Schema> {
    let text = std::fs::read_to_string(path)?;
    let schema: Schema = serde_json::from_str(&text)?;
    info!(path = %path.display(), tables = schema.len(), "Loaded model");
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemasync_core::introspect::{CatalogColumn, CatalogIndex};
    use schemasync_core::prelude::*;

    /// Serves a fixed catalog for MySQL 8.0.
    struct FakeCatalog {
        columns: Vec<CatalogColumn>,
    }

    impl Catalog for FakeCatalog {
        async fn query_scalar(&mut self, sql: &str) -> Result<Option<String>> {
            Ok(Some(if sql.contains("VERSION") { "8.0.36" } else { "app" }.to_string()))
        }

        async fn column_rows(
            &mut self,
            _sql: &str,
            _database: &str,
            tables: &[String],
        ) -> Result<Vec<CatalogColumn>> {
            Ok(self
                .columns
                .iter()
                .filter(|c| tables.is_empty() || tables.contains(&c.table_name))
                .cloned()
                .collect())
        }

        async fn index_rows(&mut self, _sql: &str, _database: &str) -> Result<Vec<CatalogIndex>> {
            Ok(Vec::new())
        }
    }

    fn column(table: &str, name: &str, column_type: &str) -> CatalogColumn {
        CatalogColumn {
            table_name: table.to_string(),
            column_name: name.to_string(),
            is_nullable: "NO".to_string(),
            column_type: column_type.to_string(),
            ..CatalogColumn::default()
        }
    }

    fn catalog() -> FakeCatalog {
        FakeCatalog {
            columns: vec![
                column("audit", "id", "bigint"),
                column("users", "name", "varchar(255)"),
                column("users", "legacy_flag", "tinyint(1)"),
            ],
        }
    }

    fn desired() -> Schema {
        Schema::new()
            .with_table(
                Table::new("users")
                    .column(Column::new("name", LogicalType::String))
                    .column(Column::new("email", LogicalType::String).nullable()),
            )
            .unwrap()
    }

    #[test]
    fn test_options_builder() {
        let options = SyncOptions::new()
            .allow_destructive(true)
            .dry_run(true)
            .tables(vec!["users".to_string()]);
        assert!(options.allow_destructive);
        assert!(options.dry_run);
        assert_eq!(options.tables, vec!["users".to_string()]);
    }

    #[tokio::test]
    async fn test_prepare_withholds_drops() {
        let dialect = MySqlDialect::new();
        let report = Synchronizer::new(&dialect, SyncOptions::new())
            .prepare(&mut catalog(), &desired())
            .await
            .unwrap();
        let sql: Vec<&str> = report.statements.iter().map(|s| s.sql.as_str()).collect();
        assert_eq!(
            sql,
            vec!["ALTER TABLE `users` ADD COLUMN `email` VARCHAR(255) NULL AFTER `name`"]
        );
        assert_eq!(
            report.skipped,
            vec![
                Operation::drop_column("users", "legacy_flag"),
                Operation::drop_table("audit"),
            ]
        );
        assert!(!report.is_up_to_date());
    }

    #[tokio::test]
    async fn test_prepare_respects_table_filter() {
        let dialect = MySqlDialect::new();
        let options = SyncOptions::new()
            .allow_destructive(true)
            .tables(vec!["audit".to_string()]);
        let report = Synchronizer::new(&dialect, options)
            .prepare(&mut catalog(), &desired())
            .await
            .unwrap();
        // users is outside the filter and stays untouched.
        assert_eq!(report.statements.len(), 1);
        assert_eq!(report.statements[0].sql, "DROP TABLE `audit`");
    }
}
