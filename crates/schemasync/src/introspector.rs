//! Live schema introspection.

use schemasync_core::dialect::{Dialect, ServerVersion};
use schemasync_core::introspect::{assemble, Introspection};
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::error::{Result, SyncError};

/// Facts about the connection, resolved once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    /// Current database name; empty when the dialect has none.
    pub database: String,
    /// Server version.
    pub version: ServerVersion,
}

/// Reads the live schema through a [`Catalog`].
pub struct Introspector<'d> {
    dialect: &'d dyn Dialect,
}

impl<'d> Introspector<'d> {
    /// Creates an introspector for the dialect.
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self { dialect }
    }

    /// Resolves the current database and the server version.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NoDatabase`] if the connection has no current
    /// database and [`SyncError::Version`] if the version string is
    /// malformed.
    pub async fn run_state<C: Catalog>(&self, catalog: &mut C) -> Result<RunState> {
        let database = match self.dialect.current_database_query() {
            Some(sql) => catalog
                .query_scalar(sql)
                .await?
                .filter(|db| !db.is_empty())
                .ok_or(SyncError::NoDatabase)?,
            None => String::new(),
        };

        let version = match self.dialect.version_query() {
            Some(sql) => {
                let raw = catalog.query_scalar(sql).await?.unwrap_or_default();
                self.dialect
                    .parse_version(&raw)
                    .ok_or(SyncError::Version(raw))?
            }
            None => ServerVersion::default(),
        };

        debug!(database = %database, version = %version, "Resolved run state");
        Ok(RunState { database, version })
    }

    /// Reads tables, columns and indexes. An empty `tables` list reads every
    /// table of the database.
    ///
    /// # Errors
    ///
    /// Returns an error if a catalog query fails or the rows do not form a
    /// valid schema.
    pub async fn introspect<C: Catalog>(
        &self,
        catalog: &mut C,
        state: &RunState,
        tables: &[String],
    ) -> Result<Introspection> {
        let column_sql = self.dialect.column_catalog_query(tables.len());
        debug!(sql = %column_sql, "Reading column catalog");
        let columns = catalog
            .column_rows(&column_sql, &state.database, tables)
            .await?;

        let index_sql = self.dialect.index_catalog_query();
        debug!(sql = %index_sql, "Reading index catalog");
        let indexes = catalog.index_rows(&index_sql, &state.database).await?;

        let introspection = assemble(self.dialect, &state.version, &columns, &indexes)?;
        for warning in &introspection.warnings {
            warn!(dialect = self.dialect.name(), "{}", warning);
        }
        info!(
            database = %state.database,
            tables = introspection.schema.len(),
            "Introspected schema"
        );
        Ok(introspection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemasync_core::introspect::{CatalogColumn, CatalogIndex};
    use schemasync_core::prelude::*;

    #[derive(Default)]
    struct FakeCatalog {
        database: Option<String>,
        version: Option<String>,
        columns: Vec<CatalogColumn>,
        indexes: Vec<CatalogIndex>,
        bound_tables: Vec<String>,
    }

    impl Catalog for FakeCatalog {
        async fn query_scalar(&mut self, sql: &str) -> Result<Option<String>> {
            Ok(match sql {
                "SELECT DATABASE()" => self.database.clone(),
                "SELECT VERSION()" => self.version.clone(),
                _ => None,
            })
        }

        async fn column_rows(
            &mut self,
            _sql: &str,
            _database: &str,
            tables: &[String],
        ) -> Result<Vec<CatalogColumn>> {
            self.bound_tables = tables.to_vec();
            Ok(self.columns.clone())
        }

        async fn index_rows(&mut self, _sql: &str, _database: &str) -> Result<Vec<CatalogIndex>> {
            Ok(self.indexes.clone())
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

    #[tokio::test]
    async fn test_run_state() {
        let mut catalog = FakeCatalog {
            database: Some("app".to_string()),
            version: Some("10.4.12-MariaDB".to_string()),
            ..FakeCatalog::default()
        };
        let dialect = MySqlDialect::new();
        let state = Introspector::new(&dialect).run_state(&mut catalog).await.unwrap();
        assert_eq!(state.database, "app");
        assert!(state.version.is_mariadb());
        assert!(state.version.at_least(10, 2, 7));
    }

    #[tokio::test]
    async fn test_run_state_without_database() {
        let mut catalog = FakeCatalog {
            version: Some("8.0.36".to_string()),
            ..FakeCatalog::default()
        };
        let dialect = MySqlDialect::new();
        let err = Introspector::new(&dialect)
            .run_state(&mut catalog)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NoDatabase));
    }

    #[tokio::test]
    async fn test_run_state_malformed_version() {
        let mut catalog = FakeCatalog {
            database: Some("app".to_string()),
            version: Some("eight".to_string()),
            ..FakeCatalog::default()
        };
        let dialect = MySqlDialect::new();
        let err = Introspector::new(&dialect)
            .run_state(&mut catalog)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Version(ref v) if v == "eight"));
    }

    #[tokio::test]
    async fn test_spanner_needs_no_run_state_queries() {
        let mut catalog = FakeCatalog::default();
        let dialect = SpannerDialect::new();
        let state = Introspector::new(&dialect).run_state(&mut catalog).await.unwrap();
        assert_eq!(state, RunState::default());
    }

    #[tokio::test]
    async fn test_introspect() {
        let mut catalog = FakeCatalog {
            columns: vec![
                column("users", "id", "int(11)"),
                column("users", "name", "varchar(255)"),
            ],
            indexes: vec![CatalogIndex {
                table_name: "users".to_string(),
                column_name: "id".to_string(),
                index_name: "PRIMARY".to_string(),
                unique: true,
                primary: true,
            }],
            ..FakeCatalog::default()
        };
        let dialect = MySqlDialect::new();
        let state = RunState {
            database: "app".to_string(),
            version: ServerVersion::new(5, 7, 22),
        };
        let tables = vec!["users".to_string()];
        let result = Introspector::new(&dialect)
            .introspect(&mut catalog, &state, &tables)
            .await
            .unwrap();
        assert_eq!(catalog.bound_tables, tables);

        let id = result.schema.get_column("users", "id").unwrap();
        assert_eq!(id.logical_type, LogicalType::Int32);
        assert!(id.primary_key);
        let name = result.schema.get_column("users", "name").unwrap();
        assert_eq!(name.logical_type, LogicalType::String);
        assert_eq!(name.size, None);
    }
}
