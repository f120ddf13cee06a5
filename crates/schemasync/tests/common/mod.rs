//! In-memory stand-ins for a live database.

#![allow(dead_code)]

use schemasync::prelude::*;
use schemasync_core::operation::{
    AddColumnOp, AddPrimaryKeyOp, CreateTableOp, DropIndexOp, DropPrimaryKeyOp, ModifyColumnOp,
};

/// Serves catalog rows for a schema as a MySQL 8.0 server reports them.
#[derive(Debug, Clone, Default)]
pub struct FakeCatalog {
    pub database: Option<String>,
    pub version: String,
    pub columns: Vec<CatalogColumn>,
    pub indexes: Vec<CatalogIndex>,
    pub queries: Vec<String>,
}

impl FakeCatalog {
    /// An empty `app` database.
    pub fn empty() -> Self {
        Self {
            database: Some("app".to_string()),
            version: "8.0.36".to_string(),
            ..Self::default()
        }
    }

    /// A database holding `schema`, after resolving it for MySQL.
    pub fn holding(schema: &Schema) -> Self {
        let resolved = resolve_schema(&MySqlDialect::new(), schema).schema;
        let mut catalog = Self::empty();
        for table in resolved.tables() {
            for column in &table.columns {
                catalog.columns.push(CatalogColumn {
                    table_name: table.name.clone(),
                    column_name: column.name.clone(),
                    column_default: column.default.clone(),
                    is_nullable: if column.nullable { "YES" } else { "NO" }.to_string(),
                    column_type: column
                        .engine_type
                        .clone()
                        .unwrap_or_default()
                        .to_lowercase(),
                    extra: if column.auto_increment {
                        "auto_increment".to_string()
                    } else {
                        String::new()
                    },
                    column_comment: column.comment.clone().unwrap_or_default(),
                    ..CatalogColumn::default()
                });
            }
            for (name, index) in table.indexes() {
                for column in &index.columns {
                    catalog.indexes.push(CatalogIndex {
                        table_name: table.name.clone(),
                        column_name: column.clone(),
                        index_name: name.to_string(),
                        unique: index.unique,
                        primary: false,
                    });
                }
            }
            for column in table.primary_key() {
                catalog.indexes.push(CatalogIndex {
                    table_name: table.name.clone(),
                    column_name: column.to_string(),
                    index_name: "PRIMARY".to_string(),
                    unique: true,
                    primary: true,
                });
            }
        }
        catalog
    }
}

impl Catalog for FakeCatalog {
    async fn query_scalar(&mut self, sql: &str) -> Result<Option<String>> {
        self.queries.push(sql.to_string());
        Ok(if sql.contains("VERSION()") {
            Some(self.version.clone())
        } else {
            self.database.clone()
        })
    }

    async fn column_rows(
        &mut self,
        sql: &str,
        _database: &str,
        tables: &[String],
    ) -> Result<Vec<CatalogColumn>> {
        self.queries.push(sql.to_string());
        Ok(self
            .columns
            .iter()
            .filter(|c| tables.is_empty() || tables.contains(&c.table_name))
            .cloned()
            .collect())
    }

    async fn index_rows(&mut self, sql: &str, _database: &str) -> Result<Vec<CatalogIndex>> {
        self.queries.push(sql.to_string());
        Ok(self.indexes.clone())
    }
}

/// Records statements, failing the one at `fail_at`.
#[derive(Debug, Default)]
pub struct Recorder {
    pub fail_at: Option<usize>,
    pub executed: Vec<String>,
    pub committed: bool,
    pub rolled_back: bool,
}

impl Recorder {
    pub fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::default()
        }
    }
}

impl DdlSession for &mut Recorder {
    async fn exec(&mut self, sql: &str) -> Result<()> {
        if self.fail_at == Some(self.executed.len()) {
            return Err(sqlx::Error::Protocol(format!("cannot execute {sql}")).into());
        }
        self.executed.push(sql.to_string());
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.committed = true;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.rolled_back = true;
        Ok(())
    }
}

/// MySQL rendering on an engine with transactional DDL.
pub struct TransactionalMySql(pub MySqlDialect);

impl Dialect for TransactionalMySql {
    fn name(&self) -> &'static str {
        "transactional-mysql"
    }

    fn map_type(
        &self,
        logical: &LogicalType,
        size: Option<u64>,
        auto_increment: bool,
    ) -> MappedType {
        self.0.map_type(logical, size, auto_increment)
    }

    fn logical_type_of(&self, engine_type: &str) -> (LogicalType, Option<u64>) {
        self.0.logical_type_of(engine_type)
    }

    fn quote_identifier(&self, name: &str) -> String {
        self.0.quote_identifier(name)
    }

    fn quote_literal(&self, value: &str) -> String {
        self.0.quote_literal(value)
    }

    fn auto_increment_clause(&self) -> Option<&'static str> {
        self.0.auto_increment_clause()
    }

    fn transactional_ddl(&self) -> bool {
        true
    }

    fn supports_default(&self) -> bool {
        self.0.supports_default()
    }

    fn supports_comment(&self) -> bool {
        self.0.supports_comment()
    }

    fn current_database_query(&self) -> Option<&'static str> {
        self.0.current_database_query()
    }

    fn version_query(&self) -> Option<&'static str> {
        self.0.version_query()
    }

    fn column_catalog_query(&self, table_count: usize) -> String {
        self.0.column_catalog_query(table_count)
    }

    fn index_catalog_query(&self) -> String {
        self.0.index_catalog_query()
    }

    fn normalize_column_type(&self, raw: &str, version: &ServerVersion) -> String {
        self.0.normalize_column_type(raw, version)
    }

    fn normalize_default(&self, raw: Option<&str>, version: &ServerVersion) -> Option<String> {
        self.0.normalize_default(raw, version)
    }

    fn is_auto_increment(&self, extra: &str) -> bool {
        self.0.is_auto_increment(extra)
    }

    fn column_extra(&self, extra: &str) -> Option<String> {
        self.0.column_extra(extra)
    }

    fn column_definition(
        &self,
        column: &Column,
        inline_primary_key: bool,
    ) -> std::result::Result<String, RenderError> {
        self.0.column_definition(column, inline_primary_key)
    }

    fn create_table(&self, op: &CreateTableOp) -> std::result::Result<String, RenderError> {
        self.0.create_table(op)
    }

    fn add_column(&self, op: &AddColumnOp) -> std::result::Result<String, RenderError> {
        self.0.add_column(op)
    }

    fn modify_column(&self, op: &ModifyColumnOp) -> std::result::Result<String, RenderError> {
        self.0.modify_column(op)
    }

    fn drop_index(&self, op: &DropIndexOp) -> String {
        self.0.drop_index(op)
    }

    fn add_primary_key(&self, op: &AddPrimaryKeyOp) -> std::result::Result<String, RenderError> {
        self.0.add_primary_key(op)
    }

    fn drop_primary_key(&self, op: &DropPrimaryKeyOp) -> std::result::Result<String, RenderError> {
        self.0.drop_primary_key(op)
    }
}

/// `users{id int32 pk auto_increment, name string}`.
pub fn users() -> Table {
    Table::new("users")
        .column(Column::new("id", LogicalType::Int32).primary_key().auto_increment())
        .column(Column::new("name", LogicalType::String))
}

pub fn schema(tables: Vec<Table>) -> Schema {
    Schema::try_from(tables).unwrap()
}
