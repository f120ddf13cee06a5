//! Catalog access.
//!
//! The [`Catalog`] trait is the read side of a database connection: it runs
//! the dialect's catalog queries and decodes rows positionally.

use schemasync_core::introspect::{CatalogColumn, CatalogIndex};
use sqlx::mysql::{MySqlConnection, MySqlRow};
use sqlx::Row;

use crate::error::Result;

/// Read access to a database catalog.
#[allow(async_fn_in_trait)]
pub trait Catalog {
    /// Runs a query returning a single, possibly NULL, string.
    async fn query_scalar(&mut self, sql: &str) -> Result<Option<String>>;

    /// Runs the column catalog query, binding the database name and then
    /// each table name.
    async fn column_rows(
        &mut self,
        sql: &str,
        database: &str,
        tables: &[String],
    ) -> Result<Vec<CatalogColumn>>;

    /// Runs the index catalog query, binding the database name.
    async fn index_rows(&mut self, sql: &str, database: &str) -> Result<Vec<CatalogIndex>>;
}

/// Catalog over a MySQL connection.
pub struct MySqlCatalog<'c> {
    conn: &'c mut MySqlConnection,
}

impl<'c> MySqlCatalog<'c> {
    /// Creates a catalog borrowing the connection.
    pub fn new(conn: &'c mut MySqlConnection) -> Self {
        Self { conn }
    }
}

impl Catalog for MySqlCatalog<'_> {
    async fn query_scalar(&mut self, sql: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar::<_, Option<String>>(sql)
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(value)
    }

    async fn column_rows(
        &mut self,
        sql: &str,
        database: &str,
        tables: &[String],
    ) -> Result<Vec<CatalogColumn>> {
        let mut query = sqlx::query(sql).bind(database);
        for table in tables {
            query = query.bind(table.as_str());
        }
        let rows = query.fetch_all(&mut *self.conn).await?;
        rows.iter()
            .map(|row| column_from_row(row).map_err(Into::into))
            .collect()
    }

    async fn index_rows(&mut self, sql: &str, database: &str) -> Result<Vec<CatalogIndex>> {
        let rows = sqlx::query(sql)
            .bind(database)
            .fetch_all(&mut *self.conn)
            .await?;
        rows.iter()
            .map(|row| index_from_row(row).map_err(Into::into))
            .collect()
    }
}

fn column_from_row(row: &MySqlRow) -> std::result::Result<CatalogColumn, sqlx::Error> {
    Ok(CatalogColumn {
        table_name: row.try_get(0)?,
        column_name: row.try_get(1)?,
        column_default: row.try_get(2)?,
        is_nullable: row.try_get(3)?,
        data_type: row.try_get::<Option<String>, _>(4)?.unwrap_or_default(),
        character_maximum_length: row.try_get(5)?,
        numeric_precision: row.try_get(6)?,
        numeric_scale: row.try_get(7)?,
        datetime_precision: row.try_get(8)?,
        column_type: row.try_get(9)?,
        column_key: row.try_get::<Option<String>, _>(10)?.unwrap_or_default(),
        extra: row.try_get::<Option<String>, _>(11)?.unwrap_or_default(),
        column_comment: row.try_get::<Option<String>, _>(12)?.unwrap_or_default(),
    })
}

fn index_from_row(row: &MySqlRow) -> std::result::Result<CatalogIndex, sqlx::Error> {
    Ok(CatalogIndex {
        table_name: row.try_get(0)?,
        column_name: row.try_get(1)?,
        index_name: row.try_get(2)?,
        unique: row.try_get::<i64, _>(3)? != 0,
        primary: row.try_get::<i64, _>(4)? != 0,
    })
}
