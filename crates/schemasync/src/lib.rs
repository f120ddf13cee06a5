//! Declarative schema synchronization driver.
//!
//! This crate connects [`schemasync_core`] to a live database:
//! - **Catalog** - reads the column and index catalogs
//! - **Introspector** - resolves the per-run state and assembles the live schema
//! - **Executor** - renders operations and applies them through a DDL session
//! - **Sync** - the full run: resolve, introspect, reconcile, apply
//! - **Dump** - the live schema as JSON or Rust model definitions
//!
//! Only MySQL has a bundled [`Catalog`] and [`DdlSession`]; other engines
//! plug in by implementing both traits.
//!
//! # Example
//!
//! ```rust,no_run
//! use schemasync::prelude::*;
//! use sqlx::Connection;
//!
//! # async fn run() -> schemasync::Result<()> {
//! let mut conn = connect_mysql("mysql://root@localhost/app").await?;
//! let desired = load_model(std::path::Path::new("model.json"))?;
//! let report = sync_mysql(&mut conn, &MySqlDialect::new(), &desired, SyncOptions::new()).await?;
//! println!("applied {} statement(s)", report.applied);
//! conn.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod dump;
pub mod error;
pub mod executor;
pub mod introspector;
pub mod sync;

use sqlx::mysql::MySqlConnection;
use sqlx::Connection;

pub use error::{Result, SyncError};

/// Opens a MySQL connection, rejecting URLs for other engines.
///
/// # Errors
///
/// Returns [`SyncError::UnsupportedUrl`] for non-`mysql://` URLs and
/// [`SyncError::Database`] if the connection fails.
pub async fn connect_mysql(url: &str) -> Result<MySqlConnection> {
    if !url.starts_with("mysql://") {
        return Err(SyncError::UnsupportedUrl(url.to_string()));
    }
    Ok(MySqlConnection::connect(url).await?)
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::catalog::{Catalog, MySqlCatalog};
    pub use crate::connect_mysql;
    pub use crate::dump::{introspect_schema, DumpFormat};
    pub use crate::error::{Result, SyncError};
    pub use crate::executor::{DdlSession, Executor, MySqlSession, Plan, PlannedStatement};
    pub use crate::introspector::{Introspector, RunState};
    pub use crate::sync::{load_model, sync_mysql, SyncOptions, SyncReport, Synchronizer};
    pub use schemasync_core::prelude::*;
}
