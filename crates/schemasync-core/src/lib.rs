//! Declarative schema synchronization for MySQL and Cloud Spanner.
//!
//! `schemasync-core` holds the engine-independent part of schemasync:
//! - **Schema** - the canonical model of tables, columns and indexes, used
//!   both for the desired model and for what introspection observed
//! - **Dialect** - per-engine type mapping, quoting, catalog queries, version
//!   quirks and DDL rendering
//! - **Introspect** - assembly of catalog rows into a schema
//! - **Reconcile** - the diff from desired to actual, as ordered operations
//! - **Codegen** - Rust model definitions for an introspected schema
//!
//! Nothing here touches a database; the `schemasync` crate runs the catalog
//! queries and applies the rendered statements.
//!
//! # Example
//!
//! ```rust
//! use schemasync_core::prelude::*;
//!
//! let desired = Schema::new()
//!     .with_table(
//!         Table::new("users")
//!             .column(Column::new("id", LogicalType::Int32).primary_key().auto_increment())
//!             .column(Column::new("name", LogicalType::String)),
//!     )
//!     .unwrap();
//!
//! let dialect = MySqlDialect::new();
//! let resolved = resolve_schema(&dialect, &desired);
//! let ops = reconcile(&resolved.schema, &Schema::new());
//! assert_eq!(ops.len(), 1);
//!
//! let sql = dialect.generate_sql(&ops[0]).unwrap();
//! assert!(sql.starts_with("CREATE TABLE `users`"));
//! ```

pub mod codegen;
pub mod dialect;
pub mod error;
pub mod introspect;
pub mod operation;
pub mod reconcile;
pub mod schema;

pub use error::{RenderError, SchemaError};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::codegen::generate_model_code;
    pub use crate::dialect::{
        resolve_schema, Capability, CapabilityGap, Dialect, MappedType, MySqlDialect, Resolved,
        ServerVersion, SpannerDialect,
    };
    pub use crate::error::{RenderError, SchemaError};
    pub use crate::introspect::{
        assemble, CatalogColumn, CatalogIndex, IntrospectWarning, Introspection,
    };
    pub use crate::operation::Operation;
    pub use crate::reconcile::{reconcile, reconcile_introspected};
    pub use crate::schema::{Column, ColumnIndex, Index, LogicalType, Schema, Table};
}
