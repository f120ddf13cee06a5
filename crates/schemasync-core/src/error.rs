//! Error types for the schema model and DDL rendering.

/// Errors raised while building or validating a [`Schema`](crate::schema::Schema).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// Two tables share a name.
    #[error("Duplicate table '{0}'")]
    DuplicateTable(String),

    /// Two columns of one table share a name.
    #[error("Duplicate column '{column}' in table '{table}'")]
    DuplicateColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// Columns of one table name the same index with different uniqueness.
    #[error("Index '{index}' on table '{table}' is declared both unique and non-unique")]
    ConflictingIndex {
        /// Table name.
        table: String,
        /// Index name.
        index: String,
    },
}

/// Errors raised while rendering an operation into SQL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// The dialect has no syntax for the requested feature.
    #[error("{dialect} does not support {feature} (in {target})")]
    Unsupported {
        /// Dialect name.
        dialect: &'static str,
        /// The missing feature, e.g. "AUTO_INCREMENT".
        feature: &'static str,
        /// The table or `table.column` being rendered.
        target: String,
    },
}
