//! Error types for synchronization runs.

use schemasync_core::{RenderError, SchemaError};

/// Errors that can occur while introspecting, planning or applying.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Connectivity or catalog failure, passed through unchanged.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error (reading the model, writing a dump).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The model or the introspected catalog is not a valid schema.
    #[error("Invalid schema: {0}")]
    Schema(#[from] SchemaError),

    /// An operation cannot be expressed in the dialect.
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// The server reported a version string that does not parse.
    #[error("Unrecognized server version '{0}'")]
    Version(String),

    /// The connection has no current database.
    #[error("No database selected; put the database name in the connection URL")]
    NoDatabase,

    /// The connection URL names an engine without a bundled driver.
    #[error("Unsupported database URL '{0}': only mysql:// URLs are supported")]
    UnsupportedUrl(String),

    /// A statement failed and the batch was rolled back.
    #[error("Failed to apply {target} ({statement}); no statement was kept: {source}")]
    RolledBack {
        /// `table` or `table.column` of the failing operation.
        target: String,
        /// The failing statement.
        statement: String,
        /// The underlying failure.
        source: Box<SyncError>,
    },

    /// A statement failed on an engine without transactional DDL.
    #[error(
        "Failed to apply {target} ({statement}) after {applied} statement(s) were applied: {source}"
    )]
    PartiallyApplied {
        /// Statements that succeeded before the failure.
        applied: usize,
        /// `table` or `table.column` of the failing operation.
        target: String,
        /// The failing statement.
        statement: String,
        /// The underlying failure.
        source: Box<SyncError>,
    },
}

/// Result type for synchronization operations.
pub type Result<T> = std::result::Result<T, SyncError>;
