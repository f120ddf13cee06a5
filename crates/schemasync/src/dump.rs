//! Dumping the live schema.

use std::io::Write;
use std::path::Path;

use schemasync_core::codegen::generate_model_code;
use schemasync_core::dialect::Dialect;
use schemasync_core::introspect::Introspection;
use schemasync_core::schema::Schema;
use tracing::info;

use crate::catalog::Catalog;
use crate::error::Result;
use crate::introspector::Introspector;

/// Output format for `dump`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum DumpFormat {
    /// The JSON model format accepted by `sync`.
    #[default]
    Json,
    /// Rust model definitions.
    Rust,
}

/// Introspects the tables (every table when `tables` is empty).
///
/// # Errors
///
/// Returns an error if the catalog cannot be read.
pub async fn introspect_schema<C: Catalog>(
    dialect: &dyn Dialect,
    catalog: &mut C,
    tables: &[String],
) -> Result<Introspection> {
    let introspector = Introspector::new(dialect);
    let state = introspector.run_state(catalog).await?;
    introspector.introspect(catalog, &state, tables).await
}

/// Renders a schema in the requested format.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render(schema: &Schema, format: DumpFormat) -> Result<String> {
    Ok(match format {
        DumpFormat::Json => {
            let mut out = serde_json::to_string_pretty(schema)?;
            out.push('\n');
            out
        }
        DumpFormat::Rust => generate_model_code(schema),
    })
}

/// Writes a rendered dump to `path`, or to stdout without one.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write(text: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, text)?;
            info!(path = %path.display(), "Wrote dump");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}
