//! Shared plumbing for the permatrix command-line drivers.
//!
//! The binaries in `src/bin/` own argument parsing and reporting; this crate
//! owns the steps both of them need: logging setup, schema acquisition, target
//! selection and safe persistence of generated files. [`pipeline`] holds the
//! whole build sequence so it can be driven without a process.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod output;
pub mod pipeline;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use permatrix_codegen::{Target, UnsupportedTargetError};
use permatrix_spec::{load, Schema, SchemaFormat};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Installs the `tracing` subscriber for a driver binary.
///
/// Events go to stderr at `info` unless `RUST_LOG` says otherwise, so stdout
/// stays free for reports and JSON.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolves requested target names. No names selects every target.
///
/// Repeated names are kept once, in first-mention order.
///
/// # Errors
///
/// Returns [`UnsupportedTargetError`] for the first name no emitter answers to.
pub fn parse_targets(names: &[String]) -> Result<Vec<Target>, UnsupportedTargetError> {
    if names.is_empty() {
        return Ok(Target::ALL.to_vec());
    }
    let mut targets = Vec::with_capacity(names.len());
    for name in names {
        let target: Target = name.parse()?;
        if !targets.contains(&target) {
            targets.push(target);
        }
    }
    Ok(targets)
}

/// Reads and loads the schema at `path`.
///
/// The format is `format` if given, else inferred from the extension, else TOML.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not load.
pub fn read_schema(path: &Path, format: Option<SchemaFormat>) -> Result<Schema> {
    let format = format
        .or_else(|| SchemaFormat::from_path(path))
        .unwrap_or_default();
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema {}", path.display()))?;
    debug!(path = %path.display(), %format, bytes = source.len(), "read schema");
    let schema = load(&source, format)
        .with_context(|| format!("Failed to load {format} schema {}", path.display()))?;
    Ok(schema)
}
