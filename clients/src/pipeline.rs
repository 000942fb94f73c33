//! The `permatrix-build` sequence, from schema path to files on disk.
//!
//! Every step that can refuse the schema runs before the output directory is
//! touched, so a schema with a missing row or a target-name collision leaves
//! `out` exactly as it was.

use std::path::PathBuf;

use anyhow::{Context, Result};
use permatrix_codegen::{generate, CodegenOptions, Target};
use permatrix_spec::loader::check_identifier;
use permatrix_spec::{compile, SchemaFormat};
use tracing::info;

use crate::{output, read_schema};

/// One build invocation.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Path to the permission schema.
    pub schema: PathBuf,
    /// Explicit schema format, if any.
    pub format: Option<SchemaFormat>,
    /// Targets to emit, already resolved.
    pub targets: Vec<Target>,
    /// Output directory.
    pub out: PathBuf,
    /// Emitter options.
    pub options: CodegenOptions,
    /// Replace files that lack the generated header.
    pub force: bool,
    /// Also render the compiled matrix as JSON.
    pub matrix_json: bool,
}

/// What a successful build produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    /// Declared verbs.
    pub verbs: usize,
    /// Declared resources.
    pub resources: usize,
    /// Resources plus fields.
    pub entities: usize,
    /// Files written, in target order.
    pub written: Vec<PathBuf>,
    /// The compiled matrix as pretty JSON, when requested.
    pub matrix_json: Option<String>,
}

/// Loads, compiles and emits the schema, then writes every file.
///
/// # Errors
///
/// Returns an error if the schema cannot be read or compiled, the Go package
/// name is unusable, two identifiers would share a target name, or the output
/// cannot be written. No file is written in any of these cases except the last.
pub fn run_build(request: &BuildRequest) -> Result<BuildSummary> {
    let schema = read_schema(&request.schema, request.format)?;
    let validated = compile(&schema)
        .with_context(|| format!("Failed to compile {}", request.schema.display()))?;
    if request.targets.contains(&Target::Go) {
        check_identifier("go package", &request.options.go_package)?;
    }

    let files = generate(&validated, &request.targets, &request.options)
        .with_context(|| format!("Failed to generate from {}", request.schema.display()))?;
    let written = output::write_all(&request.out, &files, request.force)
        .with_context(|| format!("Failed to write output to {}", request.out.display()))?;
    info!(files = written.len(), out = %request.out.display(), "build complete");

    let matrix_json = if request.matrix_json {
        let json = serde_json::to_string_pretty(validated.matrix())
            .context("Failed to serialize the permission matrix")?;
        Some(json)
    } else {
        None
    };

    Ok(BuildSummary {
        verbs: schema.verbs.len(),
        resources: schema.resources.len(),
        entities: schema.entity_count(),
        written,
        matrix_json,
    })
}
