//! `permatrix-build` — Compiles a permission schema and writes the
//! authorization tables for each requested target language.
//!
//! **Outputs** (per selected target):
//! - `<out>/permissions.ts` — TypeScript
//! - `<out>/permissions.rs` — Rust
//! - `<out>/permissions.go` — Go
//! - `<out>/permissions.py` — Python
//!
//! **Usage:**
//! ```
//! permatrix-build --schema <path> [--format toml|json] [--target <name>]...
//!                 [--out <dir>] [--go-package <name>] [--ts-enums-only]
//!                 [--matrix-json] [--force]
//! ```
//!
//! Nothing is written unless the schema compiles and every target emits. All
//! files are staged before any is replaced; only a rename failing part way
//! through can leave outputs from two runs side by side.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use permatrix_clients::pipeline::{run_build, BuildRequest};
use permatrix_clients::{init_tracing, parse_targets};
use permatrix_codegen::CodegenOptions;
use permatrix_spec::SchemaFormat;

/// Build permission tables from a schema.
#[derive(Parser)]
#[command(
    name = "permatrix-build",
    about = "Compile a permission schema into authorization tables"
)]
struct Args {
    /// Path to the permission schema.
    #[arg(long)]
    schema: PathBuf,

    /// Schema format (default: from the file extension, else toml).
    #[arg(long)]
    format: Option<SchemaFormat>,

    /// Target language; repeat for several (default: all).
    #[arg(long = "target")]
    targets: Vec<String>,

    /// Output directory for generated files.
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// Package name for the Go target.
    #[arg(long, default_value = "permissions")]
    go_package: String,

    /// Emit only the TypeScript verb and name enums, without the table.
    #[arg(long)]
    ts_enums_only: bool,

    /// Print the compiled matrix as JSON on stdout instead of the summary.
    #[arg(long)]
    matrix_json: bool,

    /// Replace existing files even if they were not generated by permatrix.
    #[arg(long)]
    force: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let request = BuildRequest {
        targets: parse_targets(&args.targets)?,
        schema: args.schema,
        format: args.format,
        out: args.out,
        options: CodegenOptions {
            go_package: args.go_package,
            typescript_enums_only: args.ts_enums_only,
        },
        force: args.force,
        matrix_json: args.matrix_json,
    };
    let summary = run_build(&request)?;

    if let Some(json) = &summary.matrix_json {
        println!("{json}");
        return Ok(());
    }

    println!(
        "permatrix: {} verbs, {} resources, {} entities",
        summary.verbs, summary.resources, summary.entities
    );
    for path in &summary.written {
        println!("  Written: {}", path.display());
    }

    Ok(())
}
