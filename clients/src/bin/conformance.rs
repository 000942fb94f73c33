//! `permatrix-conformance` — Runs the conformance suite against a permission schema.
//!
//! Checks the compiled matrix (completeness, shape, uniqueness) and the text
//! every target emits from it (naming, determinism, cross-target equivalence).
//!
//! **Usage:**
//! ```
//! permatrix-conformance --schema <path> [--format toml|json] [--go-package <name>]
//! ```
//!
//! Exits non-zero if any conformance check fails.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;
use permatrix_clients::{init_tracing, read_schema};
use permatrix_codegen::CodegenOptions;
use permatrix_conformance::{run_all, Severity};
use permatrix_spec::SchemaFormat;

/// Run the permatrix conformance suite.
#[derive(Parser)]
#[command(
    name = "permatrix-conformance",
    about = "Validate a permission schema and its generated tables"
)]
struct Args {
    /// Path to the permission schema.
    #[arg(long)]
    schema: PathBuf,

    /// Schema format (default: from the file extension, else toml).
    #[arg(long)]
    format: Option<SchemaFormat>,

    /// Package name for the Go target.
    #[arg(long, default_value = "permissions")]
    go_package: String,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let schema = read_schema(&args.schema, args.format)?;
    let options = CodegenOptions {
        go_package: args.go_package,
        ..CodegenOptions::default()
    };
    let report = run_all(&schema, &options)?;

    println!("permatrix Conformance Report");
    println!("============================");
    println!();

    for result in &report.results {
        println!("{result}");
    }

    let passed = report.count(Severity::Pass);
    let warned = report.count(Severity::Warning);
    let failed = report.count(Severity::Failure);

    println!();
    println!("Summary: {passed} passed, {warned} warnings, {failed} failed");

    if failed > 0 {
        eprintln!("Conformance FAILED: {failed} check(s) did not pass.");
        process::exit(1);
    }

    println!("Conformance PASSED.");
    Ok(())
}
