//! permatrix conformance suite.
//!
//! Checks a permission schema end to end: the matrix it builds, and the text
//! every emitter renders from it.
//!
//! # Conformance Scope
//!
//! | Validator | Requirement |
//! |-----------|-------------|
//! | `matrix` | one row per entity, the declared verbs per row, unique keys |
//! | `determinism/<target>` | identical bytes across fresh builds and parallel generation |
//! | `equivalence/<target>` | decoded table equals the matrix over every entity × verb pair |
//! | `equivalence/<a>~<b>` | decoded tables of two targets are identical |
//! | `naming/<target>` | declared names are unique within their scope |
//!
//! # Entry Point
//!
//! ```
//! use permatrix_codegen::CodegenOptions;
//! use permatrix_spec::{PermissionRow, ResourceDefinition, Schema};
//!
//! let schema = Schema::new(["Read"])
//!     .with_resource(ResourceDefinition::new("Report", PermissionRow::new().with("Read", true)));
//! let report = permatrix_conformance::run_all(&schema, &CodegenOptions::default()).unwrap();
//! assert!(report.all_passed());
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod decode;
pub mod report;
pub mod validators;

use permatrix_codegen::{CodegenOptions, Target};
use permatrix_spec::{compile, Schema};
use tracing::info;

pub use report::{ConformanceReport, Severity, TestResult};

/// Runs every validator against `schema` for all targets.
///
/// Validators run in this order:
/// 1. Matrix completeness, shape and uniqueness
/// 2. Naming uniqueness per target
/// 3. Determinism per target
/// 4. Cross-target equivalence
///
/// Steps 2 to 4 need a validated matrix; if the schema does not compile they
/// are skipped with a warning and the matrix failures explain why. The
/// TypeScript table is always emitted in full, whatever `options` asks for.
///
/// # Errors
///
/// Returns an error only if a decoder cannot be constructed.
pub fn run_all(schema: &Schema, options: &CodegenOptions) -> anyhow::Result<ConformanceReport> {
    let mut report = ConformanceReport::new();
    let targets = Target::ALL;
    let options = &CodegenOptions {
        typescript_enums_only: false,
        ..options.clone()
    };

    report.extend(validators::matrix::validate(schema));

    let validated = match compile(schema) {
        Ok(validated) => validated,
        Err(err) => {
            report.push(TestResult::warn(
                "emission",
                format!("emission checks skipped: {}", first_line(&err.to_string())),
            ));
            return Ok(report);
        }
    };

    report.extend(validators::naming::validate(&validated, &targets, options));
    report.extend(validators::determinism::validate(schema, &targets, options)?);
    report.extend(validators::equivalence::validate(&validated, &targets, options)?);

    info!(
        results = report.results.len(),
        failures = report.failure_count(),
        "conformance run complete"
    );
    Ok(report)
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or(text)
}
