//! permatrix code generator.
//!
//! Renders a [`ValidatedMatrix`] as source text for each supported [`Target`].
//! Every emitted file declares the verb set, the domain set, every resource
//! and field identifier as a named constant, the decision table as a static
//! nested mapping, and one lookup function over it.
//!
//! Emitters are pure functions of an [`EmitPlan`], so [`generate`] runs them
//! in parallel and the output of each is byte-identical across runs. Before
//! emitting, [`generate`] checks that no target would declare one name for two
//! identifiers (see [`naming`]).
//!
//! # Entry Point
//!
//! ```
//! use permatrix_codegen::{generate, CodegenOptions, Target};
//! use permatrix_spec::{PermissionRow, ResourceDefinition, Schema};
//!
//! let schema = Schema::new(["Read"])
//!     .with_resource(ResourceDefinition::new("Report", PermissionRow::new().with("Read", true)));
//! let validated = permatrix_spec::compile(&schema).unwrap();
//! let targets = [Target::TypeScript, Target::Go];
//! let files = generate(&validated, &targets, &CodegenOptions::default()).unwrap();
//! assert_eq!(files[0].file_name, "permissions.ts");
//! assert!(files[1].contents.contains("func RequiresPermission"));
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod emit;
pub mod go;
pub mod mapping;
pub mod naming;
pub mod plan;
pub mod python;
pub mod rust;
pub mod target;
pub mod typescript;

use std::thread;

use permatrix_spec::ValidatedMatrix;
use tracing::{debug, info};

pub use emit::{is_generated, GENERATED_HEADER};
pub use naming::{check_names, NameCollision, NameCollisionError};
pub use plan::{EmitPlan, NamedConstant};
pub use target::{Target, UnsupportedTargetError};

/// Generation settings shared by all emitters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenOptions {
    /// Package clause of the Go output.
    pub go_package: String,
    /// Emit only the TypeScript enums, without the table and lookup.
    pub typescript_enums_only: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            go_package: "permissions".to_string(),
            typescript_enums_only: false,
        }
    }
}

/// One emitted file, held in memory until the driver persists it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Target it was emitted for.
    pub target: Target,
    /// File name relative to the output directory.
    pub file_name: String,
    /// Full source text.
    pub contents: String,
}

/// Emits one target without checking for name collisions.
///
/// Use [`generate`], or [`check_names`] first, for output that must compile.
#[must_use]
pub fn emit(
    validated: &ValidatedMatrix<'_>,
    target: Target,
    options: &CodegenOptions,
) -> GeneratedFile {
    let plan = EmitPlan::new(validated);
    emit_plan(&plan, target, options)
}

fn emit_plan(plan: &EmitPlan<'_>, target: Target, options: &CodegenOptions) -> GeneratedFile {
    let contents = target.emit(plan, options);
    debug!(%target, bytes = contents.len(), "emitted");
    GeneratedFile {
        target,
        file_name: target.file_name().to_string(),
        contents,
    }
}

/// Emits every requested target, one thread per target, and returns the files
/// in requested order.
///
/// # Errors
///
/// Returns [`NameCollisionError`] before any emission if a target would
/// declare one name for two identifiers.
pub fn generate(
    validated: &ValidatedMatrix<'_>,
    targets: &[Target],
    options: &CodegenOptions,
) -> Result<Vec<GeneratedFile>, NameCollisionError> {
    let plan = EmitPlan::new(validated);
    naming::check_plan(&plan, targets)?;
    let files: Vec<GeneratedFile> = thread::scope(|scope| {
        let handles: Vec<_> = targets
            .iter()
            .map(|&target| {
                let plan = &plan;
                scope.spawn(move || emit_plan(plan, target, options))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
            })
            .collect()
    });
    info!(
        targets = files.len(),
        rows = validated.decision_rows().len(),
        "generation complete"
    );
    Ok(files)
}
