//! Schema model and verification core for the permatrix authorization-matrix compiler.
//!
//! The `permatrix-spec` crate turns a declarative permission schema into a
//! validated (entity × verb) → bool table:
//!
//! 1. [`loader`] parses a TOML or JSON source into a [`Schema`].
//! 2. [`matrix`] expands it into a [`PermissionMatrix`], one row per resource and field.
//! 3. [`validate`] checks completeness, shape, and uniqueness and seals the
//!    result as a [`ValidatedMatrix`], the only input the emitters accept.
//!
//! # Entry Point
//!
//! ```
//! use permatrix_spec::SchemaFormat;
//!
//! let source = r#"
//! [[resources]]
//! name = "Prototype1"
//! permissions = { Create = false, Delete = false, List = true, Read = true, Update = true }
//! "#;
//! let schema = permatrix_spec::compile_source(source, SchemaFormat::Toml).unwrap();
//! let validated = permatrix_spec::compile(&schema).unwrap();
//! assert_eq!(validated.requires_permission("Prototype1", "List"), Some(true));
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod error;
pub mod loader;
pub mod matrix;
pub mod model;
pub mod validate;

pub use error::{
    CompileError, IncompleteRowError, LoadError, SchemaSemanticError, SchemaSyntaxError,
    ValidationFailure,
};
pub use loader::{load, SchemaFormat};
pub use matrix::{MatrixRow, PermissionMatrix};
pub use model::{
    Domain, EntityKey, EntityKind, EntityRef, FieldDefinition, PermissionRow, PermissionVerb,
    ResourceDefinition, Schema, STANDARD_VERBS,
};
pub use validate::{
    DecisionRow, ValidatedMatrix, ValidationReport, Violation, ViolationKind,
};

/// Builds and validates the matrix for `schema`.
///
/// # Errors
///
/// Returns [`CompileError::IncompleteRow`] if any row misses a declared verb and
/// [`CompileError::Validation`] with every violation if the matrix is unsound.
pub fn compile(schema: &Schema) -> Result<ValidatedMatrix<'_>, CompileError> {
    let matrix = matrix::build(schema)?;
    Ok(validate::verify(matrix, schema)?)
}

/// Loads `source` and checks that it compiles, returning the loaded schema.
///
/// The schema is returned by value because a [`ValidatedMatrix`] borrows it;
/// call [`compile`] on the returned schema to obtain one.
///
/// # Errors
///
/// Returns the first [`CompileError`] raised by any stage.
pub fn compile_source(source: &str, format: SchemaFormat) -> Result<Schema, CompileError> {
    let schema = load(source, format)?;
    compile(&schema)?;
    Ok(schema)
}
