//! Error taxonomy for loading, expanding, and validating permission schemas.
//!
//! Every error here is fatal to the compilation run that raised it. Each one
//! names the schema entity, verb, or location involved so a caller can point
//! at the offending definition directly.

use thiserror::Error;

use crate::loader::SchemaFormat;
use crate::model::PermissionVerb;
use crate::validate::ValidationReport;

/// The schema source could not be parsed at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed {format} schema{}: {message}", position(.line, .column))]
pub struct SchemaSyntaxError {
    /// Format the source was parsed as.
    pub format: SchemaFormat,
    /// Parser message.
    pub message: String,
    /// 1-based line of the error, when the parser reports one.
    pub line: Option<usize>,
    /// 1-based column of the error, when the parser reports one.
    pub column: Option<usize>,
}

fn position(line: &Option<usize>, column: &Option<usize>) -> String {
    match (line, column) {
        (Some(line), Some(column)) => format!(" at line {line}, column {column}"),
        _ => String::new(),
    }
}

/// The schema parsed but breaks an identifier or verb rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaSemanticError {
    /// The schema declares an empty verb set.
    #[error("schema declares no permission verbs")]
    NoVerbs,

    /// A verb is declared twice.
    #[error("permission verb `{verb}` is declared more than once")]
    DuplicateVerb {
        /// The repeated verb.
        verb: String,
    },

    /// A domain is declared twice.
    #[error("domain `{domain}` is declared more than once")]
    DuplicateDomain {
        /// The repeated domain.
        domain: String,
    },

    /// An identifier is not usable as a constant name in every target.
    #[error("invalid {kind} identifier `{identifier}`: {reason}")]
    InvalidIdentifier {
        /// What the identifier names (`verb`, `domain`, `resource`, `field`).
        kind: &'static str,
        /// The rejected identifier.
        identifier: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Two resources share an identifier.
    #[error("resource `{resource}` is declared more than once")]
    DuplicateResource {
        /// The repeated resource identifier.
        resource: String,
    },

    /// Two fields of one resource share a local name.
    #[error("field `{resource}.{field}` is declared more than once")]
    DuplicateField {
        /// Owning resource.
        resource: String,
        /// Repeated local name.
        field: String,
    },

    /// A detached field names a resource that is not declared.
    #[error("field `{field}` references unknown resource `{resource}`")]
    UnknownResource {
        /// The unknown resource identifier.
        resource: String,
        /// Local name of the referencing field.
        field: String,
    },

    /// A resource names a domain that is not declared.
    #[error("resource `{resource}` references undeclared domain `{domain}`")]
    UndeclaredDomain {
        /// The resource.
        resource: String,
        /// The undeclared domain.
        domain: String,
    },

    /// A row authors a verb that is not declared.
    #[error("permission row of `{entity}` references undeclared verb `{verb}`")]
    UndeclaredVerb {
        /// Namespaced entity key.
        entity: String,
        /// The undeclared verb.
        verb: String,
    },
}

/// Loader failure: either syntax or semantics. No partial model accompanies it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The source is malformed.
    #[error(transparent)]
    Syntax(#[from] SchemaSyntaxError),
    /// The source violates identifier or verb rules.
    #[error(transparent)]
    Semantic(#[from] SchemaSemanticError),
}

/// A row is absent or misses one or more declared verbs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("permission row of `{entity}` is incomplete: missing {}", join_verbs(.missing))]
pub struct IncompleteRowError {
    /// Namespaced entity key.
    pub entity: String,
    /// Declared verbs with no authored value, in declaration order.
    pub missing: Vec<PermissionVerb>,
}

fn join_verbs(verbs: &[PermissionVerb]) -> String {
    verbs
        .iter()
        .map(|v| format!("`{v}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The validator found one or more defects. Carries every violation found.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("permission matrix failed validation with {} violation(s):\n{report}", .report.len())]
pub struct ValidationFailure {
    /// The accumulated report.
    pub report: ValidationReport,
}

/// Any failure of the load → build → validate pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// The source is malformed.
    #[error(transparent)]
    Syntax(#[from] SchemaSyntaxError),
    /// The source violates identifier or verb rules.
    #[error(transparent)]
    Semantic(#[from] SchemaSemanticError),
    /// A row misses a declared verb.
    #[error(transparent)]
    IncompleteRow(#[from] IncompleteRowError),
    /// The built matrix is unsound.
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
}

impl From<LoadError> for CompileError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Syntax(e) => CompileError::Syntax(e),
            LoadError::Semantic(e) => CompileError::Semantic(e),
        }
    }
}
