//! Target languages and their selection by name.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::plan::{EmitPlan, NamedConstant};
use crate::{go, python, rust, typescript, CodegenOptions};

/// The driver asked for an emitter that does not exist.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported target `{requested}` (expected one of: ts, rust, go, python)")]
pub struct UnsupportedTargetError {
    /// The name as given.
    pub requested: String,
}

/// A target language with an emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Target {
    /// TypeScript enums, a `Record` table and `requiresPermission`.
    TypeScript,
    /// A Rust module with a `Permission` enum, `MAPPINGS` and `requires_permission`.
    Rust,
    /// A Go package with typed string constants, a map and `RequiresPermission`.
    Go,
    /// A Python module with `str` enums, `MAPPINGS` and `requires_permission`.
    Python,
}

impl Target {
    /// Every target, in a fixed order.
    pub const ALL: [Target; 4] = [Target::TypeScript, Target::Rust, Target::Go, Target::Python];

    /// Canonical short name, as accepted by [`FromStr`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Target::TypeScript => "ts",
            Target::Rust => "rust",
            Target::Go => "go",
            Target::Python => "python",
        }
    }

    /// Name of the emitted file.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Target::TypeScript => "permissions.ts",
            Target::Rust => "permissions.rs",
            Target::Go => "permissions.go",
            Target::Python => "permissions.py",
        }
    }

    /// Line comment marker of the target language.
    #[must_use]
    pub const fn comment(self) -> &'static str {
        match self {
            Target::Python => "#",
            Target::TypeScript | Target::Rust | Target::Go => "//",
        }
    }

    /// Renders `plan` in this target's syntax.
    #[must_use]
    pub fn emit(self, plan: &EmitPlan<'_>, options: &CodegenOptions) -> String {
        match self {
            Target::TypeScript => typescript::emit(plan, options.typescript_enums_only),
            Target::Rust => rust::emit(plan),
            Target::Go => go::emit(plan, &options.go_package),
            Target::Python => python::emit(plan),
        }
    }

    /// Every constant this target declares for `plan`, with its scope.
    #[must_use]
    pub fn constant_names(self, plan: &EmitPlan<'_>) -> Vec<NamedConstant> {
        match self {
            Target::TypeScript => typescript::constant_names(plan),
            Target::Rust => rust::constant_names(plan),
            Target::Go => go::constant_names(plan),
            Target::Python => python::constant_names(plan),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Target {
    type Err = UnsupportedTargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ts" | "typescript" => Ok(Target::TypeScript),
            "rs" | "rust" => Ok(Target::Rust),
            "go" | "golang" => Ok(Target::Go),
            "py" | "python" => Ok(Target::Python),
            _ => Err(UnsupportedTargetError {
                requested: s.to_string(),
            }),
        }
    }
}
