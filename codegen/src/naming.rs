//! Target-name collision detection.
//!
//! Case conversion can map two distinct schema identifiers onto one target
//! name: `id` and `Id` both become the Rust constant `ID`, and `sockOpt` and
//! `sock_opt` both become `SOCK_OPT`. A file declaring a name twice does not
//! compile in Rust or Go and silently aliases two rows in Python, so
//! [`generate`](crate::generate) refuses to emit until every declared name is
//! unique within its scope.

use std::collections::BTreeMap;
use std::fmt;

use permatrix_spec::ValidatedMatrix;
use thiserror::Error;

use crate::plan::EmitPlan;
use crate::target::Target;

/// One target name declared for more than one schema identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameCollision {
    /// Target whose output would carry the clash.
    pub target: Target,
    /// Enum, module, class or package scope the name lives in.
    pub scope: String,
    /// The clashing name.
    pub name: String,
    /// Every schema identifier mapped onto `name`, in declaration order.
    pub identifiers: Vec<String>,
}

impl fmt::Display for NameCollision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: `{}` declared for {}",
            self.scope,
            self.name,
            self.identifiers.join(", ")
        )
    }
}

/// Emission refused: some target would declare a name twice.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} target name collision(s):\n{}", .collisions.len(), list(.collisions))]
pub struct NameCollisionError {
    /// Every collision found, grouped by target in requested order.
    pub collisions: Vec<NameCollision>,
}

fn list(collisions: &[NameCollision]) -> String {
    collisions
        .iter()
        .map(|c| format!("  - {}: {c}", c.target))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Finds names `target` would declare for more than one identifier.
#[must_use]
pub fn collisions(target: Target, plan: &EmitPlan<'_>) -> Vec<NameCollision> {
    let mut seen: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();
    for constant in target.constant_names(plan) {
        seen.entry((constant.scope, constant.name))
            .or_default()
            .push(constant.value);
    }
    seen.into_iter()
        .filter(|(_, identifiers)| identifiers.len() > 1)
        .map(|((scope, name), identifiers)| NameCollision {
            target,
            scope,
            name,
            identifiers,
        })
        .collect()
}

pub(crate) fn check_plan(
    plan: &EmitPlan<'_>,
    targets: &[Target],
) -> Result<(), NameCollisionError> {
    let found: Vec<NameCollision> = targets
        .iter()
        .flat_map(|&target| collisions(target, plan))
        .collect();
    if found.is_empty() {
        Ok(())
    } else {
        Err(NameCollisionError { collisions: found })
    }
}

/// Checks that every target declares each name once.
///
/// # Errors
///
/// Returns [`NameCollisionError`] listing every collision across `targets`.
pub fn check_names(
    validated: &ValidatedMatrix<'_>,
    targets: &[Target],
) -> Result<(), NameCollisionError> {
    check_plan(&EmitPlan::new(validated), targets)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use permatrix_spec::{compile, FieldDefinition, PermissionRow, ResourceDefinition, Schema};

    fn socket(first: &str, second: &str) -> Schema {
        let row = PermissionRow::new().with("Read", true);
        Schema::new(["Read"]).with_resource(
            ResourceDefinition::new("Socket", row.clone())
                .with_field(FieldDefinition::new(first, row.clone()))
                .with_field(FieldDefinition::new(second, row)),
        )
    }

    #[test]
    fn case_only_difference_collides_outside_typescript() {
        let schema = socket("id", "Id");
        let validated = compile(&schema).unwrap();
        let err = check_names(&validated, &Target::ALL).unwrap_err();

        let targets: Vec<Target> = err.collisions.iter().map(|c| c.target).collect();
        assert_eq!(targets, vec![Target::Rust, Target::Go, Target::Python]);
        assert_eq!(
            err.collisions[0].to_string(),
            "socket: `ID` declared for Socket.id, Socket.Id"
        );
        assert_eq!(err.collisions[1].name, "FieldSocketId");
        assert!(err.to_string().starts_with("3 target name collision(s):\n  - rust: "));
    }

    #[test]
    fn typescript_alone_accepts_case_variants() {
        let schema = socket("id", "Id");
        let validated = compile(&schema).unwrap();
        assert!(check_names(&validated, &[Target::TypeScript]).is_ok());
    }

    #[test]
    fn trailing_separator_collides_only_in_go() {
        let schema = socket("type", "type_");
        let validated = compile(&schema).unwrap();
        let plan = EmitPlan::new(&validated);
        // `TYPE` and `TYPE_` stay apart; pascal case drops the separator.
        assert!(collisions(Target::Rust, &plan).is_empty());
        assert_eq!(collisions(Target::Go, &plan).len(), 1);
    }
}
