//! Matrix validator.
//!
//! Checks a built [`PermissionMatrix`] against the [`Schema`] it came from:
//!
//! - **uniqueness**: no two schema entities share a flat key, no verb is declared twice
//! - **naming**: every verb, domain, resource and field name is a usable identifier
//! - **completeness**: every schema entity has exactly one row, and no row is unaccounted for
//! - **shape**: every row holds exactly the declared verb set, each verb once
//!
//! The validator never stops at the first defect; a single run reports every
//! violation. Only a matrix with an empty report becomes a [`ValidatedMatrix`],
//! which is the only thing emitters accept.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::error::ValidationFailure;
use crate::loader::identifier_defect;
use crate::matrix::{MatrixRow, PermissionMatrix};
use crate::model::{Domain, EntityKey, EntityKind, PermissionVerb, Schema};

/// The kind of defect a [`Violation`] describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    /// Two schema entities map to the same flat key.
    DuplicateIdentifier {
        /// What the first holder of the key is.
        first: EntityKind,
        /// What the colliding entity is.
        second: EntityKind,
    },
    /// A verb, domain, resource or field name is not a usable identifier.
    InvalidIdentifier {
        /// The rule it breaks.
        reason: &'static str,
    },
    /// The matrix holds more than one row for one key.
    DuplicateRow {
        /// Number of rows found.
        count: usize,
    },
    /// A verb appears twice in the schema's verb set.
    DuplicateVerbDeclaration,
    /// The matrix was built over a different verb set than the schema declares.
    VerbSetMismatch {
        /// Verbs the schema declares.
        expected: Vec<PermissionVerb>,
        /// Verbs the matrix carries.
        found: Vec<PermissionVerb>,
    },
    /// A schema entity has no row.
    MissingRow,
    /// A row exists for a key the schema does not declare.
    UnexpectedRow,
    /// A row lacks a declared verb.
    MissingVerb {
        /// The missing verb.
        verb: PermissionVerb,
    },
    /// A row holds a verb the schema does not declare.
    UnexpectedVerb {
        /// The undeclared verb.
        verb: PermissionVerb,
    },
    /// A row holds the same verb more than once.
    RepeatedVerb {
        /// The repeated verb.
        verb: PermissionVerb,
    },
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::DuplicateIdentifier { first, second } => write!(
                f,
                "identifier collision between a {} and a {}",
                first.label(),
                second.label()
            ),
            ViolationKind::InvalidIdentifier { reason } => {
                write!(f, "invalid identifier: {reason}")
            }
            ViolationKind::DuplicateRow { count } => write!(f, "{count} rows share this key"),
            ViolationKind::DuplicateVerbDeclaration => {
                f.write_str("verb is declared more than once")
            }
            ViolationKind::VerbSetMismatch { expected, found } => write!(
                f,
                "matrix verb set [{}] differs from declared [{}]",
                join(found),
                join(expected)
            ),
            ViolationKind::MissingRow => f.write_str("no matrix row"),
            ViolationKind::UnexpectedRow => {
                f.write_str("row for an entity the schema does not declare")
            }
            ViolationKind::MissingVerb { verb } => write!(f, "missing verb `{verb}`"),
            ViolationKind::UnexpectedVerb { verb } => write!(f, "undeclared verb `{verb}`"),
            ViolationKind::RepeatedVerb { verb } => {
                write!(f, "verb `{verb}` appears more than once")
            }
        }
    }
}

fn join(verbs: &[PermissionVerb]) -> String {
    verbs
        .iter()
        .map(PermissionVerb::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// One defect: the offending entity (or verb) and what is wrong with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Entity key, or the verb name for verb-set defects.
    pub entity: String,
    /// What is wrong.
    #[serde(flatten)]
    pub kind: ViolationKind,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`: {}", self.entity, self.kind)
    }
}

/// Ordered list of every violation found. Empty means the matrix is sound.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Violations in discovery order.
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns true if no violation was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Number of violations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Iterates violations in discovery order.
    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.violations.iter()
    }

    fn push(&mut self, entity: impl Into<String>, kind: ViolationKind) {
        self.violations.push(Violation {
            entity: entity.into(),
            kind,
        });
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "  - {violation}")?;
        }
        Ok(())
    }
}

/// A matrix row whose decisions are aligned with the declared verb order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionRow {
    /// Flat namespaced key.
    pub key: EntityKey,
    /// Resource or field.
    pub kind: EntityKind,
    /// Domain of the owning resource.
    pub domain: Option<Domain>,
    /// One decision per declared verb, in declared order.
    pub decisions: Vec<bool>,
}

/// A matrix that passed validation, together with the schema it was built from.
///
/// Obtainable only through [`verify`].
#[derive(Debug, Clone)]
pub struct ValidatedMatrix<'s> {
    schema: &'s Schema,
    matrix: PermissionMatrix,
    rows: Vec<DecisionRow>,
}

impl<'s> ValidatedMatrix<'s> {
    /// The originating schema.
    #[must_use]
    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    /// The validated matrix.
    #[must_use]
    pub fn matrix(&self) -> &PermissionMatrix {
        &self.matrix
    }

    /// Declared verbs, in the order every decision row follows.
    #[must_use]
    pub fn verbs(&self) -> &[PermissionVerb] {
        &self.schema.verbs
    }

    /// Rows in declaration order with decisions aligned to [`verbs`](Self::verbs).
    #[must_use]
    pub fn decision_rows(&self) -> &[DecisionRow] {
        &self.rows
    }

    /// Reference lookup over the validated table.
    #[must_use]
    pub fn requires_permission(&self, entity: &str, verb: &str) -> Option<bool> {
        let column = self.verbs().iter().position(|v| v.as_str() == verb)?;
        self.rows
            .iter()
            .find(|r| r.key.as_str() == entity)
            .and_then(|r| r.decisions.get(column).copied())
    }
}

/// Validates `matrix` against `schema`, accumulating every violation.
#[must_use]
pub fn validate(matrix: &PermissionMatrix, schema: &Schema) -> ValidationReport {
    let (report, _) = run(matrix, schema);
    report
}

/// Validates `matrix` and, if sound, seals it as a [`ValidatedMatrix`].
///
/// # Errors
///
/// Returns [`ValidationFailure`] carrying the full report if any check fails.
pub fn verify(
    matrix: PermissionMatrix,
    schema: &Schema,
) -> Result<ValidatedMatrix<'_>, ValidationFailure> {
    let (report, rows) = run(&matrix, schema);
    if !report.is_empty() {
        debug!(violations = report.len(), "permission matrix rejected");
        return Err(ValidationFailure { report });
    }
    debug!(rows = rows.len(), "permission matrix validated");
    Ok(ValidatedMatrix {
        schema,
        matrix,
        rows,
    })
}

fn run(matrix: &PermissionMatrix, schema: &Schema) -> (ValidationReport, Vec<DecisionRow>) {
    let mut report = ValidationReport::default();

    check_verb_set(matrix, schema, &mut report);
    check_names(schema, &mut report);
    check_identifiers(schema, &mut report);
    check_row_coverage(matrix, schema, &mut report);

    let rows = matrix
        .rows()
        .iter()
        .filter_map(|row| check_shape(row, &schema.verbs, &mut report))
        .collect();

    (report, rows)
}

fn check_verb_set(matrix: &PermissionMatrix, schema: &Schema, report: &mut ValidationReport) {
    let mut seen = HashSet::new();
    for verb in &schema.verbs {
        if !seen.insert(verb.as_str()) {
            report.push(verb.as_str(), ViolationKind::DuplicateVerbDeclaration);
        }
    }
    if matrix.verbs() != schema.verbs.as_slice() {
        report.push(
            "*",
            ViolationKind::VerbSetMismatch {
                expected: schema.verbs.clone(),
                found: matrix.verbs().to_vec(),
            },
        );
    }
}

/// Schemas assembled in code skip the loader, so its identifier rules are
/// applied again here.
fn check_names(schema: &Schema, report: &mut ValidationReport) {
    let verbs = schema.verbs.iter().map(PermissionVerb::as_str);
    let domains = schema.domains.iter().map(Domain::as_str);
    for name in verbs.chain(domains) {
        if let Some(reason) = identifier_defect(name) {
            report.push(name, ViolationKind::InvalidIdentifier { reason });
        }
    }
    for entity in schema.entities() {
        let local = entity.field.map_or(entity.resource.id.as_str(), |f| f.name.as_str());
        if let Some(reason) = identifier_defect(local) {
            report.push(entity.key().as_str(), ViolationKind::InvalidIdentifier { reason });
        }
    }
}

/// Flat-key scan over every schema entity.
fn check_identifiers(schema: &Schema, report: &mut ValidationReport) {
    let mut first_seen: HashMap<EntityKey, EntityKind> = HashMap::new();
    for entity in schema.entities() {
        let key = entity.key();
        match first_seen.get(&key) {
            Some(first) => report.push(
                key.as_str(),
                ViolationKind::DuplicateIdentifier {
                    first: first.clone(),
                    second: entity.kind(),
                },
            ),
            None => {
                first_seen.insert(key, entity.kind());
            }
        }
    }
}

fn check_row_coverage(matrix: &PermissionMatrix, schema: &Schema, report: &mut ValidationReport) {
    // BTreeMap keeps the duplicate-row findings in a stable order.
    let mut row_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for row in matrix.rows() {
        *row_counts.entry(row.key.as_str()).or_default() += 1;
    }

    let mut declared = HashSet::new();
    for entity in schema.entities() {
        let key = entity.key();
        if !declared.insert(key.clone()) {
            continue;
        }
        if !row_counts.contains_key(key.as_str()) {
            report.push(key.as_str(), ViolationKind::MissingRow);
        }
    }

    for (key, count) in &row_counts {
        if !declared.contains(&EntityKey::resource(key)) {
            report.push(*key, ViolationKind::UnexpectedRow);
        } else if *count > 1 {
            report.push(*key, ViolationKind::DuplicateRow { count: *count });
        }
    }
}

/// Checks one row's verb set and returns it aligned to `verbs` if it is sound.
fn check_shape(
    row: &MatrixRow,
    verbs: &[PermissionVerb],
    report: &mut ValidationReport,
) -> Option<DecisionRow> {
    let before = report.len();

    let mut seen = HashSet::new();
    for (verb, _) in &row.grants {
        if !seen.insert(verb.as_str()) {
            let kind = ViolationKind::RepeatedVerb { verb: verb.clone() };
            report.push(row.key.as_str(), kind);
        }
        if !verbs.contains(verb) {
            let kind = ViolationKind::UnexpectedVerb { verb: verb.clone() };
            report.push(row.key.as_str(), kind);
        }
    }

    let mut decisions = Vec::with_capacity(verbs.len());
    for verb in verbs {
        match row.grant(verb.as_str()) {
            Some(granted) => decisions.push(granted),
            None => {
                let kind = ViolationKind::MissingVerb { verb: verb.clone() };
                report.push(row.key.as_str(), kind);
            }
        }
    }

    (report.len() == before).then(|| DecisionRow {
        key: row.key.clone(),
        kind: row.kind.clone(),
        domain: row.domain.clone(),
        decisions,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::matrix::build;
    use crate::model::{FieldDefinition, PermissionRow, ResourceDefinition};

    fn full(granted: bool) -> PermissionRow {
        crate::model::STANDARD_VERBS
            .iter()
            .map(|v| (*v, granted))
            .collect()
    }

    fn prototype() -> Schema {
        Schema::standard().with_resource(
            ResourceDefinition::new("Prototype1", full(false))
                .with_field(FieldDefinition::new("id", full(true)))
                .with_field(FieldDefinition::new("protocol", full(true))),
        )
    }

    #[test]
    fn sound_matrix_has_empty_report() {
        let schema = prototype();
        let matrix = build(&schema).unwrap();
        assert!(validate(&matrix, &schema).is_empty());
        let validated = verify(matrix, &schema).unwrap();
        assert_eq!(validated.decision_rows().len(), 3);
        assert_eq!(validated.requires_permission("Prototype1.id", "Read"), Some(true));
        assert_eq!(validated.requires_permission("Prototype1", "Read"), Some(false));
        assert_eq!(validated.requires_permission("Prototype1", "Approve"), None);
    }

    #[test]
    fn fields_sharing_a_local_name_are_a_uniqueness_violation() {
        let schema = Schema::standard().with_resource(
            ResourceDefinition::new("R", full(true))
                .with_field(FieldDefinition::new("id", full(true)))
                .with_field(FieldDefinition::new("id", full(false))),
        );
        let matrix = build(&schema).unwrap();
        let report = validate(&matrix, &schema);
        assert!(report.iter().any(|v| v.entity == "R.id"
            && matches!(v.kind, ViolationKind::DuplicateIdentifier { .. })));
        assert!(report
            .iter()
            .any(|v| v.entity == "R.id" && v.kind == ViolationKind::DuplicateRow { count: 2 }));
        assert!(verify(matrix, &schema).is_err());
    }

    #[test]
    fn resource_colliding_with_a_namespaced_field_key() {
        let schema = Schema::standard()
            .with_resource(
                ResourceDefinition::new("A", full(true))
                    .with_field(FieldDefinition::new("b", full(true))),
            )
            .with_resource(ResourceDefinition::new("A.b", full(false)));
        let matrix = build(&schema).unwrap();
        let report = validate(&matrix, &schema);
        let collision = report
            .iter()
            .find(|v| matches!(v.kind, ViolationKind::DuplicateIdentifier { .. }))
            .unwrap();
        assert_eq!(collision.entity, "A.b");
        assert_eq!(
            collision.kind,
            ViolationKind::DuplicateIdentifier {
                first: EntityKind::Field {
                    resource: "A".to_string(),
                    field: "b".to_string()
                },
                second: EntityKind::Resource,
            }
        );
    }

    #[test]
    fn accumulates_every_defect() {
        let schema = prototype();
        let built = build(&schema).unwrap();
        let mut rows = built.rows().to_vec();
        // Drop one row, damage another, and add an orphan.
        rows.remove(2);
        rows[1].grants.retain(|(v, _)| v.as_str() != "Update");
        rows[1].grants.push((PermissionVerb::new("Approve"), true));
        let ghost_grants = rows[0].grants.clone();
        rows.push(MatrixRow {
            key: EntityKey::resource("Ghost"),
            kind: EntityKind::Resource,
            domain: None,
            grants: ghost_grants,
        });
        let matrix = PermissionMatrix::from_rows(schema.verbs.clone(), rows);

        let report = validate(&matrix, &schema);
        let kinds: Vec<(&str, &ViolationKind)> =
            report.iter().map(|v| (v.entity.as_str(), &v.kind)).collect();
        assert!(kinds.contains(&("Prototype1.protocol", &ViolationKind::MissingRow)));
        assert!(kinds.contains(&("Ghost", &ViolationKind::UnexpectedRow)));
        assert!(kinds.contains(&(
            "Prototype1.id",
            &ViolationKind::MissingVerb {
                verb: PermissionVerb::new("Update")
            }
        )));
        assert!(kinds.contains(&(
            "Prototype1.id",
            &ViolationKind::UnexpectedVerb {
                verb: PermissionVerb::new("Approve")
            }
        )));
        assert_eq!(report.len(), 4);
    }

    #[test]
    fn repeated_verbs_and_verb_set_mismatch() {
        let schema = Schema::new(["Read", "Read"]).with_resource(ResourceDefinition::new(
            "R",
            PermissionRow::new().with("Read", true),
        ));
        let matrix = PermissionMatrix::from_rows(
            vec![PermissionVerb::new("Read")],
            vec![MatrixRow {
                key: EntityKey::resource("R"),
                kind: EntityKind::Resource,
                domain: None,
                grants: vec![
                    (PermissionVerb::new("Read"), true),
                    (PermissionVerb::new("Read"), false),
                ],
            }],
        );
        let report = validate(&matrix, &schema);
        assert!(report
            .iter()
            .any(|v| v.kind == ViolationKind::DuplicateVerbDeclaration));
        assert!(report
            .iter()
            .any(|v| matches!(v.kind, ViolationKind::VerbSetMismatch { .. })));
        assert!(report.iter().any(|v| v.kind
            == ViolationKind::RepeatedVerb {
                verb: PermissionVerb::new("Read")
            }));
    }

    #[test]
    fn decision_rows_follow_declared_verb_order() {
        let schema = Schema::new(["Read", "Create"]).with_resource(ResourceDefinition::new(
            "R",
            PermissionRow::new().with("Create", true).with("Read", false),
        ));
        let matrix = PermissionMatrix::from_rows(
            schema.verbs.clone(),
            vec![MatrixRow {
                key: EntityKey::resource("R"),
                kind: EntityKind::Resource,
                domain: None,
                // Authored out of order; alignment follows the declaration.
                grants: vec![
                    (PermissionVerb::new("Create"), true),
                    (PermissionVerb::new("Read"), false),
                ],
            }],
        );
        let validated = verify(matrix, &schema).unwrap();
        assert_eq!(validated.decision_rows()[0].decisions, vec![false, true]);
    }

    #[test]
    fn report_display_lists_every_violation() {
        let mut report = ValidationReport::default();
        report.push("A", ViolationKind::MissingRow);
        report.push("B", ViolationKind::UnexpectedRow);
        assert_eq!(
            report.to_string(),
            "  - `A`: no matrix row\n  - `B`: row for an entity the schema does not declare"
        );
    }

    #[test]
    fn unnameable_identifiers_built_in_code_are_reported() {
        let row = PermissionRow::new().with("Read", true);
        let schema = Schema::new(["Read"])
            .with_resource(ResourceDefinition::new("_", row.clone()))
            .with_resource(
                ResourceDefinition::new("Socket", row.clone())
                    .with_field(FieldDefinition::new("_x_", row)),
            );
        let matrix = build(&schema).unwrap();
        let report = validate(&matrix, &schema);
        let invalid: Vec<&str> = report
            .iter()
            .filter(|v| matches!(v.kind, ViolationKind::InvalidIdentifier { .. }))
            .map(|v| v.entity.as_str())
            .collect();
        assert_eq!(invalid, vec!["_", "Socket._x_"]);
        assert!(verify(matrix, &schema).is_err());
    }
}
