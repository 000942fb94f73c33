//! Cross-target equivalence validator.
//!
//! Decodes every target's emitted table and compares it, over the full
//! entity × verb space, with the validated matrix and with every other target.

use anyhow::Result;
use permatrix_codegen::{emit, CodegenOptions, Target};
use permatrix_spec::ValidatedMatrix;

use crate::decode::{decode, DecodeError, TruthTable};
use crate::report::{ConformanceReport, TestResult};

/// Reference table: every (entity, verb) pair of the validated matrix.
pub fn reference_table(validated: &ValidatedMatrix<'_>) -> TruthTable {
    let mut table = TruthTable::new();
    for row in validated.decision_rows() {
        for (verb, granted) in validated.verbs().iter().zip(&row.decisions) {
            table.insert((row.key.to_string(), verb.to_string()), *granted);
        }
    }
    table
}

/// Lists every pair on which `actual` disagrees with `expected`.
pub fn differences(expected: &TruthTable, actual: &TruthTable) -> Vec<String> {
    let mut out = Vec::new();
    for ((entity, verb), want) in expected {
        match actual.get(&(entity.clone(), verb.clone())) {
            Some(got) if got == want => {}
            Some(got) => out.push(format!("{entity} × {verb}: expected {want}, found {got}")),
            None => out.push(format!("{entity} × {verb}: missing")),
        }
    }
    for (entity, verb) in actual.keys() {
        if !expected.contains_key(&(entity.clone(), verb.clone())) {
            out.push(format!("{entity} × {verb}: unexpected entry"));
        }
    }
    out
}

/// Checks that every target encodes the same truth table as the matrix.
///
/// # Errors
///
/// Returns an error only if a decoder grammar fails to compile.
pub fn validate(
    validated: &ValidatedMatrix<'_>,
    targets: &[Target],
    options: &CodegenOptions,
) -> Result<ConformanceReport> {
    let mut report = ConformanceReport::new();
    let reference = reference_table(validated);
    let mut decoded: Vec<(Target, TruthTable)> = Vec::new();

    for &target in targets {
        let validator = format!("equivalence/{target}");
        let file = emit(validated, target, options);
        let table = match decode(target, &file.contents) {
            Ok(table) => table,
            Err(DecodeError::Pattern(err)) => {
                let context = format!("compiling the {target} decoder");
                return Err(anyhow::Error::new(err).context(context));
            }
            Err(err) => {
                let message = format!("emitted table does not decode: {err}");
                report.push(TestResult::fail(validator, message));
                continue;
            }
        };

        let diff = differences(&reference, &table);
        if diff.is_empty() {
            report.push(TestResult::pass(
                validator,
                format!("{} decisions match the matrix", table.len()),
            ));
        } else {
            report.push(TestResult::fail_with_details(
                validator,
                format!("{} decision(s) disagree with the matrix", diff.len()),
                diff,
            ));
        }
        decoded.push((target, table));
    }

    for (i, (left, left_table)) in decoded.iter().enumerate() {
        for (right, right_table) in &decoded[i + 1..] {
            let validator = format!("equivalence/{left}~{right}");
            let diff = differences(left_table, right_table);
            if diff.is_empty() {
                report.push(TestResult::pass(validator, "identical truth tables"));
            } else {
                report.push(TestResult::fail_with_details(
                    validator,
                    format!("{} decision(s) differ", diff.len()),
                    diff,
                ));
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use permatrix_spec::{compile, FieldDefinition, PermissionRow, ResourceDefinition, Schema};

    #[test]
    fn all_targets_agree() {
        let schema = Schema::standard().with_resource(
            ResourceDefinition::new(
                "Prototype1",
                PermissionRow::new()
                    .with("Create", true)
                    .with("Delete", true)
                    .with("List", false)
                    .with("Read", false)
                    .with("Update", false),
            )
            .with_field(FieldDefinition::new(
                "id",
                PermissionRow::new()
                    .with("Create", false)
                    .with("Delete", false)
                    .with("List", true)
                    .with("Read", true)
                    .with("Update", true),
            )),
        );
        let validated = compile(&schema).unwrap();
        let report = validate(&validated, &Target::ALL, &CodegenOptions::default()).unwrap();
        // One result per target plus one per target pair.
        assert_eq!(report.results.len(), 4 + 6);
        assert!(report.all_passed(), "{:#?}", report.results);
    }

    #[test]
    fn differences_name_each_pair() {
        let mut expected = TruthTable::new();
        expected.insert(("R".into(), "Read".into()), true);
        expected.insert(("R".into(), "List".into()), false);
        let mut actual = TruthTable::new();
        actual.insert(("R".into(), "Read".into()), false);
        actual.insert(("S".into(), "Read".into()), true);
        let diff = differences(&expected, &actual);
        assert_eq!(
            diff,
            vec![
                "R × List: missing".to_string(),
                "R × Read: expected true, found false".to_string(),
                "S × Read: unexpected entry".to_string(),
            ]
        );
    }
}
