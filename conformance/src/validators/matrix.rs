//! Matrix validator: builds the matrix and surfaces every validation violation.

use permatrix_spec::matrix::build;
use permatrix_spec::validate::validate as validate_matrix;
use permatrix_spec::Schema;

use crate::report::{ConformanceReport, TestResult};

const VALIDATOR: &str = "matrix";

/// Builds the matrix for `schema` and reports completeness, shape and uniqueness.
pub fn validate(schema: &Schema) -> ConformanceReport {
    let mut report = ConformanceReport::new();

    let matrix = match build(schema) {
        Ok(matrix) => matrix,
        Err(err) => {
            report.push(TestResult::fail(VALIDATOR, err.to_string()));
            return report;
        }
    };

    let violations = validate_matrix(&matrix, schema);
    if violations.is_empty() {
        report.push(TestResult::pass(
            VALIDATOR,
            format!(
                "{} rows × {} verbs, complete and unique",
                matrix.len(),
                schema.verbs.len()
            ),
        ));
    } else {
        report.push(TestResult::fail_with_details(
            VALIDATOR,
            format!("{} violation(s)", violations.len()),
            violations.iter().map(ToString::to_string).collect(),
        ));
    }

    report
}
