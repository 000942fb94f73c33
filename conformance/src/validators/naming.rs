//! Naming validator: every name a target declares is unique within its scope,
//! and the Go package clause is a valid identifier.

use permatrix_codegen::naming::collisions;
use permatrix_codegen::{CodegenOptions, EmitPlan, Target};
use permatrix_spec::loader::check_identifier;
use permatrix_spec::ValidatedMatrix;

use crate::report::{ConformanceReport, TestResult};

/// Checks every target's declared names for collisions.
pub fn validate(
    validated: &ValidatedMatrix<'_>,
    targets: &[Target],
    options: &CodegenOptions,
) -> ConformanceReport {
    let mut report = ConformanceReport::new();
    let plan = EmitPlan::new(validated);

    for &target in targets {
        let validator = format!("naming/{target}");
        let found: Vec<String> = collisions(target, &plan)
            .iter()
            .map(ToString::to_string)
            .collect();
        if found.is_empty() {
            report.push(TestResult::pass(validator, "all declared names are unique"));
        } else {
            report.push(TestResult::fail_with_details(
                validator,
                format!("{} colliding name(s)", found.len()),
                found,
            ));
        }
    }

    if targets.contains(&Target::Go) {
        match check_identifier("go package", &options.go_package) {
            Ok(()) => {}
            Err(err) => report.push(TestResult::fail("naming/go", err.to_string())),
        }
    }

    report
}
