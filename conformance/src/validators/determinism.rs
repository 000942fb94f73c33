//! Determinism validator.
//!
//! Compiles the schema twice into independent matrices, emits every target
//! from each, and requires byte-identical text. Parallel generation must also
//! match sequential emission, unless name collisions make generation refuse,
//! in which case only the two sequential emissions are compared.

use permatrix_codegen::{emit, generate, CodegenOptions, Target};
use permatrix_spec::{compile, CompileError, Schema};

use crate::report::{ConformanceReport, TestResult};

/// Checks that each target's output is byte-identical across independent runs.
///
/// # Errors
///
/// Returns the compile error if `schema` does not compile.
pub fn validate(
    schema: &Schema,
    targets: &[Target],
    options: &CodegenOptions,
) -> Result<ConformanceReport, CompileError> {
    let mut report = ConformanceReport::new();
    let first = compile(schema)?;
    let second = compile(schema)?;
    let parallel = generate(&first, targets, options).ok();

    for (i, &target) in targets.iter().enumerate() {
        let validator = format!("determinism/{target}");
        let a = emit(&first, target, options);
        let b = emit(&second, target, options);
        let concurrent = parallel.as_ref().and_then(|files| files.get(i));

        if a.contents != b.contents {
            report.push(TestResult::fail_with_details(
                validator,
                "output differs between two builds of the same schema",
                vec![first_difference(&a.contents, &b.contents)],
            ));
        } else if let Some(concurrent) = concurrent.filter(|c| c.contents != a.contents) {
            report.push(TestResult::fail_with_details(
                validator,
                "parallel generation differs from sequential emission",
                vec![first_difference(&a.contents, &concurrent.contents)],
            ));
        } else {
            report.push(TestResult::pass(
                validator,
                format!("{} bytes, identical across runs", a.contents.len()),
            ));
        }
    }

    Ok(report)
}

/// Describes the first differing line of two texts.
fn first_difference(a: &str, b: &str) -> String {
    let mut left = a.lines();
    let mut right = b.lines();
    let mut line = 1;
    loop {
        match (left.next(), right.next()) {
            (Some(x), Some(y)) if x == y => line += 1,
            (x, y) => {
                return format!(
                    "line {line}: {:?} vs {:?}",
                    x.unwrap_or("<eof>"),
                    y.unwrap_or("<eof>")
                )
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use permatrix_spec::{FieldDefinition, PermissionRow, ResourceDefinition};

    #[test]
    fn every_target_is_deterministic() {
        let row = PermissionRow::new().with("Read", true).with("List", false);
        let schema = Schema::new(["List", "Read"]).with_resource(
            ResourceDefinition::new("Doc", row.clone())
                .with_field(FieldDefinition::new("title", row)),
        );
        let report = validate(&schema, &Target::ALL, &CodegenOptions::default()).unwrap();
        assert_eq!(report.results.len(), 4);
        assert!(report.all_passed());
    }

    #[test]
    fn difference_points_at_the_line() {
        assert_eq!(first_difference("a\nb\n", "a\nc\n"), "line 2: \"b\" vs \"c\"");
        assert_eq!(first_difference("a\n", "a\nb\n"), "line 2: \"<eof>\" vs \"b\"");
    }
}
