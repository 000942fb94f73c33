//! Conformance results and their aggregation.

use std::fmt;

/// Outcome class of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The check passed.
    Pass,
    /// Something worth a look that does not block conformance.
    Warning,
    /// The check failed; the emitted tables must not be trusted.
    Failure,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Pass => "PASS",
            Severity::Warning => "WARN",
            Severity::Failure => "FAIL",
        })
    }
}

/// One check result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    /// Validator that produced the result, e.g. `equivalence/go`.
    pub validator: String,
    /// One-line outcome.
    pub message: String,
    /// Outcome class.
    pub severity: Severity,
    /// Supporting lines, one finding each.
    pub details: Vec<String>,
}

impl TestResult {
    fn new(validator: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            validator: validator.into(),
            message: message.into(),
            severity,
            details: Vec::new(),
        }
    }

    /// A passing result.
    pub fn pass(validator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(validator, message, Severity::Pass)
    }

    /// A warning.
    pub fn warn(validator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(validator, message, Severity::Warning)
    }

    /// A failure.
    pub fn fail(validator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(validator, message, Severity::Failure)
    }

    /// A failure with one detail line per finding.
    pub fn fail_with_details(
        validator: impl Into<String>,
        message: impl Into<String>,
        details: Vec<String>,
    ) -> Self {
        Self {
            details,
            ..Self::fail(validator, message)
        }
    }

    /// Returns true if this result is a failure.
    pub fn is_failure(&self) -> bool {
        self.severity == Severity::Failure
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.validator, self.message)?;
        for detail in &self.details {
            write!(f, "\n       {detail}")?;
        }
        Ok(())
    }
}

/// Every result of a conformance run, in the order the validators produced them.
#[derive(Debug, Default)]
pub struct ConformanceReport {
    /// All results.
    pub results: Vec<TestResult>,
}

impl ConformanceReport {
    /// An empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one result.
    pub fn push(&mut self, result: TestResult) {
        self.results.push(result);
    }

    /// Appends every result of `other`.
    pub fn extend(&mut self, other: ConformanceReport) {
        self.results.extend(other.results);
    }

    /// Number of results with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.results.iter().filter(|r| r.severity == severity).count()
    }

    /// Number of failures.
    pub fn failure_count(&self) -> usize {
        self.count(Severity::Failure)
    }

    /// Returns true if no check failed.
    pub fn all_passed(&self) -> bool {
        self.failure_count() == 0
    }

    /// Results whose validator name starts with `prefix`.
    pub fn results_for<'r>(&'r self, prefix: &'r str) -> impl Iterator<Item = &'r TestResult> + 'r {
        self.results.iter().filter(move |r| r.validator.starts_with(prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_details_render_indented() {
        let result = TestResult::fail_with_details(
            "naming/go",
            "2 colliding names",
            vec!["a".to_string(), "b".to_string()],
        );
        assert_eq!(
            result.to_string(),
            "[FAIL] naming/go: 2 colliding names\n       a\n       b"
        );
    }

    #[test]
    fn counts_by_severity() {
        let mut report = ConformanceReport::new();
        report.push(TestResult::pass("matrix", "ok"));
        report.push(TestResult::warn("naming/ts", "hmm"));
        assert!(report.all_passed());
        report.push(TestResult::fail("equivalence/go", "mismatch"));
        assert_eq!(report.failure_count(), 1);
        assert_eq!(report.count(Severity::Warning), 1);
        assert_eq!(report.results_for("equivalence").count(), 1);
    }
}
