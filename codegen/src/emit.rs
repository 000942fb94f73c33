//! Line-oriented source builder shared by every emitter.

use std::fmt::Write as FmtWrite;

/// Header every generated file starts with, after the target's comment marker.
pub const GENERATED_HEADER: &str = "Code generated by permatrix. DO NOT EDIT.";

/// A generated source file under construction.
///
/// The header comment is written on creation, so every finished file starts
/// with it regardless of target.
pub struct SourceFile {
    /// Accumulated text. Emitters may `writeln!` into it directly.
    pub buf: String,
    comment: &'static str,
}

impl SourceFile {
    /// Starts a file whose line comments begin with `comment` (`//`, `#`).
    #[must_use]
    pub fn new(comment: &'static str) -> Self {
        let mut buf = String::with_capacity(4096);
        let _ = writeln!(buf, "{comment} {GENERATED_HEADER}");
        Self { buf, comment }
    }

    /// Appends `text` followed by a newline.
    pub fn line(&mut self, text: &str) {
        self.buf.push_str(text);
        self.buf.push('\n');
    }

    /// Appends an empty line.
    pub fn blank(&mut self) {
        self.buf.push('\n');
    }

    /// Appends a line comment at the given indentation.
    pub fn comment(&mut self, indent: &str, text: &str) {
        let _ = writeln!(self.buf, "{indent}{} {text}", self.comment);
    }

    /// Returns the finished text with exactly one trailing newline.
    #[must_use]
    pub fn finish(mut self) -> String {
        while self.buf.ends_with("\n\n") {
            self.buf.pop();
        }
        self.buf
    }
}

/// Returns true if `contents` starts with a permatrix header in any comment syntax.
#[must_use]
pub fn is_generated(contents: &str) -> bool {
    contents
        .lines()
        .next()
        .and_then(|first| {
            first
                .strip_prefix("//")
                .or_else(|| first.strip_prefix('#'))
        })
        .is_some_and(|rest| rest.trim() == GENERATED_HEADER)
}

/// Right-pads `name` so values in a block line up, as `gofmt` does.
pub(crate) fn pad(name: &str, width: usize) -> String {
    format!("{name:<width$}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_first_line() {
        let mut f = SourceFile::new("#");
        f.line("x = 1");
        f.blank();
        f.blank();
        let text = f.finish();
        assert_eq!(text, "# Code generated by permatrix. DO NOT EDIT.\nx = 1\n");
        assert!(is_generated(&text));
    }

    #[test]
    fn hand_written_files_are_not_generated() {
        assert!(!is_generated("export const x = 1;\n"));
        assert!(!is_generated(""));
        assert!(!is_generated("// some other header\n"));
        assert!(is_generated("// Code generated by permatrix. DO NOT EDIT.\n"));
    }

    #[test]
    fn comment_uses_target_marker() {
        let mut f = SourceFile::new("//");
        f.comment("\t", "Fields of R.");
        assert!(f.finish().ends_with("\t// Fields of R.\n"));
    }
}
