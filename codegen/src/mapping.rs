//! Schema identifier → target identifier mappings.
//!
//! Schema identifiers match `[A-Za-z_][A-Za-z0-9_]*`. Each target renders them
//! in its own case convention; names that land on a keyword or on a name the
//! emitter itself declares get a trailing `_`.

/// Rust keywords (strict and reserved).
pub const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "box", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while", "abstract", "become", "do", "final", "macro",
    "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
];

/// Names a TypeScript enum may not take: reserved words, predeclared type
/// names, and the names the TypeScript emitter declares.
pub const TYPESCRIPT_RESERVED: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete", "do",
    "else", "enum", "export", "extends", "false", "finally", "for", "function", "if", "import",
    "in", "instanceof", "new", "null", "return", "super", "switch", "this", "throw", "true", "try",
    "typeof", "var", "void", "while", "with", "implements", "interface", "let", "package",
    "private", "protected", "public", "static", "yield", "any", "boolean", "never", "number",
    "object", "string", "symbol", "type", "undefined", "unknown", "AllResources", "Domains",
    "Mappings", "PermissionMappings", "PermissionResources", "Permissions", "Record",
    "Resources", "requiresPermission",
];

/// Python keywords plus the names the Python emitter declares.
pub const PYTHON_RESERVED: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield", "Domain", "Enum", "Mapping", "MAPPINGS", "Permission", "Resource",
    "Union", "requires_permission",
];

/// Appends `_` to `name` if it appears in `reserved`.
#[must_use]
pub fn escape_reserved(name: String, reserved: &[&str]) -> String {
    if reserved.contains(&name.as_str()) {
        format!("{name}_")
    } else {
        name
    }
}

/// Splits a camelCase, PascalCase or snake_case identifier into lowercase words
/// joined by `_`. Runs of capitals stay together (`HTTPPort` → `httpport`).
fn snake_words(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let mut prev: Option<char> = None;
    for ch in s.chars() {
        if ch.is_ascii_uppercase() {
            if prev.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit()) {
                result.push('_');
            }
            result.push(ch.to_ascii_lowercase());
        } else {
            result.push(ch);
        }
        prev = Some(ch);
    }
    result
}

/// Converts an identifier into a snake_case Rust identifier.
#[must_use]
pub fn to_snake_case(s: &str) -> String {
    escape_reserved(snake_words(s), RUST_KEYWORDS)
}

/// Converts an identifier into SCREAMING_SNAKE_CASE.
#[must_use]
pub fn to_screaming_snake_case(s: &str) -> String {
    snake_words(s).to_ascii_uppercase()
}

/// Converts an identifier into PascalCase: `_` separators are dropped and the
/// letter after each is capitalized. The result never starts with a digit.
#[must_use]
pub fn to_pascal_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for part in s.split('_').filter(|p| !p.is_empty()) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            result.push(first.to_ascii_uppercase());
            result.push_str(chars.as_str());
        }
    }
    if result.is_empty() || result.starts_with(|c: char| c.is_ascii_digit()) {
        result.insert(0, '_');
    }
    result
}
