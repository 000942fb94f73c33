//! Decoders that read an emitted file back into a truth table.
//!
//! Each target has a small line grammar: constant declarations (optionally
//! inside an enum, module or class scope), a table opener and closer, entity
//! header lines and decision lines inside the table. Names used in the table
//! are resolved through the declarations, so a decoded entry carries the
//! string values the lookup function would actually compare.

use std::collections::{BTreeMap, HashMap};

use permatrix_codegen::Target;
use regex::Regex;
use thiserror::Error;

/// (entity, verb) → granted.
pub type TruthTable = BTreeMap<(String, String), bool>;

/// An emitted file that does not read back as a table.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// A grammar pattern failed to compile.
    #[error("decoder pattern is invalid: {0}")]
    Pattern(#[from] regex::Error),

    /// The table references a name no declaration defines.
    #[error("{target} line {line}: `{name}` is not declared")]
    UnresolvedName {
        /// Target being decoded.
        target: Target,
        /// The unresolved name as written.
        name: String,
        /// 1-based line.
        line: usize,
    },

    /// A decision line appears before any entity header.
    #[error("{target} line {line}: decision outside an entity entry")]
    OrphanDecision {
        /// Target being decoded.
        target: Target,
        /// 1-based line.
        line: usize,
    },

    /// The same (entity, verb) pair is decided twice.
    #[error("{target}: `{entity}` decides `{verb}` more than once")]
    DuplicateDecision {
        /// Target being decoded.
        target: Target,
        /// Entity value.
        entity: String,
        /// Verb value.
        verb: String,
    },

    /// The file has no lookup function.
    #[error("{target}: lookup function not found")]
    MissingLookup {
        /// Target being decoded.
        target: Target,
    },

    /// The file has no table.
    #[error("{target}: permission table not found")]
    MissingTable {
        /// Target being decoded.
        target: Target,
    },
}

struct Grammar {
    scope_open: Option<&'static str>,
    scope_close: Option<&'static str>,
    constants: &'static [&'static str],
    table_open: &'static str,
    table_close: &'static str,
    entity: &'static str,
    decision: &'static str,
    lookup: &'static str,
    separator: &'static str,
    truthy: &'static str,
}

const TYPESCRIPT: Grammar = Grammar {
    scope_open: Some(r"^export enum (?P<scope>\w+) \{$"),
    scope_close: Some(r"^\}$"),
    constants: &[r"^  (?P<name>\w+) = '(?P<value>[^']*)',$"],
    table_open: r"^const Mappings: PermissionMappings = \{$",
    table_close: r"^\};$",
    entity: r"^  \[(?P<qual>\w+)\.(?P<name>\w+)\]: \{$",
    decision: r"^    \[(?P<qual>\w+)\.(?P<name>\w+)\]: (?P<value>true|false),$",
    lookup: concat!(
        r"(?m)^export function requiresPermission\(",
        r"resource: AllResources, permission: Permissions\): boolean \{$",
    ),
    separator: ".",
    truthy: "true",
};

const RUST: Grammar = Grammar {
    scope_open: Some(r"^pub mod (?P<scope>\w+) \{$"),
    scope_close: Some(r"^\}$"),
    constants: &[
        r#"^    pub const (?P<name>\w+): &str = "(?P<value>[^"]*)";$"#,
        r#"^            (?P<scope>Permission)::(?P<name>\w+) => "(?P<value>[^"]*)",$"#,
    ],
    table_open: r"^pub const MAPPINGS: &\[\(&str, &\[\(Permission, bool\)\]\)\] = &\[$",
    table_close: r"^\];$",
    entity: r"^        (?P<qual>\w+)::(?P<name>\w+),$",
    decision: r"^            \((?P<qual>\w+)::(?P<name>\w+), (?P<value>true|false)\),$",
    lookup: concat!(
        r"(?m)^pub fn requires_permission\(",
        r"resource: &str, permission: Permission\) -> Option<bool> \{$",
    ),
    separator: "::",
    truthy: "true",
};

const GO: Grammar = Grammar {
    scope_open: None,
    scope_close: None,
    constants: &[r#"^\t(?P<name>\w+)\s+(?:Permission|Domain|Resource) = "(?P<value>[^"]*)"$"#],
    table_open: r"^var mappings = map\[Resource\]map\[Permission\]bool\{$",
    table_close: r"^\}$",
    entity: r"^\t(?P<name>\w+): \{$",
    decision: r"^\t\t(?P<name>\w+):\s+(?P<value>true|false),$",
    lookup: concat!(
        r"(?m)^func RequiresPermission\(",
        r"resource Resource, permission Permission\) \(bool, error\) \{$",
    ),
    separator: "",
    truthy: "true",
};

const PYTHON: Grammar = Grammar {
    scope_open: Some(r"^class (?P<scope>\w+)\(str, Enum\):$"),
    scope_close: Some(r"^\S"),
    constants: &[r#"^    (?P<name>\w+) = "(?P<value>[^"]*)"$"#],
    table_open: r"^MAPPINGS: Mapping\[str, Mapping\[str, bool\]\] = \{$",
    table_close: r"^\}$",
    entity: r"^    (?P<qual>\w+)\.(?P<name>\w+)\.value: \{$",
    decision: r"^        (?P<qual>\w+)\.(?P<name>\w+)\.value: (?P<value>True|False),$",
    lookup: concat!(
        r"(?m)^def requires_permission\(",
        r"resource: Union\[str, Enum\], permission: Union\[str, Permission\]\) -> bool:$",
    ),
    separator: ".",
    truthy: "True",
};

fn grammar(target: Target) -> &'static Grammar {
    match target {
        Target::TypeScript => &TYPESCRIPT,
        Target::Rust => &RUST,
        Target::Go => &GO,
        Target::Python => &PYTHON,
    }
}

struct Compiled {
    scope_open: Option<Regex>,
    scope_close: Option<Regex>,
    constants: Vec<Regex>,
    table_open: Regex,
    table_close: Regex,
    entity: Regex,
    decision: Regex,
    lookup: Regex,
}

impl Compiled {
    fn new(g: &Grammar) -> Result<Self, regex::Error> {
        Ok(Self {
            scope_open: g.scope_open.map(Regex::new).transpose()?,
            scope_close: g.scope_close.map(Regex::new).transpose()?,
            constants: g.constants.iter().map(|p| Regex::new(p)).collect::<Result<_, _>>()?,
            table_open: Regex::new(g.table_open)?,
            table_close: Regex::new(g.table_close)?,
            entity: Regex::new(g.entity)?,
            decision: Regex::new(g.decision)?,
            lookup: Regex::new(g.lookup)?,
        })
    }
}

fn qualified(separator: &str, qualifier: Option<&str>, name: &str) -> String {
    match qualifier {
        Some(q) => format!("{q}{separator}{name}"),
        None => name.to_string(),
    }
}

/// Decodes the table of a file emitted for `target`.
///
/// # Errors
///
/// Returns [`DecodeError`] if the file lacks a table or lookup, or if the
/// table references undeclared names or decides a pair twice.
pub fn decode(target: Target, text: &str) -> Result<TruthTable, DecodeError> {
    let g = grammar(target);
    let re = Compiled::new(g)?;

    if !re.lookup.is_match(text) {
        return Err(DecodeError::MissingLookup { target });
    }

    let mut names: HashMap<String, String> = HashMap::new();
    let mut table = TruthTable::new();
    let mut scope: Option<String> = None;
    let mut in_table = false;
    let mut saw_table = false;
    let mut entity: Option<String> = None;

    let resolve = |names: &HashMap<String, String>, qual: Option<&str>, name: &str, line: usize| {
        let key = qualified(g.separator, qual, name);
        names
            .get(&key)
            .cloned()
            .ok_or_else(|| DecodeError::UnresolvedName { target, name: key, line })
    };

    for (index, line) in text.lines().enumerate() {
        let lineno = index + 1;

        if in_table {
            if re.table_close.is_match(line) {
                in_table = false;
            } else if let Some(caps) = re.entity.captures(line) {
                let qual = caps.name("qual").map(|m| m.as_str());
                entity = Some(resolve(&names, qual, &caps["name"], lineno)?);
            } else if let Some(caps) = re.decision.captures(line) {
                let Some(current) = entity.as_ref() else {
                    return Err(DecodeError::OrphanDecision { target, line: lineno });
                };
                let qual = caps.name("qual").map(|m| m.as_str());
                let verb = resolve(&names, qual, &caps["name"], lineno)?;
                let granted = &caps["value"] == g.truthy;
                if table.insert((current.clone(), verb.clone()), granted).is_some() {
                    return Err(DecodeError::DuplicateDecision {
                        target,
                        entity: current.clone(),
                        verb,
                    });
                }
            }
            continue;
        }

        if re.table_open.is_match(line) {
            in_table = true;
            saw_table = true;
            scope = None;
            continue;
        }
        if let Some(caps) = re.scope_open.as_ref().and_then(|r| r.captures(line)) {
            scope = Some(caps["scope"].to_string());
            continue;
        }
        if re.scope_close.as_ref().is_some_and(|r| r.is_match(line)) {
            scope = None;
        }
        for constant in &re.constants {
            if let Some(caps) = constant.captures(line) {
                let qual = caps
                    .name("scope")
                    .map(|m| m.as_str())
                    .or(scope.as_deref());
                let name = qualified(g.separator, qual, &caps["name"]);
                names.insert(name, caps["value"].to_string());
                break;
            }
        }
    }

    if !saw_table {
        return Err(DecodeError::MissingTable { target });
    }
    Ok(table)
}
