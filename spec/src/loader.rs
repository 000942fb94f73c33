//! Schema loader: TOML or JSON source → [`Schema`].
//!
//! The loader is a pure parse. It either returns a complete schema that
//! satisfies every identifier and verb rule, or an error; never a partial model.
//!
//! ```
//! use permatrix_spec::loader::{load, SchemaFormat};
//!
//! let source = r#"
//! [[resources]]
//! name = "Prototype1"
//! permissions = { Create = false, Delete = false, List = true, Read = true, Update = true }
//! "#;
//! let schema = load(source, SchemaFormat::Toml).expect("valid schema");
//! assert_eq!(schema.resources.len(), 1);
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{LoadError, SchemaSemanticError, SchemaSyntaxError};
use crate::model::{
    Domain, EntityKey, FieldDefinition, PermissionRow, PermissionVerb, ResourceDefinition,
    Schema, FIELD_SEPARATOR, STANDARD_VERBS,
};

/// Source format of a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaFormat {
    /// TOML document.
    #[default]
    Toml,
    /// JSON document.
    Json,
}

impl SchemaFormat {
    /// Picks the format from a file extension (`.toml` or `.json`).
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "toml" => Some(SchemaFormat::Toml),
            "json" => Some(SchemaFormat::Json),
            _ => None,
        }
    }
}

impl fmt::Display for SchemaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SchemaFormat::Toml => "TOML",
            SchemaFormat::Json => "JSON",
        })
    }
}

impl std::str::FromStr for SchemaFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "toml" => Ok(SchemaFormat::Toml),
            "json" => Ok(SchemaFormat::Json),
            other => Err(format!("unknown schema format `{other}` (expected toml or json)")),
        }
    }
}

type RawRow = BTreeMap<String, bool>;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSchema {
    #[serde(default)]
    permissions: Option<Vec<String>>,
    #[serde(default)]
    domains: Vec<String>,
    #[serde(default)]
    resources: Vec<RawResource>,
    #[serde(default)]
    fields: Vec<RawDetachedField>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawResource {
    name: String,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    permissions: Option<RawRow>,
    #[serde(default)]
    fields: Vec<RawField>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawField {
    name: String,
    #[serde(default)]
    permissions: Option<RawRow>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDetachedField {
    resource: String,
    name: String,
    #[serde(default)]
    permissions: Option<RawRow>,
}

/// Parses `source` as `format` and checks it into a [`Schema`].
///
/// # Errors
///
/// Returns [`LoadError::Syntax`] if the source is malformed or carries unknown
/// keys, and [`LoadError::Semantic`] for the first identifier or verb rule
/// violation found.
pub fn load(source: &str, format: SchemaFormat) -> Result<Schema, LoadError> {
    let raw = parse(source, format)?;
    let schema = check(raw)?;
    debug!(
        format = %format,
        verbs = schema.verbs.len(),
        resources = schema.resources.len(),
        fields = schema.field_count(),
        "schema loaded"
    );
    Ok(schema)
}

fn parse(source: &str, format: SchemaFormat) -> Result<RawSchema, SchemaSyntaxError> {
    match format {
        SchemaFormat::Toml => toml::from_str(source).map_err(|e| {
            let (line, column) = match e.span() {
                Some(span) => {
                    let (line, column) = line_column(source, span.start);
                    (Some(line), Some(column))
                }
                None => (None, None),
            };
            SchemaSyntaxError {
                format,
                message: e.message().trim().to_string(),
                line,
                column,
            }
        }),
        SchemaFormat::Json => serde_json::from_str(source).map_err(|e| {
            let known = e.line() > 0;
            SchemaSyntaxError {
                format,
                message: strip_json_position(&e.to_string()),
                line: known.then(|| e.line()),
                column: known.then(|| e.column()),
            }
        }),
    }
}

/// Converts a byte offset into a 1-based (line, column) pair.
fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = source.get(..offset).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(nl) => offset - nl,
        None => offset + 1,
    };
    (line, column)
}

/// serde_json appends " at line L column C"; the position is carried separately.
fn strip_json_position(message: &str) -> String {
    match message.rfind(" at line ") {
        Some(idx) => message[..idx].to_string(),
        None => message.to_string(),
    }
}

fn check(raw: RawSchema) -> Result<Schema, SchemaSemanticError> {
    let verbs = check_verbs(raw.permissions)?;
    let domains = check_domains(raw.domains)?;

    let mut schema = Schema {
        verbs,
        domains,
        resources: Vec::with_capacity(raw.resources.len()),
    };

    let mut seen_resources = HashSet::new();
    for resource in raw.resources {
        check_identifier("resource", &resource.name)?;
        if !seen_resources.insert(resource.name.clone()) {
            return Err(SchemaSemanticError::DuplicateResource {
                resource: resource.name,
            });
        }

        let domain = match resource.domain {
            Some(domain) => {
                if !schema.domains.iter().any(|d| d.as_str() == domain) {
                    return Err(SchemaSemanticError::UndeclaredDomain {
                        resource: resource.name,
                        domain,
                    });
                }
                Some(Domain::new(domain))
            }
            None => None,
        };

        let permissions = resource
            .permissions
            .map(|row| check_row(&schema.verbs, &EntityKey::resource(&resource.name), row))
            .transpose()?;

        let mut definition = ResourceDefinition {
            id: resource.name,
            domain,
            permissions,
            fields: Vec::with_capacity(resource.fields.len()),
        };
        for field in resource.fields {
            add_field(&schema.verbs, &mut definition, field.name, field.permissions)?;
        }
        schema.resources.push(definition);
    }

    for detached in raw.fields {
        let resource = schema
            .resources
            .iter_mut()
            .find(|r| r.id == detached.resource)
            .ok_or_else(|| SchemaSemanticError::UnknownResource {
                resource: detached.resource.clone(),
                field: detached.name.clone(),
            })?;
        add_field(&schema.verbs, resource, detached.name, detached.permissions)?;
    }

    Ok(schema)
}

fn add_field(
    verbs: &[PermissionVerb],
    resource: &mut ResourceDefinition,
    name: String,
    permissions: Option<RawRow>,
) -> Result<(), SchemaSemanticError> {
    check_identifier("field", &name)?;
    if resource.find_field(&name).is_some() {
        return Err(SchemaSemanticError::DuplicateField {
            resource: resource.id.clone(),
            field: name,
        });
    }
    let permissions = permissions
        .map(|row| check_row(verbs, &EntityKey::field(&resource.id, &name), row))
        .transpose()?;
    resource.fields.push(FieldDefinition { name, permissions });
    Ok(())
}

fn check_verbs(declared: Option<Vec<String>>) -> Result<Vec<PermissionVerb>, SchemaSemanticError> {
    let declared = match declared {
        Some(verbs) => verbs,
        None => STANDARD_VERBS.iter().map(|v| (*v).to_string()).collect(),
    };
    if declared.is_empty() {
        return Err(SchemaSemanticError::NoVerbs);
    }

    let mut seen = HashSet::new();
    let mut verbs = Vec::with_capacity(declared.len());
    for verb in declared {
        check_identifier("verb", &verb)?;
        if !seen.insert(verb.clone()) {
            return Err(SchemaSemanticError::DuplicateVerb { verb });
        }
        verbs.push(PermissionVerb::new(verb));
    }
    Ok(verbs)
}

fn check_domains(declared: Vec<String>) -> Result<Vec<Domain>, SchemaSemanticError> {
    let mut seen = HashSet::new();
    let mut domains = Vec::with_capacity(declared.len());
    for domain in declared {
        check_identifier("domain", &domain)?;
        if !seen.insert(domain.clone()) {
            return Err(SchemaSemanticError::DuplicateDomain { domain });
        }
        domains.push(Domain::new(domain));
    }
    Ok(domains)
}

fn check_row(
    verbs: &[PermissionVerb],
    entity: &EntityKey,
    raw: RawRow,
) -> Result<PermissionRow, SchemaSemanticError> {
    let mut row = PermissionRow::new();
    for (verb, granted) in raw {
        if !verbs.iter().any(|v| v.as_str() == verb) {
            return Err(SchemaSemanticError::UndeclaredVerb {
                entity: entity.to_string(),
                verb,
            });
        }
        row.set(&verb, granted);
    }
    Ok(row)
}

/// Checks that `identifier` is usable as a constant name in every target.
///
/// Identifiers start with an ASCII letter. A leading underscore is refused:
/// `_` alone is not a nameable constant in Rust, and `_x_` style names are
/// reserved members of Python enums.
///
/// # Errors
///
/// Returns [`SchemaSemanticError::InvalidIdentifier`] describing the first rule broken.
pub fn check_identifier(kind: &'static str, identifier: &str) -> Result<(), SchemaSemanticError> {
    match identifier_defect(identifier) {
        None => Ok(()),
        Some(reason) => Err(SchemaSemanticError::InvalidIdentifier {
            kind,
            identifier: identifier.to_string(),
            reason,
        }),
    }
}

/// The first identifier rule `identifier` breaks, if any.
pub(crate) fn identifier_defect(identifier: &str) -> Option<&'static str> {
    let mut chars = identifier.chars();
    match chars.next() {
        None => return Some("must not be empty"),
        Some(c) if !c.is_ascii_alphabetic() => return Some("must start with an ASCII letter"),
        Some(_) => {}
    }
    if identifier.contains(FIELD_SEPARATOR) {
        return Some("must not contain `.`");
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Some("may only contain ASCII letters, digits and underscores");
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    const PROTOTYPE: &str = r#"
domains = ["global"]

[[resources]]
name = "Prototype1"
domain = "global"
permissions = { Create = true, Delete = true, List = false, Read = false, Update = false }

[[resources.fields]]
name = "id"
permissions = { Create = false, Delete = false, List = true, Read = true, Update = true }

[[fields]]
resource = "Prototype1"
name = "addr"
permissions = { Create = false, Delete = false, List = true, Read = true, Update = true }
"#;

    fn semantic(source: &str) -> SchemaSemanticError {
        match load(source, SchemaFormat::Toml) {
            Err(LoadError::Semantic(e)) => e,
            other => panic!("expected semantic error, got {other:?}"),
        }
    }

    #[test]
    fn loads_nested_and_detached_fields_in_order() {
        let schema = load(PROTOTYPE, SchemaFormat::Toml).unwrap();
        assert_eq!(schema.verbs.len(), 5);
        assert_eq!(schema.verbs[0].as_str(), "Create");
        let resource = &schema.resources[0];
        assert_eq!(resource.domain.as_ref().map(Domain::as_str), Some("global"));
        let names: Vec<&str> = resource.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "addr"]);
        // Field rows are taken as authored, not from the resource.
        assert_eq!(resource.permissions.as_ref().unwrap().get("Create"), Some(true));
        assert_eq!(resource.fields[0].permissions.as_ref().unwrap().get("Create"), Some(false));
    }

    #[test]
    fn json_source_matches_toml_source() {
        let json = r#"{
            "domains": ["global"],
            "resources": [{
                "name": "Prototype1",
                "domain": "global",
                "permissions": {"Create": true, "Delete": true, "List": false,
                                "Read": false, "Update": false},
                "fields": [{
                    "name": "id",
                    "permissions": {"Create": false, "Delete": false, "List": true,
                                    "Read": true, "Update": true}
                }]
            }],
            "fields": [{
                "resource": "Prototype1",
                "name": "addr",
                "permissions": {"Create": false, "Delete": false, "List": true,
                                "Read": true, "Update": true}
            }]
        }"#;
        assert_eq!(
            load(json, SchemaFormat::Json).unwrap(),
            load(PROTOTYPE, SchemaFormat::Toml).unwrap()
        );
    }

    #[test]
    fn custom_verbs_replace_the_standard_set() {
        let schema = load(
            r#"
permissions = ["Approve", "Read"]
[[resources]]
name = "Invoice"
permissions = { Approve = false, Read = true }
"#,
            SchemaFormat::Toml,
        )
        .unwrap();
        let verbs: Vec<&str> = schema.verbs.iter().map(PermissionVerb::as_str).collect();
        assert_eq!(verbs, vec!["Approve", "Read"]);
    }

    #[test]
    fn malformed_toml_is_a_syntax_error_with_position() {
        let err = load("[[resources]]\nname = ", SchemaFormat::Toml).unwrap_err();
        match err {
            LoadError::Syntax(e) => {
                assert_eq!(e.format, SchemaFormat::Toml);
                assert_eq!(e.line, Some(2));
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = load("[[resources]]\nname = \"A\"\ncolour = \"red\"\n", SchemaFormat::Toml)
            .unwrap_err();
        assert!(matches!(err, LoadError::Syntax(_)));
    }

    #[test]
    fn malformed_json_reports_line() {
        let err = load("{\n  \"resources\": [\n", SchemaFormat::Json).unwrap_err();
        match err {
            LoadError::Syntax(e) => {
                assert_eq!(e.format, SchemaFormat::Json);
                assert!(e.line.is_some());
                assert!(!e.message.contains(" at line "));
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_resource_is_rejected() {
        let err = semantic(
            "[[resources]]\nname = \"A\"\n[[resources]]\nname = \"A\"\n",
        );
        assert_eq!(
            err,
            SchemaSemanticError::DuplicateResource {
                resource: "A".to_string()
            }
        );
    }

    #[test]
    fn duplicate_field_is_rejected_across_nested_and_detached() {
        let err = semantic(
            "[[resources]]\nname = \"A\"\n[[resources.fields]]\nname = \"id\"\n\
             [[fields]]\nresource = \"A\"\nname = \"id\"\n",
        );
        assert_eq!(
            err,
            SchemaSemanticError::DuplicateField {
                resource: "A".to_string(),
                field: "id".to_string()
            }
        );
    }

    #[test]
    fn detached_field_must_reference_a_declared_resource() {
        let err = semantic("[[fields]]\nresource = \"Ghost\"\nname = \"id\"\n");
        assert_eq!(
            err,
            SchemaSemanticError::UnknownResource {
                resource: "Ghost".to_string(),
                field: "id".to_string()
            }
        );
    }

    #[test]
    fn row_with_undeclared_verb_is_rejected() {
        let err = semantic(
            "[[resources]]\nname = \"A\"\npermissions = { Create = true, Approve = true }\n",
        );
        assert_eq!(
            err,
            SchemaSemanticError::UndeclaredVerb {
                entity: "A".to_string(),
                verb: "Approve".to_string()
            }
        );
    }

    #[test]
    fn undeclared_domain_is_rejected() {
        let err = semantic("[[resources]]\nname = \"A\"\ndomain = \"tenant\"\n");
        assert!(matches!(err, SchemaSemanticError::UndeclaredDomain { .. }));
    }

    #[test]
    fn duplicate_and_empty_verb_sets_are_rejected() {
        assert_eq!(semantic("permissions = []\n"), SchemaSemanticError::NoVerbs);
        assert_eq!(
            semantic("permissions = [\"Read\", \"Read\"]\n"),
            SchemaSemanticError::DuplicateVerb {
                verb: "Read".to_string()
            }
        );
    }

    #[test]
    fn dotted_identifiers_are_rejected() {
        let err = semantic("[[resources]]\nname = \"A.b\"\n");
        assert!(matches!(
            err,
            SchemaSemanticError::InvalidIdentifier {
                kind: "resource",
                ..
            }
        ));
        assert!(check_identifier("field", "1st").is_err());
        assert!(check_identifier("field", "with-dash").is_err());
        assert!(check_identifier("field", "private_2_").is_ok());
    }

    #[test]
    fn leading_underscore_is_rejected() {
        let err = semantic("[[resources]]\nname = \"_\"\n");
        assert_eq!(
            err,
            SchemaSemanticError::InvalidIdentifier {
                kind: "resource",
                identifier: "_".to_string(),
                reason: "must start with an ASCII letter",
            }
        );
        let source = "[[resources]]\nname = \"Socket\"\n\n[[resources.fields]]\nname = \"_x_\"\n";
        assert!(matches!(
            semantic(source),
            SchemaSemanticError::InvalidIdentifier { kind: "field", .. }
        ));
    }

    #[test]
    fn format_from_path() {
        assert_eq!(
            SchemaFormat::from_path(Path::new("perms.json")),
            Some(SchemaFormat::Json)
        );
        assert_eq!(
            SchemaFormat::from_path(Path::new("perms.toml")),
            Some(SchemaFormat::Toml)
        );
        assert_eq!(SchemaFormat::from_path(Path::new("perms.yaml")), None);
    }
}
