//! Core schema model types.
//!
//! These types represent a permission schema as typed Rust data: the declared
//! permission verbs, optional domains, and the resources with the fields they
//! own. Instances are created once (by the [loader](crate::loader) or by hand)
//! and treated as immutable afterwards.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// The permission verbs used when a schema does not declare its own set.
///
/// Alphabetical, matching the order generated tables list them in.
pub const STANDARD_VERBS: [&str; 5] = ["Create", "Delete", "List", "Read", "Update"];

/// Separator between a resource identifier and a field's local name.
pub const FIELD_SEPARATOR: char = '.';

/// A permission verb (e.g. `Create`, `Read`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PermissionVerb(String);

impl PermissionVerb {
    /// Creates a verb from its identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the verb identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PermissionVerb {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PermissionVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A domain scoping where a resource applies (e.g. `global`, `tenant`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Domain(String);

impl Domain {
    /// Creates a domain from its identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the domain identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An authored permission row: verb → granted.
///
/// A row may be partial while it is still part of the schema; the matrix
/// builder refuses to expand a row that misses a declared verb.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionRow {
    grants: BTreeMap<PermissionVerb, bool>,
}

impl PermissionRow {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the row with `verb` set to `granted`.
    #[must_use]
    pub fn with(mut self, verb: &str, granted: bool) -> Self {
        self.set(verb, granted);
        self
    }

    /// Sets `verb` to `granted`, replacing any earlier entry.
    pub fn set(&mut self, verb: &str, granted: bool) {
        self.grants.insert(PermissionVerb::new(verb), granted);
    }

    /// Removes the entry for `verb`, returning it if present.
    pub fn remove(&mut self, verb: &str) -> Option<bool> {
        self.grants.remove(verb)
    }

    /// Looks up the authored value for `verb`. `None` means the verb was not authored.
    #[must_use]
    pub fn get(&self, verb: &str) -> Option<bool> {
        self.grants.get(verb).copied()
    }

    /// Iterates authored entries in verb order.
    pub fn iter(&self) -> impl Iterator<Item = (&PermissionVerb, bool)> {
        self.grants.iter().map(|(verb, granted)| (verb, *granted))
    }

    /// Number of authored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    /// Returns true if nothing has been authored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, bool)> for PermissionRow {
    fn from_iter<I: IntoIterator<Item = (&'a str, bool)>>(iter: I) -> Self {
        let mut row = PermissionRow::new();
        for (verb, granted) in iter {
            row.set(verb, granted);
        }
        row
    }
}

/// A field owned by exactly one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    /// Local name, unique within the owning resource (e.g. `"id"`).
    pub name: String,
    /// The field's own row. Never inherited from the owning resource.
    pub permissions: Option<PermissionRow>,
}

impl FieldDefinition {
    /// Creates a field with an authored row.
    pub fn new(name: impl Into<String>, permissions: PermissionRow) -> Self {
        Self {
            name: name.into(),
            permissions: Some(permissions),
        }
    }

    /// Creates a field with no authored row.
    pub fn without_row(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permissions: None,
        }
    }
}

/// A named top-level resource and the fields it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDefinition {
    /// Resource identifier (e.g. `"Prototype1"`).
    pub id: String,
    /// Domain scoping this resource, or `None` if domain-agnostic.
    pub domain: Option<Domain>,
    /// Default row for the resource itself.
    pub permissions: Option<PermissionRow>,
    /// Owned fields in declaration order.
    pub fields: Vec<FieldDefinition>,
}

impl ResourceDefinition {
    /// Creates a resource with a default row and no fields.
    pub fn new(id: impl Into<String>, permissions: PermissionRow) -> Self {
        Self {
            id: id.into(),
            domain: None,
            permissions: Some(permissions),
            fields: Vec::new(),
        }
    }

    /// Returns the resource scoped to `domain`.
    #[must_use]
    pub fn in_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(Domain::new(domain));
        self
    }

    /// Returns the resource with `field` appended.
    #[must_use]
    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    /// Looks up an owned field by local name.
    #[must_use]
    pub fn find_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A flat, namespaced matrix key: `Resource` or `Resource.field`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EntityKey(String);

impl EntityKey {
    /// Key of a resource row.
    pub fn resource(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Key of a field row, namespaced by its owning resource.
    pub fn field(resource: &str, field: &str) -> Self {
        Self(format!("{resource}{FIELD_SEPARATOR}{field}"))
    }

    /// Returns the key as written in generated tables.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits the key into resource and optional field local name.
    ///
    /// Splits on the first separator, so a malformed key with more than one
    /// separator keeps the remainder in the field part.
    #[must_use]
    pub fn split(&self) -> (&str, Option<&str>) {
        match self.0.split_once(FIELD_SEPARATOR) {
            Some((resource, field)) => (resource, Some(field)),
            None => (&self.0, None),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a matrix entity is a resource or one of its fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityKind {
    /// A top-level resource.
    Resource,
    /// A field owned by `resource`.
    Field {
        /// Owning resource identifier.
        resource: String,
        /// Local field name.
        field: String,
    },
}

impl EntityKind {
    /// Short label used in diagnostics.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Resource => "resource",
            EntityKind::Field { .. } => "field",
        }
    }
}

/// One entity of the schema as walked in declaration order.
#[derive(Debug, Clone, Copy)]
pub struct EntityRef<'a> {
    /// The owning resource (the resource itself for resource entities).
    pub resource: &'a ResourceDefinition,
    /// The field, for field entities.
    pub field: Option<&'a FieldDefinition>,
}

impl<'a> EntityRef<'a> {
    /// Flat matrix key of this entity.
    #[must_use]
    pub fn key(&self) -> EntityKey {
        match self.field {
            Some(field) => EntityKey::field(&self.resource.id, &field.name),
            None => EntityKey::resource(&self.resource.id),
        }
    }

    /// Kind of this entity.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self.field {
            Some(field) => EntityKind::Field {
                resource: self.resource.id.clone(),
                field: field.name.clone(),
            },
            None => EntityKind::Resource,
        }
    }

    /// The row authored for this entity, if any.
    #[must_use]
    pub fn permissions(&self) -> Option<&'a PermissionRow> {
        match self.field {
            Some(field) => field.permissions.as_ref(),
            None => self.resource.permissions.as_ref(),
        }
    }
}

/// A complete permission schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Declared permission verbs, in emission order.
    pub verbs: Vec<PermissionVerb>,
    /// Declared domains, in emission order.
    pub domains: Vec<Domain>,
    /// Resources in declaration order.
    pub resources: Vec<ResourceDefinition>,
}

impl Schema {
    /// Creates an empty schema over the given verbs.
    pub fn new<I, S>(verbs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            verbs: verbs.into_iter().map(PermissionVerb::new).collect(),
            domains: Vec::new(),
            resources: Vec::new(),
        }
    }

    /// Creates an empty schema over [`STANDARD_VERBS`].
    #[must_use]
    pub fn standard() -> Self {
        Self::new(STANDARD_VERBS)
    }

    /// Returns the schema with `domain` declared.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domains.push(Domain::new(domain));
        self
    }

    /// Returns the schema with `resource` appended.
    #[must_use]
    pub fn with_resource(mut self, resource: ResourceDefinition) -> Self {
        self.resources.push(resource);
        self
    }

    /// Looks up a resource by identifier.
    #[must_use]
    pub fn find_resource(&self, id: &str) -> Option<&ResourceDefinition> {
        self.resources.iter().find(|r| r.id == id)
    }

    /// Returns true if `verb` is declared.
    #[must_use]
    pub fn declares_verb(&self, verb: &str) -> bool {
        self.verbs.iter().any(|v| v.as_str() == verb)
    }

    /// Walks every entity: each resource followed by its fields, in declaration order.
    pub fn entities(&self) -> impl Iterator<Item = EntityRef<'_>> {
        self.resources.iter().flat_map(|resource| {
            std::iter::once(EntityRef {
                resource,
                field: None,
            })
            .chain(resource.fields.iter().map(move |field| EntityRef {
                resource,
                field: Some(field),
            }))
        })
    }

    /// Total number of entities (resources plus fields).
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.resources.iter().map(|r| 1 + r.fields.len()).sum()
    }

    /// Total number of fields across all resources.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.resources.iter().map(|r| r.fields.len()).sum()
    }
}
