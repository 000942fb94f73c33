//! The canonical emission sequence.
//!
//! Every emitter is a template over one [`EmitPlan`]: the declared verbs, the
//! declared domains, and the resources with their fields, in declaration
//! order, each carrying its decisions aligned to the verbs. Emitters never
//! walk the schema or the matrix themselves, so every target renders the
//! same identifiers in the same order.

use permatrix_spec::{Domain, EntityKey, EntityKind, PermissionVerb, ValidatedMatrix};
use tracing::warn;

/// A field row in emission order.
#[derive(Debug, Clone, Copy)]
pub struct PlannedField<'a> {
    /// Local field name.
    pub name: &'a str,
    /// Namespaced key `resource.field`.
    pub key: &'a EntityKey,
    /// One decision per verb, in verb order.
    pub decisions: &'a [bool],
}

/// A resource row and its field rows in emission order.
#[derive(Debug, Clone)]
pub struct PlannedResource<'a> {
    /// Resource identifier (also its key).
    pub id: &'a str,
    /// Flat key.
    pub key: &'a EntityKey,
    /// Owning domain.
    pub domain: Option<&'a Domain>,
    /// One decision per verb, in verb order.
    pub decisions: &'a [bool],
    /// Fields in declaration order.
    pub fields: Vec<PlannedField<'a>>,
}

/// One (key, decisions) entry of the flat table.
#[derive(Debug, Clone, Copy)]
pub struct PlanEntry<'a> {
    /// Flat key.
    pub key: &'a EntityKey,
    /// Owning resource identifier.
    pub resource: &'a str,
    /// Local field name, for field rows.
    pub field: Option<&'a str>,
    /// One decision per verb, in verb order.
    pub decisions: &'a [bool],
}

/// The shared canonical sequence all emitters render.
#[derive(Debug, Clone)]
pub struct EmitPlan<'a> {
    /// Declared verbs.
    pub verbs: &'a [PermissionVerb],
    /// Declared domains.
    pub domains: &'a [Domain],
    /// Resources in declaration order.
    pub resources: Vec<PlannedResource<'a>>,
}

impl<'a> EmitPlan<'a> {
    /// Builds the plan for a validated matrix.
    #[must_use]
    pub fn new(validated: &'a ValidatedMatrix<'_>) -> Self {
        let mut resources: Vec<PlannedResource<'a>> = Vec::new();
        for row in validated.decision_rows() {
            match &row.kind {
                EntityKind::Resource => resources.push(PlannedResource {
                    id: row.key.as_str(),
                    key: &row.key,
                    domain: row.domain.as_ref(),
                    decisions: &row.decisions,
                    fields: Vec::new(),
                }),
                EntityKind::Field { resource, field } => {
                    match resources.iter_mut().rev().find(|r| r.id == resource.as_str()) {
                        Some(owner) => owner.fields.push(PlannedField {
                            name: field,
                            key: &row.key,
                            decisions: &row.decisions,
                        }),
                        None => warn!(key = %row.key, "field row precedes its resource; skipped"),
                    }
                }
            }
        }

        Self {
            verbs: validated.verbs(),
            domains: &validated.schema().domains,
            resources,
        }
    }

    /// Walks every entry: each resource followed by its fields.
    pub fn entries(&self) -> impl Iterator<Item = PlanEntry<'a>> + '_ {
        self.resources.iter().flat_map(|resource| {
            std::iter::once(PlanEntry {
                key: resource.key,
                resource: resource.id,
                field: None,
                decisions: resource.decisions,
            })
            .chain(resource.fields.iter().map(move |field| PlanEntry {
                key: field.key,
                resource: resource.id,
                field: Some(field.name),
                decisions: field.decisions,
            }))
        })
    }

    /// Pairs each verb with the decision at the same position.
    pub fn grants(
        &self,
        decisions: &'a [bool],
    ) -> impl Iterator<Item = (&'a PermissionVerb, bool)> {
        self.verbs.iter().zip(decisions.iter().copied())
    }

    /// Resources that own at least one field.
    pub fn resources_with_fields(&self) -> impl Iterator<Item = &PlannedResource<'a>> {
        self.resources.iter().filter(|r| !r.fields.is_empty())
    }
}

/// A constant an emitter declares: which scope it lives in, its name, and the
/// string it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedConstant {
    /// Scope the name must be unique in (enum, module, class, or package).
    pub scope: String,
    /// Declared name.
    pub name: String,
    /// The schema identifier it encodes.
    pub value: String,
}

impl NamedConstant {
    pub(crate) fn new(
        scope: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            scope: scope.into(),
            name: name.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use permatrix_spec::{compile, FieldDefinition, PermissionRow, ResourceDefinition, Schema};

    #[test]
    fn plan_groups_fields_under_resources_in_order() {
        let row = |g| PermissionRow::new().with("Read", g);
        let schema = Schema::new(["Read"])
            .with_resource(
                ResourceDefinition::new("B", row(false))
                    .with_field(FieldDefinition::new("y", row(true)))
                    .with_field(FieldDefinition::new("x", row(false))),
            )
            .with_resource(ResourceDefinition::new("A", row(true)));
        let validated = compile(&schema).unwrap();
        let plan = EmitPlan::new(&validated);

        assert_eq!(plan.resources.len(), 2);
        assert_eq!(plan.resources[0].fields.len(), 2);
        let keys: Vec<&str> = plan.entries().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["B", "B.y", "B.x", "A"]);
        assert_eq!(plan.resources_with_fields().count(), 1);

        let entry = plan.entries().nth(1).unwrap();
        let grants: Vec<(&str, bool)> = plan
            .grants(entry.decisions)
            .map(|(v, g)| (v.as_str(), g))
            .collect();
        assert_eq!(grants, vec![("Read", true)]);
    }
}
