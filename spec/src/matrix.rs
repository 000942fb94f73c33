//! Matrix builder: expands a [`Schema`] into a flat [`PermissionMatrix`].
//!
//! Every resource contributes one row keyed by its identifier, and every field
//! one row keyed by `resource.field`. A field row is copied from the field's
//! own authored row; nothing is inherited from or merged with the owning
//! resource. Rows appear in declaration order, which is the order every
//! emitter renders them in.

use serde::Serialize;
use tracing::debug;

use crate::error::IncompleteRowError;
use crate::model::{Domain, EntityKey, EntityKind, PermissionVerb, Schema};

/// One expanded matrix row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixRow {
    /// Flat namespaced key.
    pub key: EntityKey,
    /// Resource or field.
    #[serde(flatten)]
    pub kind: EntityKind,
    /// Domain of the owning resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,
    /// Verb → granted, declared verbs first in declaration order.
    pub grants: Vec<(PermissionVerb, bool)>,
}

impl MatrixRow {
    /// Looks up the decision for `verb` in this row.
    #[must_use]
    pub fn grant(&self, verb: &str) -> Option<bool> {
        self.grants
            .iter()
            .find(|(v, _)| v.as_str() == verb)
            .map(|(_, granted)| *granted)
    }
}

/// The fully expanded (entity × verb) → bool table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionMatrix {
    verbs: Vec<PermissionVerb>,
    rows: Vec<MatrixRow>,
}

impl PermissionMatrix {
    /// Assembles a matrix from pre-built rows without any checking.
    ///
    /// Use [`validate`](crate::validate::validate) before trusting the result.
    #[must_use]
    pub fn from_rows(verbs: Vec<PermissionVerb>, rows: Vec<MatrixRow>) -> Self {
        Self { verbs, rows }
    }

    /// The verb set the matrix was built over.
    #[must_use]
    pub fn verbs(&self) -> &[PermissionVerb] {
        &self.verbs
    }

    /// All rows in declaration order.
    #[must_use]
    pub fn rows(&self) -> &[MatrixRow] {
        &self.rows
    }

    /// Looks up the first row with `key`.
    #[must_use]
    pub fn row(&self, key: &str) -> Option<&MatrixRow> {
        self.rows.iter().find(|r| r.key.as_str() == key)
    }

    /// Reference lookup: the decision for (`entity`, `verb`), or `None` if absent.
    #[must_use]
    pub fn requires_permission(&self, entity: &str, verb: &str) -> Option<bool> {
        self.row(entity)?.grant(verb)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the matrix has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Expands `schema` into a permission matrix.
///
/// # Errors
///
/// Returns [`IncompleteRowError`] for the first entity, in declaration order,
/// whose row is absent or lacks a declared verb. Unset verbs are never
/// defaulted to `false`.
pub fn build(schema: &Schema) -> Result<PermissionMatrix, IncompleteRowError> {
    let mut rows = Vec::with_capacity(schema.entity_count());

    for entity in schema.entities() {
        let key = entity.key();
        let Some(authored) = entity.permissions() else {
            return Err(IncompleteRowError {
                entity: key.to_string(),
                missing: schema.verbs.clone(),
            });
        };

        let mut grants = Vec::with_capacity(schema.verbs.len());
        let mut missing = Vec::new();
        for verb in &schema.verbs {
            match authored.get(verb.as_str()) {
                Some(granted) => grants.push((verb.clone(), granted)),
                None => missing.push(verb.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(IncompleteRowError {
                entity: key.to_string(),
                missing,
            });
        }

        // Undeclared verbs only reach here from hand-built schemas; carry them
        // through so the validator reports them.
        for (verb, granted) in authored.iter() {
            if !schema.declares_verb(verb.as_str()) {
                grants.push((verb.clone(), granted));
            }
        }

        rows.push(MatrixRow {
            key,
            kind: entity.kind(),
            domain: entity.resource.domain.clone(),
            grants,
        });
    }

    debug!(rows = rows.len(), verbs = schema.verbs.len(), "permission matrix built");
    Ok(PermissionMatrix {
        verbs: schema.verbs.clone(),
        rows,
    })
}
