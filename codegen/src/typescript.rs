//! TypeScript emitter.
//!
//! Verbs, domains and resources become string enums; each resource with
//! fields gets its own enum whose members carry the namespaced key. The
//! lookup takes enum-typed keys, so an absent entity or verb is a type error.
//! In enums-only mode the file stops after the enums, for clients that gate
//! on names but fetch decisions elsewhere.

use std::fmt::Write as FmtWrite;

use crate::emit::SourceFile;
use crate::mapping::{escape_reserved, TYPESCRIPT_RESERVED};
use crate::plan::{EmitPlan, NamedConstant};

/// Name of the field enum for `resource`.
#[must_use]
pub fn field_enum_name(resource: &str) -> String {
    escape_reserved(resource.to_string(), TYPESCRIPT_RESERVED)
}

/// Renders `plan` as a TypeScript module, or only its enums if `enums_only`.
#[must_use]
pub fn emit(plan: &EmitPlan<'_>, enums_only: bool) -> String {
    let mut f = SourceFile::new("//");

    f.line("export enum Permissions {");
    for verb in plan.verbs {
        let _ = writeln!(f.buf, "  {verb} = '{verb}',");
    }
    f.line("}");
    f.blank();

    if !plan.domains.is_empty() {
        f.line("export enum Domains {");
        for domain in plan.domains {
            let _ = writeln!(f.buf, "  {domain} = '{domain}',");
        }
        f.line("}");
        f.blank();
    }

    f.line("export enum Resources {");
    for resource in &plan.resources {
        let _ = writeln!(f.buf, "  {id} = '{id}',", id = resource.id);
    }
    f.line("}");
    f.blank();

    let mut union = vec!["Resources".to_string()];
    for resource in plan.resources_with_fields() {
        let name = field_enum_name(resource.id);
        let _ = writeln!(f.buf, "export enum {name} {{");
        for field in &resource.fields {
            let _ = writeln!(f.buf, "  {} = '{}',", field.name, field.key);
        }
        f.line("}");
        f.blank();
        union.push(name);
    }
    if enums_only {
        return f.finish();
    }

    let _ = writeln!(f.buf, "type AllResources = {};", union.join(" | "));
    f.line("type PermissionResources = Record<Permissions, boolean>;");
    f.line("type PermissionMappings = Record<AllResources, PermissionResources>;");
    f.blank();

    f.line("const Mappings: PermissionMappings = {");
    for entry in plan.entries() {
        match entry.field {
            None => {
                let _ = writeln!(f.buf, "  [Resources.{}]: {{", entry.resource);
            }
            Some(field) => {
                let _ = writeln!(f.buf, "  [{}.{field}]: {{", field_enum_name(entry.resource));
            }
        }
        for (verb, granted) in plan.grants(entry.decisions) {
            let _ = writeln!(f.buf, "    [Permissions.{verb}]: {granted},");
        }
        f.line("  },");
    }
    f.line("};");
    f.blank();

    f.line(
        "export function requiresPermission(\
         resource: AllResources, permission: Permissions): boolean {",
    );
    f.line("  return Mappings[resource][permission];");
    f.line("}");

    f.finish()
}

/// Every enum member the TypeScript output declares.
#[must_use]
pub fn constant_names(plan: &EmitPlan<'_>) -> Vec<NamedConstant> {
    let mut names = Vec::new();
    for verb in plan.verbs {
        names.push(NamedConstant::new("Permissions", verb.as_str(), verb.as_str()));
    }
    for domain in plan.domains {
        names.push(NamedConstant::new("Domains", domain.as_str(), domain.as_str()));
    }
    for resource in &plan.resources {
        names.push(NamedConstant::new("Resources", resource.id, resource.id));
    }
    for resource in plan.resources_with_fields() {
        let scope = field_enum_name(resource.id);
        // Field enums share the module scope with each other.
        names.push(NamedConstant::new("<module>", scope.clone(), resource.id));
        for field in &resource.fields {
            names.push(NamedConstant::new(scope.clone(), field.name, field.key.as_str()));
        }
    }
    names
}
