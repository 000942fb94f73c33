//! Python emitter.
//!
//! Verbs, domains, resources, and each resource's fields become `str` enums.
//! `MAPPINGS` is keyed by the plain string values, and `requires_permission`
//! raises `KeyError` for an absent pair.

use std::fmt::Write as FmtWrite;

use crate::emit::SourceFile;
use crate::mapping::{escape_reserved, to_pascal_case, to_screaming_snake_case, PYTHON_RESERVED};
use crate::plan::{EmitPlan, NamedConstant};

/// Name of the enum member for a verb, domain, resource or field identifier.
#[must_use]
pub fn member_name(identifier: &str) -> String {
    to_screaming_snake_case(identifier)
}

/// Name of the field enum class for `resource`.
#[must_use]
pub fn field_class_name(resource: &str) -> String {
    escape_reserved(to_pascal_case(resource), PYTHON_RESERVED)
}

fn enum_class<'v>(
    f: &mut SourceFile,
    name: &str,
    members: impl IntoIterator<Item = (String, &'v str)>,
) {
    f.blank();
    f.blank();
    let _ = writeln!(f.buf, "class {name}(str, Enum):");
    let mut empty = true;
    for (member, value) in members {
        let _ = writeln!(f.buf, "    {member} = \"{value}\"");
        empty = false;
    }
    if empty {
        f.line("    pass");
    }
}

/// Renders `plan` as a Python module.
#[must_use]
pub fn emit(plan: &EmitPlan<'_>) -> String {
    let mut f = SourceFile::new("#");
    f.blank();
    f.line("from enum import Enum");
    f.line("from typing import Mapping, Union");

    enum_class(
        &mut f,
        "Permission",
        plan.verbs.iter().map(|v| (member_name(v.as_str()), v.as_str())),
    );
    if !plan.domains.is_empty() {
        enum_class(
            &mut f,
            "Domain",
            plan.domains.iter().map(|d| (member_name(d.as_str()), d.as_str())),
        );
    }
    enum_class(
        &mut f,
        "Resource",
        plan.resources.iter().map(|r| (member_name(r.id), r.id)),
    );
    for resource in plan.resources_with_fields() {
        enum_class(
            &mut f,
            &field_class_name(resource.id),
            resource
                .fields
                .iter()
                .map(|field| (member_name(field.name), field.key.as_str())),
        );
    }

    f.blank();
    f.blank();
    f.line("MAPPINGS: Mapping[str, Mapping[str, bool]] = {");
    for entry in plan.entries() {
        match entry.field {
            None => {
                let _ = writeln!(f.buf, "    Resource.{}.value: {{", member_name(entry.resource));
            }
            Some(field) => {
                let _ = writeln!(
                    f.buf,
                    "    {}.{}.value: {{",
                    field_class_name(entry.resource),
                    member_name(field)
                );
            }
        }
        for (verb, granted) in plan.grants(entry.decisions) {
            let literal = if granted { "True" } else { "False" };
            let member = member_name(verb.as_str());
            let _ = writeln!(f.buf, "        Permission.{member}.value: {literal},");
        }
        f.line("    },");
    }
    f.line("}");
    f.blank();
    f.blank();

    f.line(
        "def requires_permission(\
         resource: Union[str, Enum], permission: Union[str, Permission]) -> bool:",
    );
    f.line("    \"\"\"Return whether ``permission`` is granted on ``resource``.");
    f.blank();
    f.line("    Raises ``KeyError`` if the resource or the permission is not in the table.");
    f.line("    \"\"\"");
    f.line("    resource_key = resource.value if isinstance(resource, Enum) else resource");
    f.line("    permission_key = permission.value if isinstance(permission, Enum) else permission");
    f.line("    return MAPPINGS[resource_key][permission_key]");

    f.finish()
}

/// Every class and member name the Python output declares.
#[must_use]
pub fn constant_names(plan: &EmitPlan<'_>) -> Vec<NamedConstant> {
    let mut names = Vec::new();
    for verb in plan.verbs {
        let member = member_name(verb.as_str());
        names.push(NamedConstant::new("Permission", member, verb.as_str()));
    }
    for domain in plan.domains {
        names.push(NamedConstant::new("Domain", member_name(domain.as_str()), domain.as_str()));
    }
    for resource in &plan.resources {
        names.push(NamedConstant::new("Resource", member_name(resource.id), resource.id));
    }
    for resource in plan.resources_with_fields() {
        let class = field_class_name(resource.id);
        names.push(NamedConstant::new("<module>", class.clone(), resource.id));
        for field in &resource.fields {
            let member = member_name(field.name);
            names.push(NamedConstant::new(class.clone(), member, field.key.as_str()));
        }
    }
    names
}
