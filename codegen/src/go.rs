//! Go emitter.
//!
//! Produces a single gofmt-formatted file: typed string constants for verbs,
//! domains, resources and fields, a `map[Resource]map[Permission]bool`, and a
//! `RequiresPermission` that returns an error for an absent pair.

use std::fmt::Write as FmtWrite;

use crate::emit::{pad, SourceFile};
use crate::mapping::to_pascal_case;
use crate::plan::{EmitPlan, NamedConstant};

/// Go scope shared by every exported constant.
const PACKAGE_SCOPE: &str = "<package>";

/// Name of the `Permission` constant for `verb`.
#[must_use]
pub fn permission_const(verb: &str) -> String {
    format!("Permission{}", to_pascal_case(verb))
}

/// Name of the `Domain` constant for `domain`.
#[must_use]
pub fn domain_const(domain: &str) -> String {
    format!("Domain{}", to_pascal_case(domain))
}

/// Name of the `Resource` constant for `resource`.
#[must_use]
pub fn resource_const(resource: &str) -> String {
    format!("Resource{}", to_pascal_case(resource))
}

/// Name of the `Resource` constant for `resource.field`.
#[must_use]
pub fn field_const(resource: &str, field: &str) -> String {
    format!("Field{}{}", to_pascal_case(resource), to_pascal_case(field))
}

/// Writes a `const ( … )` block with names padded to a common width.
fn const_block(f: &mut SourceFile, type_name: &str, entries: &[(String, &str)]) {
    let width = entries.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    f.line("const (");
    for (name, value) in entries {
        let _ = writeln!(f.buf, "\t{} {type_name} = \"{value}\"", pad(name, width));
    }
    f.line(")");
    f.blank();
}

/// Renders `plan` as a Go source file in package `package`.
#[must_use]
pub fn emit(plan: &EmitPlan<'_>, package: &str) -> String {
    let mut f = SourceFile::new("//");
    f.blank();
    let _ = writeln!(f.buf, "package {package}");
    f.blank();
    f.line("import \"fmt\"");
    f.blank();

    f.line("// Permission is a permission verb.");
    f.line("type Permission string");
    f.blank();
    let verbs: Vec<(String, &str)> = plan
        .verbs
        .iter()
        .map(|v| (permission_const(v.as_str()), v.as_str()))
        .collect();
    const_block(&mut f, "Permission", &verbs);

    if !plan.domains.is_empty() {
        f.line("// Domain scopes where a resource applies.");
        f.line("type Domain string");
        f.blank();
        let domains: Vec<(String, &str)> = plan
            .domains
            .iter()
            .map(|d| (domain_const(d.as_str()), d.as_str()))
            .collect();
        const_block(&mut f, "Domain", &domains);
    }

    f.line("// Resource identifies a resource or one of its fields.");
    f.line("type Resource string");
    f.blank();
    let resources: Vec<(String, &str)> = plan
        .resources
        .iter()
        .map(|r| (resource_const(r.id), r.id))
        .collect();
    const_block(&mut f, "Resource", &resources);

    for resource in plan.resources_with_fields() {
        f.comment("", &format!("Fields of {}.", resource.id));
        let fields: Vec<(String, &str)> = resource
            .fields
            .iter()
            .map(|field| (field_const(resource.id, field.name), field.key.as_str()))
            .collect();
        const_block(&mut f, "Resource", &fields);
    }

    let verb_width = verbs.iter().map(|(name, _)| name.len() + 1).max().unwrap_or(0);
    f.line("var mappings = map[Resource]map[Permission]bool{");
    for entry in plan.entries() {
        let key = match entry.field {
            None => resource_const(entry.resource),
            Some(field) => field_const(entry.resource, field),
        };
        let _ = writeln!(f.buf, "\t{key}: {{");
        for ((name, _), granted) in verbs.iter().zip(entry.decisions) {
            let _ = writeln!(f.buf, "\t\t{} {granted},", pad(&format!("{name}:"), verb_width));
        }
        f.line("\t},");
    }
    f.line("}");
    f.blank();

    f.line("// RequiresPermission reports whether permission is granted on resource.");
    f.line("// It returns an error if the resource or the permission is not in the table.");
    f.line("func RequiresPermission(resource Resource, permission Permission) (bool, error) {");
    f.line("\tperms, ok := mappings[resource]");
    f.line("\tif !ok {");
    f.line("\t\treturn false, fmt.Errorf(\"unknown resource %q\", resource)");
    f.line("\t}");
    f.line("\tgranted, ok := perms[permission]");
    f.line("\tif !ok {");
    f.line(
        "\t\treturn false, fmt.Errorf(\"unknown permission %q for resource %q\", \
         permission, resource)",
    );
    f.line("\t}");
    f.blank();
    f.line("\treturn granted, nil");
    f.line("}");

    f.finish()
}

/// Every exported constant the Go output declares. All share package scope.
#[must_use]
pub fn constant_names(plan: &EmitPlan<'_>) -> Vec<NamedConstant> {
    let mut names = Vec::new();
    for verb in plan.verbs {
        let name = permission_const(verb.as_str());
        names.push(NamedConstant::new(PACKAGE_SCOPE, name, verb.as_str()));
    }
    for domain in plan.domains {
        let name = domain_const(domain.as_str());
        names.push(NamedConstant::new(PACKAGE_SCOPE, name, domain.as_str()));
    }
    for entry in plan.entries() {
        let name = match entry.field {
            None => resource_const(entry.resource),
            Some(field) => field_const(entry.resource, field),
        };
        names.push(NamedConstant::new(PACKAGE_SCOPE, name, entry.key.as_str()));
    }
    names
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use permatrix_spec::{compile, FieldDefinition, PermissionRow, ResourceDefinition, Schema};

    #[test]
    fn renders_aligned_constants_and_map() {
        let schema = Schema::new(["List", "Update"]).with_resource(
            ResourceDefinition::new(
                "Prototype2",
                PermissionRow::new().with("List", true).with("Update", true),
            )
            .with_field(FieldDefinition::new(
                "sockopt",
                PermissionRow::new().with("List", true).with("Update", false),
            )),
        );
        let validated = compile(&schema).unwrap();
        let out = emit(&EmitPlan::new(&validated), "permissions");

        assert!(out.starts_with(
            "// Code generated by permatrix. DO NOT EDIT.\n\npackage permissions\n\n\
             import \"fmt\"\n"
        ));
        assert!(out.contains(
            "const (\n\tPermissionList   Permission = \"List\"\n\
             \tPermissionUpdate Permission = \"Update\"\n)\n"
        ));
        assert!(out.contains("\tResourcePrototype2 Resource = \"Prototype2\"\n"));
        assert!(out.contains(
            "// Fields of Prototype2.\nconst (\n\
             \tFieldPrototype2Sockopt Resource = \"Prototype2.sockopt\"\n)\n"
        ));
        assert!(out.contains(
            "\tFieldPrototype2Sockopt: {\n\t\tPermissionList:   true,\n\
             \t\tPermissionUpdate: false,\n\t},\n"
        ));
        assert!(out.contains(
            "func RequiresPermission(resource Resource, permission Permission) (bool, error) {"
        ));
        assert!(!out.contains("type Domain string"));
    }

    #[test]
    fn names_are_pascal_cased() {
        assert_eq!(permission_const("read"), "PermissionRead");
        assert_eq!(resource_const("user_profile"), "ResourceUserProfile");
        assert_eq!(field_const("UserProfile", "display_name"), "FieldUserProfileDisplayName");
        assert_eq!(domain_const("global"), "DomainGlobal");
    }
}
