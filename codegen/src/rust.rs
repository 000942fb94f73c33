//! Rust emitter.
//!
//! Verbs become a `Permission` enum; domain, resource and field identifiers
//! become `&str` constants in `domains`, `resources` and one module per
//! resource with fields. The lookup returns `None` for an absent pair.

use std::fmt::Write as FmtWrite;

use crate::emit::SourceFile;
use crate::mapping::{
    escape_reserved, to_pascal_case, to_screaming_snake_case, to_snake_case, RUST_KEYWORDS,
};
use crate::plan::{EmitPlan, NamedConstant};

/// Modules the emitter itself declares.
const RESERVED_MODULES: &[&str] = &["domains", "resources", "requires_permission"];

/// Name of the `Permission` variant for `verb`.
#[must_use]
pub fn variant_name(verb: &str) -> String {
    escape_reserved(to_pascal_case(verb), RUST_KEYWORDS)
}

/// Name of the field module for `resource`.
#[must_use]
pub fn field_module_name(resource: &str) -> String {
    escape_reserved(to_snake_case(resource), RESERVED_MODULES)
}

/// Name of the constant for a resource, field or domain identifier.
#[must_use]
pub fn const_name(identifier: &str) -> String {
    to_screaming_snake_case(identifier)
}

/// Renders `plan` as a Rust module.
#[must_use]
pub fn emit(plan: &EmitPlan<'_>) -> String {
    let mut f = SourceFile::new("//");
    f.blank();

    f.line("/// Permission verbs.");
    f.line("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]");
    f.line("pub enum Permission {");
    for verb in plan.verbs {
        let _ = writeln!(f.buf, "    {},", variant_name(verb.as_str()));
    }
    f.line("}");
    f.blank();

    f.line("impl Permission {");
    f.line("    /// Every verb, in declaration order.");
    let _ = writeln!(f.buf, "    pub const ALL: [Permission; {}] = [", plan.verbs.len());
    for verb in plan.verbs {
        let _ = writeln!(f.buf, "        Permission::{},", variant_name(verb.as_str()));
    }
    f.line("    ];");
    f.blank();
    f.line("    /// The verb as written in the schema.");
    f.line("    pub const fn as_str(self) -> &'static str {");
    f.line("        match self {");
    for verb in plan.verbs {
        let _ = writeln!(
            f.buf,
            "            Permission::{} => \"{verb}\",",
            variant_name(verb.as_str())
        );
    }
    f.line("        }");
    f.line("    }");
    f.line("}");
    f.blank();

    if !plan.domains.is_empty() {
        f.line("/// Domain identifiers.");
        f.line("pub mod domains {");
        for domain in plan.domains {
            let name = const_name(domain.as_str());
            let _ = writeln!(f.buf, "    pub const {name}: &str = \"{domain}\";");
        }
        f.line("}");
        f.blank();
    }

    f.line("/// Resource identifiers.");
    f.line("pub mod resources {");
    for resource in &plan.resources {
        let name = const_name(resource.id);
        let _ = writeln!(f.buf, "    pub const {name}: &str = \"{}\";", resource.id);
    }
    f.line("}");
    f.blank();

    for resource in plan.resources_with_fields() {
        let _ = writeln!(f.buf, "/// Field identifiers of `{}`.", resource.id);
        let _ = writeln!(f.buf, "pub mod {} {{", field_module_name(resource.id));
        for field in &resource.fields {
            let name = const_name(field.name);
            let _ = writeln!(f.buf, "    pub const {name}: &str = \"{}\";", field.key);
        }
        f.line("}");
        f.blank();
    }

    f.line("/// Entity → verb → granted, in declaration order.");
    f.line("pub const MAPPINGS: &[(&str, &[(Permission, bool)])] = &[");
    for entry in plan.entries() {
        let path = match entry.field {
            None => format!("resources::{}", const_name(entry.resource)),
            Some(field) => format!("{}::{}", field_module_name(entry.resource), const_name(field)),
        };
        let _ = writeln!(f.buf, "    (");
        let _ = writeln!(f.buf, "        {path},");
        f.line("        &[");
        for (verb, granted) in plan.grants(entry.decisions) {
            let _ = writeln!(
                f.buf,
                "            (Permission::{}, {granted}),",
                variant_name(verb.as_str())
            );
        }
        f.line("        ],");
        f.line("    ),");
    }
    f.line("];");
    f.blank();

    f.line("/// Returns whether `permission` is granted on `resource`, or `None` if the");
    f.line("/// resource or the verb is not in the table.");
    f.line("pub fn requires_permission(resource: &str, permission: Permission) -> Option<bool> {");
    f.line("    MAPPINGS");
    f.line("        .iter()");
    f.line("        .find(|(key, _)| *key == resource)");
    f.line("        .and_then(|(_, grants)| grants.iter().find(|(p, _)| *p == permission))");
    f.line("        .map(|(_, granted)| *granted)");
    f.line("}");

    f.finish()
}

/// Every name the Rust output declares, scoped by enum or module.
#[must_use]
pub fn constant_names(plan: &EmitPlan<'_>) -> Vec<NamedConstant> {
    let mut names = Vec::new();
    for verb in plan.verbs {
        names.push(NamedConstant::new("Permission", variant_name(verb.as_str()), verb.as_str()));
    }
    for domain in plan.domains {
        names.push(NamedConstant::new("domains", const_name(domain.as_str()), domain.as_str()));
    }
    for resource in &plan.resources {
        names.push(NamedConstant::new("resources", const_name(resource.id), resource.id));
    }
    for resource in plan.resources_with_fields() {
        let module = field_module_name(resource.id);
        names.push(NamedConstant::new("<module>", module.clone(), resource.id));
        for field in &resource.fields {
            let name = const_name(field.name);
            names.push(NamedConstant::new(module.clone(), name, field.key.as_str()));
        }
    }
    names
}
