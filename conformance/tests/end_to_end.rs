//! End-to-end compilation scenarios: schema source in, emitted tables out.

use permatrix_codegen::{generate, CodegenOptions, Target};
use permatrix_conformance::decode::decode;
use permatrix_conformance::run_all;
use permatrix_spec::{compile, compile_source, CompileError, PermissionVerb, SchemaFormat};

const PROTOTYPES: &str = include_str!("../../spec/fixtures/prototypes.toml");

const PROTOTYPE1: &str = r#"
[[resources]]
name = "Prototype1"
permissions = { Create = false, Delete = false, List = true, Read = true, Update = true }

[[resources.fields]]
name = "id"
permissions = { Create = false, Delete = false, List = true, Read = true, Update = true }

[[resources.fields]]
name = "protocol"
permissions = { Create = false, Delete = false, List = true, Read = true, Update = true }
"#;

// ============================================================================
// Single resource with two fields
// ============================================================================

#[test]
fn prototype1_compiles_to_three_entries() {
    let schema = compile_source(PROTOTYPE1, SchemaFormat::Toml).unwrap();
    let validated = compile(&schema).unwrap();

    let keys: Vec<&str> = validated
        .decision_rows()
        .iter()
        .map(|r| r.key.as_str())
        .collect();
    assert_eq!(keys, vec!["Prototype1", "Prototype1.id", "Prototype1.protocol"]);
    assert_eq!(validated.requires_permission("Prototype1", "List"), Some(true));
    assert_eq!(validated.requires_permission("Prototype1", "Create"), Some(false));
}

#[test]
fn prototype1_lookup_agrees_in_every_target() {
    let schema = compile_source(PROTOTYPE1, SchemaFormat::Toml).unwrap();
    let validated = compile(&schema).unwrap();

    for file in generate(&validated, &Target::ALL, &CodegenOptions::default()).unwrap() {
        let table = decode(file.target, &file.contents).unwrap();
        assert_eq!(table.len(), 3 * 5, "{}", file.target);
        let at = |entity: &str, verb: &str| table[&(entity.to_string(), verb.to_string())];
        assert!(at("Prototype1", "List"), "{}", file.target);
        assert!(!at("Prototype1", "Create"), "{}", file.target);
        assert!(at("Prototype1.protocol", "Update"), "{}", file.target);
    }
}

// ============================================================================
// Incomplete rows
// ============================================================================

#[test]
fn field_without_update_is_rejected_before_emission() {
    let source = PROTOTYPE1.replace(
        "name = \"protocol\"\n\
         permissions = { Create = false, Delete = false, List = true, Read = true, Update = true }",
        "name = \"protocol\"\n\
         permissions = { Create = false, Delete = false, List = true, Read = true }",
    );
    assert_ne!(source, PROTOTYPE1);

    match compile_source(&source, SchemaFormat::Toml) {
        Err(CompileError::IncompleteRow(err)) => {
            assert_eq!(err.entity, "Prototype1.protocol");
            assert_eq!(err.missing, vec![PermissionVerb::new("Update")]);
        }
        other => panic!("expected an incomplete row, got {other:?}"),
    }
}

#[test]
fn conformance_run_on_incomplete_schema_emits_nothing() {
    let source = r#"
[[resources]]
name = "Prototype1"
permissions = { Create = false, Delete = false, List = true, Read = true, Update = true }

[[resources.fields]]
name = "protocol"
permissions = { Create = false, Delete = false, List = true, Read = true }
"#;
    let schema = permatrix_spec::load(source, SchemaFormat::Toml).unwrap();
    let report = run_all(&schema, &CodegenOptions::default()).unwrap();
    assert!(!report.all_passed());
    assert_eq!(report.results_for("determinism").count(), 0);
    assert_eq!(report.results_for("equivalence").count(), 0);
}

// ============================================================================
// Full prototype fixture
// ============================================================================

#[test]
fn prototype_fixture_passes_conformance() {
    let schema = permatrix_spec::load(PROTOTYPES, SchemaFormat::Toml).unwrap();
    let report = run_all(&schema, &CodegenOptions::default()).unwrap();
    let failures: Vec<_> = report.results.iter().filter(|r| r.is_failure()).collect();
    assert!(failures.is_empty(), "conformance failures: {failures:#?}");
    assert_eq!(schema.entity_count(), 12);
}

#[test]
fn fixture_typescript_matches_known_layout() {
    let schema = compile_source(PROTOTYPES, SchemaFormat::Toml).unwrap();
    let validated = compile(&schema).unwrap();
    let ts = permatrix_codegen::emit(&validated, Target::TypeScript, &CodegenOptions::default());

    assert!(ts.contents.contains(
        "type AllResources = Resources | Prototype1 | Prototype2 | Prototype3 | Prototype4;\n"
    ));
    assert!(ts.contents.contains(
        "  [Prototype1.addr]: {\n    [Permissions.Create]: false,\n    \
         [Permissions.Delete]: false,\n    [Permissions.List]: false,\n    \
         [Permissions.Read]: true,\n    [Permissions.Update]: false,\n  },\n"
    ));
    assert!(ts.contents.contains("export enum Domains {\n  global = 'global',\n}\n"));
    assert!(ts.contents.contains(
        "export enum Prototype3 {\n  addr = 'Prototype3.addr',\n  id = 'Prototype3.id',\n}\n"
    ));
}

// ============================================================================
// Identifiers that differ only in case
// ============================================================================

const CASE_VARIANTS: &str = r#"
permissions = ["Read"]

[[resources]]
name = "Socket"
permissions = { Read = true }

[[resources.fields]]
name = "id"
permissions = { Read = true }

[[resources.fields]]
name = "Id"
permissions = { Read = false }
"#;

#[test]
fn case_variant_fields_are_refused_before_emission() {
    let schema = compile_source(CASE_VARIANTS, SchemaFormat::Toml).unwrap();
    let validated = compile(&schema).unwrap();
    let err = generate(&validated, &Target::ALL, &CodegenOptions::default()).unwrap_err();
    let names: Vec<(Target, &str)> = err
        .collisions
        .iter()
        .map(|c| (c.target, c.name.as_str()))
        .collect();
    assert_eq!(
        names,
        vec![
            (Target::Rust, "ID"),
            (Target::Go, "FieldSocketId"),
            (Target::Python, "ID"),
        ]
    );
}

#[test]
fn case_variant_fields_fail_naming_conformance() {
    let schema = permatrix_spec::load(CASE_VARIANTS, SchemaFormat::Toml).unwrap();
    let report = run_all(&schema, &CodegenOptions::default()).unwrap();
    let failed: Vec<&str> = report
        .results_for("naming")
        .filter(|r| r.is_failure())
        .map(|r| r.validator.as_str())
        .collect();
    assert_eq!(failed, vec!["naming/rust", "naming/go", "naming/python"]);
}
