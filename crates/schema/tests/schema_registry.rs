use directoryd_schema::{parse_schema_file, ObjectClassKind, Registry, SchemaObject, Usage};

const CORE_SCHEMA: &str = r#"
attributetype ( 2.5.4.0 NAME 'objectClass'
    EQUALITY objectIdentifierMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.38 )

attributetype ( 2.5.4.3 NAME ( 'cn' 'commonName' )
    SUP name )

attributetype ( 2.5.4.41 NAME 'name'
    EQUALITY caseIgnoreMatch
    SUBSTR caseIgnoreSubstringsMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.15{32768} )

objectclass ( 2.5.6.0 NAME 'top' ABSTRACT
    MUST objectClass )

objectclass ( 2.5.6.6 NAME 'person' SUP top STRUCTURAL
    MUST ( sn $ cn )
    MAY ( userPassword $ description ) )
"#;

#[test]
fn parses_attribute_types_and_object_classes() {
    let objects = parse_schema_file(CORE_SCHEMA).expect("schema file should parse");
    assert_eq!(objects.len(), 5);

    let cn = objects
        .iter()
        .find_map(|o| match o {
            SchemaObject::AttributeType(at) if at.oid == "2.5.4.3" => Some(at),
            _ => None,
        })
        .expect("cn attribute type present");
    assert_eq!(cn.names, vec!["cn", "commonName"]);
    assert_eq!(cn.sup.as_deref(), Some("name"));

    let name_at = objects
        .iter()
        .find_map(|o| match o {
            SchemaObject::AttributeType(at) if at.oid == "2.5.4.41" => Some(at),
            _ => None,
        })
        .expect("name attribute type present");
    assert_eq!(name_at.equality.as_deref(), Some("caseIgnoreMatch"));
    assert_eq!(name_at.substr.as_deref(), Some("caseIgnoreSubstringsMatch"));
    assert_eq!(name_at.usage, Usage::UserApplications);

    let person = objects
        .iter()
        .find_map(|o| match o {
            SchemaObject::ObjectClass(oc) if oc.oid == "2.5.6.6" => Some(oc),
            _ => None,
        })
        .expect("person object class present");
    assert_eq!(person.kind, ObjectClassKind::Structural);
    assert_eq!(person.sup, vec!["top"]);
    assert_eq!(person.must, vec!["sn", "cn"]);
    assert_eq!(person.may, vec!["userPassword", "description"]);

    let top = objects
        .iter()
        .find_map(|o| match o {
            SchemaObject::ObjectClass(oc) if oc.oid == "2.5.6.0" => Some(oc),
            _ => None,
        })
        .expect("top object class present");
    assert_eq!(top.kind, ObjectClassKind::Abstract);
}

#[test]
fn registry_resolves_case_insensitively_and_rejects_duplicate_oid() {
    let registry = Registry::new(false);
    for obj in parse_schema_file(CORE_SCHEMA).unwrap() {
        registry.register(obj).expect("initial registration succeeds");
    }

    let found = registry.lookup_by_name_or_oid("CN").expect("case-insensitive lookup");
    assert_eq!(found.oid(), "2.5.4.3");
    let found = registry.lookup_by_name_or_oid("2.5.4.3").expect("oid lookup");
    assert_eq!(found.names()[0], "cn");

    assert!(registry.lookup_by_name_or_oid("nonexistent").is_err());

    let dup = parse_schema_file(
        "attributetype ( 2.5.4.3 NAME 'duplicate' SYNTAX 1.3.6.1.4.1.1466.115.121.1.15 )",
    )
    .unwrap()
    .remove(0);
    assert!(registry.register(dup).is_err());
}

#[test]
fn quirks_mode_gates_non_numeric_oid_acceptance() {
    let strict = Registry::new(false);
    let quirky = Registry::new(true);

    let non_numeric = SchemaObject::AttributeType(directoryd_schema::AttributeType {
        oid: "my-custom-attr".to_string(),
        names: vec!["custom".to_string()],
        desc: None,
        obsolete: false,
        sup: None,
        equality: None,
        ordering: None,
        substr: None,
        syntax: Some("1.3.6.1.4.1.1466.115.121.1.15".to_string()),
        single_value: false,
        collective: false,
        no_user_modification: false,
        usage: Usage::UserApplications,
    });

    assert!(strict.register(non_numeric.clone()).is_err());
    assert!(quirky.register(non_numeric).is_ok());
}

#[test]
fn check_refs_flags_dangling_sup_and_unresolved_must() {
    let registry = Registry::new(false);
    let orphan = parse_schema_file("attributetype ( 1.2.3.4 NAME 'orphan' SUP 9.9.9.9 )")
        .unwrap()
        .remove(0);
    registry.register(orphan).unwrap();

    let broken_class = parse_schema_file(
        "objectclass ( 1.2.3.5 NAME 'broken' STRUCTURAL MUST missingAttr )",
    )
    .unwrap()
    .remove(0);
    registry.register(broken_class).unwrap();

    let errors = registry.check_refs();
    assert!(errors.len() >= 2, "expected dangling SUP and dangling MUST errors, got {errors:?}");
}

#[test]
fn check_refs_accepts_well_formed_core_schema() {
    let registry = Registry::new(false);
    for obj in parse_schema_file(CORE_SCHEMA).unwrap() {
        registry.register(obj).unwrap();
    }
    let must_resolvable = parse_schema_file(
        "attributetype ( 2.5.4.4 NAME 'sn' SUP name )
         attributetype ( 2.5.4.35 NAME 'userPassword' SYNTAX 1.3.6.1.4.1.1466.115.121.1.40 )
         attributetype ( 2.5.4.13 NAME 'description' SUP name )",
    )
    .unwrap();
    for obj in must_resolvable {
        registry.register(obj).unwrap();
    }
    for (i, name) in ["objectIdentifierMatch", "caseIgnoreMatch", "caseIgnoreSubstringsMatch"]
        .into_iter()
        .enumerate()
    {
        registry
            .register(directoryd_schema::SchemaObject::MatchingRule(directoryd_schema::MatchingRule {
                oid: format!("9.9.9.{i}"),
                names: vec![name.to_string()],
                desc: None,
                syntax: "1.3.6.1.4.1.1466.115.121.1.15".to_string(),
            }))
            .unwrap();
    }
    registry
        .register(directoryd_schema::SchemaObject::Syntax(directoryd_schema::LdapSyntax {
            oid: "1.3.6.1.4.1.1466.115.121.1.15".to_string(),
            desc: Some("Directory String".to_string()),
        }))
        .unwrap();

    let errors = registry.check_refs();
    assert!(
        errors.is_empty(),
        "expected a fully-resolvable schema to have no dangling references, got {errors:?}"
    );
}

#[test]
fn rename_schema_preserves_oid_mapping() {
    let registry = Registry::new(false);
    let at = parse_schema_file("attributetype ( 9.9.1.1 NAME 'oldName' SYNTAX 1.3.6.1.4.1.1466.115.121.1.15 )")
        .unwrap()
        .remove(0);
    registry.register(at).unwrap();

    registry.rename_schema("oldName", "newName").unwrap();
    assert!(registry.lookup_by_name_or_oid("newName").is_ok());
    assert_eq!(registry.lookup_by_name_or_oid("9.9.1.1").unwrap().oid(), "9.9.1.1");
}
