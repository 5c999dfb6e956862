use directoryd_auth::{AuthenticationLevel, Principal};
use directoryd_filter::{Evaluator, Filter, SchemaContext};
use directoryd_interceptor::{
    AdministrativePoint, Chain, Collective, DefaultAuthorization, Handlers, Normalization, Operation, OperationContext,
    OperationalAttribute, Outcome, Schema, StoreAdapter, Subentry, Trigger,
};
use directoryd_matching::MatchingTable;
use directoryd_schema::{parse_schema_file, Registry};
use directoryd_store::{DerefMode, Entry, EntryId, IndexPolicy, Scope, SledBackend, StoreBackend};
use std::collections::HashSet;
use std::sync::Arc;

const CORE_SCHEMA: &str = r#"
attributetype ( 2.5.4.0 NAME 'objectClass' SYNTAX 1.3.6.1.4.1.1466.115.121.1.38 )
attributetype ( 2.5.4.3 NAME 'cn' SYNTAX 1.3.6.1.4.1.1466.115.121.1.15 )
attributetype ( 2.5.4.4 NAME 'sn' SYNTAX 1.3.6.1.4.1.1466.115.121.1.15 )
attributetype ( 0.9.2342.19200300.100.1.25 NAME 'dc' SYNTAX 1.3.6.1.4.1.1466.115.121.1.15 SINGLE-VALUE )
attributetype ( 2.5.4.11 NAME 'ou' SYNTAX 1.3.6.1.4.1.1466.115.121.1.15 )
attributetype ( 2.5.4.34 NAME 'aliasedObjectName' SYNTAX 1.3.6.1.4.1.1466.115.121.1.12 SINGLE-VALUE )
objectclass ( 2.5.6.0 NAME 'top' ABSTRACT MUST objectClass )
objectclass ( 1.3.6.1.4.1.1466.344 NAME 'domain' SUP top STRUCTURAL MUST dc )
objectclass ( 2.5.6.6 NAME 'person' SUP top STRUCTURAL MUST ( cn $ sn ) )
objectclass ( 2.5.6.5 NAME 'organizationalUnit' SUP top STRUCTURAL MUST ou )
objectclass ( 2.5.6.1 NAME 'alias' SUP top STRUCTURAL MUST aliasedObjectName )
"#;

fn registry() -> Arc<Registry> {
    let registry = Arc::new(Registry::new(false));
    for object in parse_schema_file(CORE_SCHEMA).unwrap() {
        registry.register(object).unwrap();
    }
    registry
}

fn schema_context(registry: Arc<Registry>) -> Arc<SchemaContext> {
    Arc::new(SchemaContext::new(registry, Arc::new(MatchingTable::with_standard_rules())))
}

/// Stage list used across the scenarios: the full production order minus
/// authentication/referral/ACI/event (every scenario below binds at
/// `Strong` level directly, which `DefaultAuthorization` always admits — see
/// `directoryd_interceptor::stages::authorization`).
fn chain(store: Arc<dyn StoreBackend>, registry: Arc<Registry>) -> Chain {
    let administrative_point = Arc::new(AdministrativePoint::new(store.clone()));
    let stages: Vec<(&'static str, Arc<dyn Handlers>)> = vec![
        ("normalization", Arc::new(Normalization)),
        ("default-authorization", Arc::new(DefaultAuthorization::new(false))),
        ("administrative-point", administrative_point.clone()),
        ("schema", Arc::new(Schema::new(registry.clone()))),
        ("operational-attribute", Arc::new(OperationalAttribute::new(store.clone()))),
        ("subentry", Arc::new(Subentry::new(store.clone(), administrative_point))),
        ("collective", Arc::new(Collective::new())),
        ("trigger", Arc::new(Trigger::new(Vec::new()))),
        (
            "store",
            Arc::new(StoreAdapter::new(
                store.clone(),
                Arc::new(Evaluator::new(store, schema_context(registry))),
            )),
        ),
    ];
    Chain::new(stages)
}

fn admin() -> Principal {
    Principal { dn: Some(directoryd_dn::parse("uid=admin,ou=system").unwrap()), level: AuthenticationLevel::Strong }
}

fn add(chain: &Chain, dn: &str, attrs: &[(&str, &[&str])]) -> Outcome<EntryId> {
    let mut entry = Entry::default();
    for (name, values) in attrs {
        entry.attrs.insert((*name).into(), values.iter().map(|v| v.as_bytes().to_vec()).collect());
    }
    let bypass = HashSet::new();
    let mut ctx = OperationContext::new(Operation::Add { dn: directoryd_dn::parse(dn).unwrap(), entry }, admin());
    chain.dispatch_add(&mut ctx, &bypass, &|_| unreachable!("store is the terminal stage"))
}

/// S1: bind + search. An admin-bound session adds a domain root and a
/// person beneath it; a subtree search for `(cn=alice)` from the root
/// returns exactly that one entry.
#[test]
fn s1_bind_add_and_search_returns_the_matching_entry() {
    let store: Arc<dyn StoreBackend> = Arc::new(SledBackend::temporary(IndexPolicy::default()).unwrap());
    let registry = registry();
    let chain = chain(store.clone(), registry);

    add(&chain, "dc=example,dc=com", &[("objectClass", &["top", "domain"]), ("dc", &["example"])]).unwrap();
    add(
        &chain,
        "cn=alice,dc=example,dc=com",
        &[("objectClass", &["top", "person"]), ("cn", &["alice"]), ("sn", &["Apple"])],
    )
    .unwrap();

    let bypass = HashSet::new();
    let mut ctx = OperationContext::new(
        Operation::Search {
            base: directoryd_dn::parse("dc=example,dc=com").unwrap(),
            scope: Scope::Subtree,
            deref: DerefMode::Never,
            filter: Filter::Equality("cn".into(), b"alice".to_vec()),
            attributes: vec![],
            types_only: false,
        },
        admin(),
    );
    let results =
        chain.dispatch_search(&mut ctx, &bypass, &|_| unreachable!("store is the terminal stage")).unwrap();

    assert_eq!(results.len(), 1);
    let (id, _) = &results[0];
    let dn = store.dn_of(*id).unwrap();
    assert_eq!(dn.render(directoryd_dn::Style::User), "cn=alice,dc=example,dc=com");
}

/// S2: a Modify-Replace that would strip an entry's only structural class
/// (leaving just the abstract `top`) is rejected as ObjectClassViolation.
#[test]
fn s2_modify_replace_cannot_strip_the_last_structural_class() {
    let store: Arc<dyn StoreBackend> = Arc::new(SledBackend::temporary(IndexPolicy::default()).unwrap());
    let registry = registry();
    let chain = chain(store.clone(), registry);

    add(&chain, "dc=example,dc=com", &[("objectClass", &["top", "domain"]), ("dc", &["example"])]).unwrap();
    add(
        &chain,
        "cn=alice,dc=example,dc=com",
        &[("objectClass", &["top", "person"]), ("cn", &["alice"]), ("sn", &["Apple"])],
    )
    .unwrap();

    let bypass = HashSet::new();
    let dn = directoryd_dn::parse("cn=alice,dc=example,dc=com").unwrap();
    let mods = vec![directoryd_store::Modification::Replace("objectClass".into(), vec![b"top".to_vec()])];
    let mut ctx = OperationContext::new(Operation::Modify { dn, mods }, admin());
    let result = chain.dispatch_modify(&mut ctx, &bypass, &|_| unreachable!("store is the terminal stage"));

    let err = result.expect_err("stripping the only structural class must be rejected");
    assert_eq!(err.code, directoryd_interceptor::LdapResultCode::ObjectClassViolation);
}

/// S3: an alias added beneath `ou=a` whose `aliasedObjectName` names `ou=a`
/// itself — an ancestor of the alias's own DN — is rejected as a cycle
/// rather than being stored and only discovered on traversal.
#[test]
fn s3_alias_cycle_to_an_ancestor_is_rejected() {
    let store: Arc<dyn StoreBackend> = Arc::new(SledBackend::temporary(IndexPolicy::default()).unwrap());
    let registry = registry();
    let chain = chain(store.clone(), registry);

    add(&chain, "ou=a", &[("objectClass", &["top", "organizationalUnit"]), ("ou", &["a"])]).unwrap();

    let result = add(
        &chain,
        "ou=alias,ou=a",
        &[("objectClass", &["top", "alias"]), ("aliasedObjectName", &["ou=a"])],
    );

    let err = result.expect_err("an alias cycling back into its own ancestor must be rejected");
    assert_eq!(err.code, directoryd_interceptor::LdapResultCode::AliasDereferencingProblem);
}
