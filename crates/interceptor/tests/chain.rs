use directoryd_acl::Engine;
use directoryd_auth::{AuthenticationLevel, Principal};
use directoryd_filter::{Evaluator, SchemaContext};
use directoryd_interceptor::{
    AciAuthorization, Chain, DefaultAuthorization, Handlers, Normalization, Operation, OperationContext,
    OperationalAttribute, Outcome, Schema, StoreAdapter,
};
use directoryd_matching::MatchingTable;
use directoryd_schema::Registry;
use directoryd_store::{Entry, IndexPolicy, SledBackend, StoreBackend};
use std::collections::HashSet;
use std::sync::Arc;

fn schema_registry() -> Arc<Registry> {
    Arc::new(Registry::new(false))
}

fn schema_context(registry: Arc<Registry>) -> Arc<SchemaContext> {
    Arc::new(SchemaContext::new(registry, Arc::new(MatchingTable::with_standard_rules())))
}

fn seeded() -> Arc<SledBackend> {
    let backend = SledBackend::temporary(IndexPolicy::default()).unwrap();
    let root = directoryd_dn::parse("dc=example,dc=com").unwrap();
    let mut root_entry = Entry::default();
    root_entry.attrs.insert("objectClass".into(), vec![b"domain".to_vec()]);
    backend.add(&root, root_entry).unwrap();
    Arc::new(backend)
}

fn basic_chain(store: Arc<SledBackend>, registry: Arc<Registry>, evaluator: Arc<Evaluator>) -> Chain {
    let stages: Vec<(&'static str, Arc<dyn Handlers>)> = vec![
        ("normalization", Arc::new(Normalization)),
        ("default-authorization", Arc::new(DefaultAuthorization::new(true))),
        ("schema", Arc::new(Schema::new(registry))),
        ("operational-attribute", Arc::new(OperationalAttribute::new(store.clone() as Arc<dyn StoreBackend>))),
        ("store", Arc::new(StoreAdapter::new(store as Arc<dyn StoreBackend>, evaluator))),
    ];
    Chain::new(stages)
}

#[test]
fn chain_reports_stage_names_in_registration_order() {
    let store = seeded();
    let registry = schema_registry();
    let evaluator = Arc::new(Evaluator::new(store.clone() as Arc<dyn StoreBackend>, schema_context(registry.clone())));
    let chain = basic_chain(store, registry, evaluator);
    assert_eq!(
        chain.names(),
        vec!["normalization", "default-authorization", "schema", "operational-attribute", "store"]
    );
}

#[test]
fn bypassing_a_stage_by_name_skips_its_handler() {
    let store = seeded();
    let registry = schema_registry();
    let evaluator = Arc::new(Evaluator::new(store.clone() as Arc<dyn StoreBackend>, schema_context(registry.clone())));
    let chain = basic_chain(store.clone(), registry, evaluator);

    let dn = directoryd_dn::parse("cn=nobody,dc=example,dc=com").unwrap();
    let mut entry = Entry::default();
    entry.attrs.insert("objectClass".into(), vec![b"this-class-does-not-exist".to_vec()]);

    let mut ctx = OperationContext::new(Operation::Add { dn, entry }, Principal::anonymous());

    let mut bypass: HashSet<&'static str> = HashSet::new();
    bypass.insert("schema");
    bypass.insert("default-authorization");
    let result = chain.dispatch_add(&mut ctx, &bypass, &|_ctx| -> Outcome<directoryd_store::EntryId> {
        unreachable!("store stage should be reached through the chain, not the terminal fallback")
    });
    assert!(result.is_ok(), "bypassing schema should let a structurally invalid add through: {result:?}");
}

#[test]
fn schema_stage_rejects_an_entry_with_an_unregistered_object_class() {
    let store = seeded();
    let registry = schema_registry();
    let evaluator = Arc::new(Evaluator::new(store.clone() as Arc<dyn StoreBackend>, schema_context(registry.clone())));
    let chain = basic_chain(store, registry, evaluator);

    let dn = directoryd_dn::parse("cn=nobody,dc=example,dc=com").unwrap();
    let mut entry = Entry::default();
    entry.attrs.insert("objectClass".into(), vec![b"nonexistentClass".to_vec()]);

    let admin = Principal { dn: None, level: AuthenticationLevel::Strong };
    let mut ctx = OperationContext::new(Operation::Add { dn, entry }, admin);
    let bypass: HashSet<&'static str> = HashSet::new();
    let result = chain.dispatch_add(&mut ctx, &bypass, &|_ctx| -> Outcome<directoryd_store::EntryId> {
        unreachable!("schema stage should reject before reaching the store")
    });
    assert!(result.is_err());
}

#[test]
fn default_authorization_denies_a_non_strong_principal_writing_to_someone_elses_entry() {
    let store = seeded();
    let registry = schema_registry();
    let evaluator = Arc::new(Evaluator::new(store.clone() as Arc<dyn StoreBackend>, schema_context(registry.clone())));
    let chain = basic_chain(store, registry, evaluator);

    let target = directoryd_dn::parse("cn=someone-else,dc=example,dc=com").unwrap();
    let bound_dn = directoryd_dn::parse("cn=someone,dc=example,dc=com").unwrap();
    let principal = Principal { dn: Some(bound_dn), level: AuthenticationLevel::Simple };

    let mut entry = Entry::default();
    entry.attrs.insert("objectClass".into(), vec![b"person".to_vec()]);
    let mut ctx = OperationContext::new(Operation::Add { dn: target, entry }, principal);

    let bypass: HashSet<&'static str> = HashSet::new();
    let result = chain.dispatch_add(&mut ctx, &bypass, &|_ctx| -> Outcome<directoryd_store::EntryId> {
        unreachable!("default authorization should deny before reaching the store")
    });
    assert!(result.is_err());
}

#[test]
fn aci_engine_with_no_tuples_denies_every_request_regardless_of_principal() {
    let store = seeded();
    let registry = schema_registry();
    let evaluator = Arc::new(Evaluator::new(store.clone() as Arc<dyn StoreBackend>, schema_context(registry)));
    let engine = Arc::new(Engine::new(vec![]));
    let aci = AciAuthorization::new(engine, store.clone() as Arc<dyn StoreBackend>, evaluator, true);

    let stages: Vec<(&'static str, Arc<dyn Handlers>)> = vec![("aci-authorization", Arc::new(aci))];
    let chain = Chain::new(stages);

    let dn = directoryd_dn::parse("dc=example,dc=com").unwrap();
    let mut ctx = OperationContext::new(Operation::Lookup { dn, attributes: vec![] }, Principal::anonymous());
    let bypass: HashSet<&'static str> = HashSet::new();
    let result = chain.dispatch_lookup(&mut ctx, &bypass, &|_ctx| -> Outcome<Entry> {
        unreachable!("no ACI tuple should allow this read through")
    });
    assert!(result.is_err());
}
