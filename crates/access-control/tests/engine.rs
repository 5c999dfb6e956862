use directoryd_acl::{AciTuple, Engine, Item, MicroOperation, ProtectedItem, Request, UserClass};
use directoryd_auth::{AuthenticationLevel, Principal};
use directoryd_filter::{Evaluator, SchemaContext};
use directoryd_matching::MatchingTable;
use directoryd_schema::Registry;
use directoryd_store::{Entry, IndexPolicy, SledBackend, StoreBackend};
use std::sync::Arc;

fn schema_context() -> Arc<SchemaContext> {
    let registry = Registry::new(false);
    Arc::new(SchemaContext::new(Arc::new(registry), Arc::new(MatchingTable::with_standard_rules())))
}

fn seeded() -> (Arc<SledBackend>, directoryd_dn::Dn, directoryd_dn::Dn) {
    let backend = SledBackend::temporary(IndexPolicy::default()).unwrap();
    let root = directoryd_dn::parse("dc=example,dc=com").unwrap();
    let mut root_entry = Entry::default();
    root_entry.attrs.insert("objectClass".into(), vec![b"domain".to_vec()]);
    backend.add(&root, root_entry).unwrap();

    let alice = directoryd_dn::parse("cn=alice,dc=example,dc=com").unwrap();
    let mut alice_entry = Entry::default();
    alice_entry.attrs.insert("objectClass".into(), vec![b"person".to_vec()]);
    alice_entry.attrs.insert("cn".into(), vec![b"Alice".to_vec()]);
    backend.add(&alice, alice_entry).unwrap();

    let bob = directoryd_dn::parse("cn=bob,dc=example,dc=com").unwrap();
    let mut bob_entry = Entry::default();
    bob_entry.attrs.insert("objectClass".into(), vec![b"person".to_vec()]);
    bob_entry.attrs.insert("userPassword".into(), vec![b"secret".to_vec()]);
    backend.add(&bob, bob_entry).unwrap();

    (Arc::new(backend), alice, bob)
}

fn request(requester: Principal, target: directoryd_dn::Dn, id: directoryd_store::EntryId, op: MicroOperation, item: Item) -> Request {
    Request { requester, target_dn: target, target_id: id, parent_dn: None, operation: op, item }
}

#[test]
fn all_users_grant_permits_anonymous_read_of_the_entry() {
    let (store, alice, _bob) = seeded();
    let (alice_id, _) = store.lookup(&alice).unwrap();
    let evaluator = Evaluator::new(store.clone(), schema_context());

    let tuple = AciTuple {
        precedence: 0,
        user_classes: vec![UserClass::AllUsers],
        auth_level: AuthenticationLevel::None,
        protected_items: vec![ProtectedItem::Entry],
        operations: vec![MicroOperation::Read],
        grant: true,
    };
    let engine = Engine::new(vec![tuple]);

    let req = request(Principal::anonymous(), alice.clone(), alice_id, MicroOperation::Read, Item::Entry);
    assert!(engine.evaluate(&req, &store, &evaluator).unwrap());
}

#[test]
fn with_no_matching_tuple_access_is_denied() {
    let (store, alice, _bob) = seeded();
    let (alice_id, _) = store.lookup(&alice).unwrap();
    let evaluator = Evaluator::new(store.clone(), schema_context());

    let engine = Engine::new(vec![]);
    let req = request(Principal::anonymous(), alice.clone(), alice_id, MicroOperation::Read, Item::Entry);
    assert!(!engine.evaluate(&req, &store, &evaluator).unwrap());
}

#[test]
fn a_higher_precedence_deny_overrides_a_lower_precedence_grant() {
    let (store, alice, _bob) = seeded();
    let (alice_id, _) = store.lookup(&alice).unwrap();
    let evaluator = Evaluator::new(store.clone(), schema_context());

    let grant = AciTuple {
        precedence: 0,
        user_classes: vec![UserClass::AllUsers],
        auth_level: AuthenticationLevel::None,
        protected_items: vec![ProtectedItem::Entry],
        operations: vec![MicroOperation::Read],
        grant: true,
    };
    let deny = AciTuple {
        precedence: 10,
        user_classes: vec![UserClass::AllUsers],
        auth_level: AuthenticationLevel::None,
        protected_items: vec![ProtectedItem::Entry],
        operations: vec![MicroOperation::Read],
        grant: false,
    };
    let engine = Engine::new(vec![grant, deny]);

    let req = request(Principal::anonymous(), alice.clone(), alice_id, MicroOperation::Read, Item::Entry);
    assert!(!engine.evaluate(&req, &store, &evaluator).unwrap());
}

#[test]
fn a_deny_and_grant_at_equal_precedence_denies() {
    let (store, alice, _bob) = seeded();
    let (alice_id, _) = store.lookup(&alice).unwrap();
    let evaluator = Evaluator::new(store.clone(), schema_context());

    let grant = AciTuple {
        precedence: 5,
        user_classes: vec![UserClass::AllUsers],
        auth_level: AuthenticationLevel::None,
        protected_items: vec![ProtectedItem::Entry],
        operations: vec![MicroOperation::Read],
        grant: true,
    };
    let deny = AciTuple {
        precedence: 5,
        user_classes: vec![UserClass::AllUsers],
        auth_level: AuthenticationLevel::None,
        protected_items: vec![ProtectedItem::Entry],
        operations: vec![MicroOperation::Read],
        grant: false,
    };
    let engine = Engine::new(vec![grant, deny]);

    let req = request(Principal::anonymous(), alice.clone(), alice_id, MicroOperation::Read, Item::Entry);
    assert!(!engine.evaluate(&req, &store, &evaluator).unwrap());
}

#[test]
fn this_entry_user_class_only_matches_the_subject_reading_themselves() {
    let (store, alice, bob) = seeded();
    let (alice_id, _) = store.lookup(&alice).unwrap();
    let evaluator = Evaluator::new(store.clone(), schema_context());

    let tuple = AciTuple {
        precedence: 0,
        user_classes: vec![UserClass::ThisEntry],
        auth_level: AuthenticationLevel::None,
        protected_items: vec![ProtectedItem::AllAttributeValues(vec!["userPassword".into()])],
        operations: vec![MicroOperation::Read],
        grant: true,
    };
    let engine = Engine::new(vec![tuple]);

    let as_alice = Principal { dn: Some(alice.clone()), level: AuthenticationLevel::Simple };
    let req = request(as_alice, alice.clone(), alice_id, MicroOperation::Read, Item::Attribute("userPassword".into()));
    assert!(engine.evaluate(&req, &store, &evaluator).unwrap());

    let as_bob = Principal { dn: Some(bob), level: AuthenticationLevel::Simple };
    let req2 = request(as_bob, alice, alice_id, MicroOperation::Read, Item::Attribute("userPassword".into()));
    assert!(!engine.evaluate(&req2, &store, &evaluator).unwrap());
}

#[test]
fn auth_level_precondition_blocks_anonymous_when_strong_is_required() {
    let (store, alice, _bob) = seeded();
    let (alice_id, _) = store.lookup(&alice).unwrap();
    let evaluator = Evaluator::new(store.clone(), schema_context());

    let tuple = AciTuple {
        precedence: 0,
        user_classes: vec![UserClass::AllUsers],
        auth_level: AuthenticationLevel::Strong,
        protected_items: vec![ProtectedItem::Entry],
        operations: vec![MicroOperation::Read],
        grant: true,
    };
    let engine = Engine::new(vec![tuple]);

    let req = request(Principal::anonymous(), alice.clone(), alice_id, MicroOperation::Read, Item::Entry);
    assert!(!engine.evaluate(&req, &store, &evaluator).unwrap());
}
