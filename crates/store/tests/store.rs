use directoryd_matching::{CaseIgnoreMatch, DistinguishedNameMatch};
use directoryd_store::{Entry, IndexPolicy, Modification, SledBackend, StoreBackend, StoreError};
use std::sync::Arc;

fn entry(dn_attr: &str, attrs: &[(&str, &[&str])]) -> Entry {
    let mut e = Entry::default();
    for (k, vs) in attrs {
        e.attrs
            .insert(k.to_string(), vs.iter().map(|v| v.as_bytes().to_vec()).collect());
    }
    let _ = dn_attr;
    e
}

fn policy() -> IndexPolicy {
    IndexPolicy::default()
        .with_rule("cn", Arc::new(CaseIgnoreMatch))
        .with_rule("aliasedObjectName", Arc::new(DistinguishedNameMatch))
}

fn backend() -> SledBackend {
    SledBackend::temporary(policy()).expect("open temporary sled backend")
}

#[test]
fn add_lookup_and_delete_round_trip() {
    let store = backend();
    let root = directoryd_dn::parse("dc=example,dc=com").unwrap();
    let id = store
        .add(&root, entry("dc", &[("objectClass", &["domain"]), ("dc", &["example"])]))
        .unwrap();

    let (looked_up_id, looked_up) = store.lookup(&root).unwrap();
    assert_eq!(id, looked_up_id);
    assert_eq!(looked_up.get("dc").unwrap()[0], b"example");

    store.delete(&root).unwrap();
    assert!(matches!(store.lookup(&root), Err(StoreError::NoSuchEntry(_))));
}

#[test]
fn delete_rejects_non_leaf_entries() {
    let store = backend();
    let root = directoryd_dn::parse("dc=example,dc=com").unwrap();
    store
        .add(&root, entry("dc", &[("objectClass", &["domain"]), ("dc", &["example"])]))
        .unwrap();
    let child = directoryd_dn::parse("ou=people,dc=example,dc=com").unwrap();
    store
        .add(&child, entry("ou", &[("objectClass", &["organizationalUnit"]), ("ou", &["people"])]))
        .unwrap();

    assert!(matches!(
        store.delete(&root),
        Err(StoreError::NotAllowedOnNonLeaf(_))
    ));
}

#[test]
fn modify_add_delete_replace_update_presence_index() {
    let store = backend();
    let root = directoryd_dn::parse("dc=example,dc=com").unwrap();
    store
        .add(
            &root,
            entry("dc", &[("objectClass", &["domain"]), ("dc", &["example"]), ("description", &["first"])]),
        )
        .unwrap();

    store
        .modify(
            &root,
            &[
                Modification::Add("description".into(), vec![b"second".to_vec()]),
                Modification::Delete("description".into(), vec![b"first".to_vec()]),
            ],
        )
        .unwrap();
    let (_, e) = store.lookup(&root).unwrap();
    assert_eq!(e.get("description").unwrap(), &vec![b"second".to_vec()]);

    store
        .modify(&root, &[Modification::Replace("description".into(), vec![])])
        .unwrap();
    let (_, e) = store.lookup(&root).unwrap();
    assert!(e.get("description").is_none());
}

#[test]
fn modify_rejects_losing_every_structural_class() {
    let store = backend();
    let root = directoryd_dn::parse("dc=example,dc=com").unwrap();
    store
        .add(&root, entry("dc", &[("objectClass", &["domain"]), ("dc", &["example"])]))
        .unwrap();

    let result = store.modify(&root, &[Modification::Replace("objectClass".into(), vec![])]);
    assert!(matches!(result, Err(StoreError::SchemaViolation(_))));
}

#[test]
fn rename_updates_rdn_attribute_and_subtree_dns() {
    let store = backend();
    let root = directoryd_dn::parse("dc=example,dc=com").unwrap();
    store
        .add(&root, entry("dc", &[("objectClass", &["domain"]), ("dc", &["example"])]))
        .unwrap();
    let people = directoryd_dn::parse("ou=people,dc=example,dc=com").unwrap();
    store
        .add(&people, entry("ou", &[("objectClass", &["organizationalUnit"]), ("ou", &["people"])]))
        .unwrap();
    let alice = directoryd_dn::parse("cn=alice,ou=people,dc=example,dc=com").unwrap();
    store
        .add(&alice, entry("cn", &[("objectClass", &["person"]), ("cn", &["alice"]), ("sn", &["smith"])]))
        .unwrap();

    store.rename(&people, "ou=staff", true).unwrap();

    let new_alice = directoryd_dn::parse("cn=alice,ou=staff,dc=example,dc=com").unwrap();
    let (_, e) = store.lookup(&new_alice).unwrap();
    assert_eq!(e.get("cn").unwrap()[0], b"alice");
    assert!(store.lookup(&alice).is_err());

    let (_, staff) = store.lookup(&directoryd_dn::parse("ou=staff,dc=example,dc=com").unwrap()).unwrap();
    assert_eq!(staff.get("ou").unwrap()[0], b"staff");
}

#[test]
fn move_entry_relocates_subtree_under_new_parent() {
    let store = backend();
    let root = directoryd_dn::parse("dc=example,dc=com").unwrap();
    store
        .add(&root, entry("dc", &[("objectClass", &["domain"]), ("dc", &["example"])]))
        .unwrap();
    let people = directoryd_dn::parse("ou=people,dc=example,dc=com").unwrap();
    store
        .add(&people, entry("ou", &[("objectClass", &["organizationalUnit"]), ("ou", &["people"])]))
        .unwrap();
    let groups = directoryd_dn::parse("ou=groups,dc=example,dc=com").unwrap();
    store
        .add(&groups, entry("ou", &[("objectClass", &["organizationalUnit"]), ("ou", &["groups"])]))
        .unwrap();
    let alice = directoryd_dn::parse("cn=alice,ou=people,dc=example,dc=com").unwrap();
    store
        .add(&alice, entry("cn", &[("objectClass", &["person"]), ("cn", &["alice"])]))
        .unwrap();

    store.move_entry(&alice, &groups).unwrap();
    let moved = directoryd_dn::parse("cn=alice,ou=groups,dc=example,dc=com").unwrap();
    assert!(store.lookup(&moved).is_ok());
    assert!(store.lookup(&alice).is_err());
}

#[test]
fn presence_and_equality_indices_reflect_policy() {
    let store = backend();
    let root = directoryd_dn::parse("dc=example,dc=com").unwrap();
    let id = store
        .add(
            &root,
            entry("dc", &[("objectClass", &["domain"]), ("dc", &["example"]), ("cn", &["Example Org"])]),
        )
        .unwrap();

    assert_eq!(store.presence("cn").unwrap(), vec![id]);
    assert_eq!(store.equality("cn", b"example org").unwrap(), vec![id]);
    assert!(store.equality("cn", b"nonexistent").unwrap().is_empty());
}

#[test]
fn alias_add_rejects_cycle_to_an_ancestor() {
    let store = backend();
    let root = directoryd_dn::parse("dc=example,dc=com").unwrap();
    store
        .add(&root, entry("dc", &[("objectClass", &["domain"]), ("dc", &["example"])]))
        .unwrap();

    let alias_dn = directoryd_dn::parse("cn=loop,dc=example,dc=com").unwrap();
    let self_target = root.render(directoryd_dn::Style::User);
    let cyclic = store.add(
        &alias_dn,
        entry(
            "cn",
            &[("objectClass", &["alias", "extensibleObject"]), ("cn", &["loop"]), ("aliasedObjectName", &[self_target.as_str()])],
        ),
    );
    assert!(matches!(cyclic, Err(StoreError::AliasCycle(_))));
}

#[test]
fn alias_add_rejects_chaining_to_another_alias() {
    let store = backend();
    let root = directoryd_dn::parse("dc=example,dc=com").unwrap();
    store
        .add(&root, entry("dc", &[("objectClass", &["domain"]), ("dc", &["example"])]))
        .unwrap();
    let target = directoryd_dn::parse("ou=people,dc=example,dc=com").unwrap();
    store
        .add(&target, entry("ou", &[("objectClass", &["organizationalUnit"]), ("ou", &["people"])]))
        .unwrap();
    let target_user_dn = target.render(directoryd_dn::Style::User);

    let first_alias = directoryd_dn::parse("cn=alias1,dc=example,dc=com").unwrap();
    store
        .add(
            &first_alias,
            entry(
                "cn",
                &[("objectClass", &["alias", "extensibleObject"]), ("cn", &["alias1"]), ("aliasedObjectName", &[target_user_dn.as_str()])],
            ),
        )
        .unwrap();

    let first_alias_user_dn = first_alias.render(directoryd_dn::Style::User);
    let second_alias = directoryd_dn::parse("cn=alias2,dc=example,dc=com").unwrap();
    let chained = store.add(
        &second_alias,
        entry(
            "cn",
            &[("objectClass", &["alias", "extensibleObject"]), ("cn", &["alias2"]), ("aliasedObjectName", &[first_alias_user_dn.as_str()])],
        ),
    );
    assert!(matches!(chained, Err(StoreError::AliasChain(_))));
}

#[test]
fn alias_one_alias_index_skips_siblings_but_includes_cousins() {
    let store = backend();
    let root = directoryd_dn::parse("dc=example,dc=com").unwrap();
    store
        .add(&root, entry("dc", &[("objectClass", &["domain"]), ("dc", &["example"])]))
        .unwrap();
    let target = directoryd_dn::parse("ou=people,dc=example,dc=com").unwrap();
    store
        .add(&target, entry("ou", &[("objectClass", &["organizationalUnit"]), ("ou", &["people"])]))
        .unwrap();
    let groups = directoryd_dn::parse("ou=groups,dc=example,dc=com").unwrap();
    store
        .add(&groups, entry("ou", &[("objectClass", &["organizationalUnit"]), ("ou", &["groups"])]))
        .unwrap();
    let target_user_dn = target.render(directoryd_dn::Style::User);

    // A sibling alias of the target: already reachable on the same onelevel
    // search as the target itself, so it must not appear in the target
    // parent's `oneAlias` posting list.
    let sibling_alias = directoryd_dn::parse("ou=staff,dc=example,dc=com").unwrap();
    store
        .add(
            &sibling_alias,
            entry(
                "ou",
                &[("objectClass", &["alias", "extensibleObject"]), ("ou", &["staff"]), ("aliasedObjectName", &[target_user_dn.as_str()])],
            ),
        )
        .unwrap();

    // An alias under a different parent, pointing at the same target: this
    // one does need dereferencing for a onelevel search at `groups`.
    let cousin_alias = directoryd_dn::parse("ou=folks,ou=groups,dc=example,dc=com").unwrap();
    store
        .add(
            &cousin_alias,
            entry(
                "ou",
                &[("objectClass", &["alias", "extensibleObject"]), ("ou", &["folks"]), ("aliasedObjectName", &[target_user_dn.as_str()])],
            ),
        )
        .unwrap();

    let (root_id, _) = store.lookup(&root).unwrap();
    let (groups_id, _) = store.lookup(&groups).unwrap();
    let (target_id, _) = store.lookup(&target).unwrap();
    assert!(store.one_alias(root_id).unwrap().is_empty());
    assert_eq!(store.one_alias(groups_id).unwrap(), vec![target_id]);
}
