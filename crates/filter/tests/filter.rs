use directoryd_filter::{CancellationToken, Evaluator, ExtensibleMatch, Filter, SchemaContext};
use directoryd_matching::{MatchingTable, SubstringAssertion};
use directoryd_schema::{AttributeType, Registry, SchemaObject, Usage};
use directoryd_store::{DerefMode, Entry, IndexPolicy, Scope, SledBackend, StoreBackend};
use std::sync::Arc;

fn attr(oid: &str, name: &str, equality: &str, substr: Option<&str>) -> SchemaObject {
    SchemaObject::AttributeType(AttributeType {
        oid: oid.to_string(),
        names: vec![name.to_string()],
        desc: None,
        obsolete: false,
        sup: None,
        equality: Some(equality.to_string()),
        ordering: None,
        substr: substr.map(|s| s.to_string()),
        syntax: None,
        single_value: false,
        collective: false,
        no_user_modification: false,
        usage: Usage::UserApplications,
    })
}

fn context() -> Arc<SchemaContext> {
    let registry = Registry::new(false);
    registry.register(attr("2.5.4.3", "cn", "caseIgnoreMatch", Some("caseIgnoreSubstringsMatch"))).unwrap();
    registry.register(attr("2.5.4.11", "ou", "caseIgnoreMatch", Some("caseIgnoreSubstringsMatch"))).unwrap();
    registry.register(attr("2.5.4.0", "objectClass", "caseIgnoreMatch", None)).unwrap();
    let mut table = MatchingTable::with_standard_rules();
    table.register(Arc::new(CaseIgnoreSubstringsAlias));
    Arc::new(SchemaContext::new(Arc::new(registry), Arc::new(table)))
}

// `caseIgnoreSubstringsMatch` shares the same normalization as
// `caseIgnoreMatch`; register it under its own name so attribute types can
// name it as their SUBSTR rule without a second concrete implementation.
struct CaseIgnoreSubstringsAlias;
impl directoryd_matching::MatchingRule for CaseIgnoreSubstringsAlias {
    fn oid(&self) -> &'static str {
        "2.5.13.4"
    }
    fn name(&self) -> &'static str {
        "caseIgnoreSubstringsMatch"
    }
    fn normalize(&self, value: &[u8]) -> Vec<u8> {
        directoryd_matching::CaseIgnoreMatch.normalize(value)
    }
}

fn store() -> SledBackend {
    let policy = IndexPolicy::default()
        .with_rule("cn", Arc::new(directoryd_matching::CaseIgnoreMatch))
        .with_rule("ou", Arc::new(directoryd_matching::CaseIgnoreMatch));
    SledBackend::temporary(policy).unwrap()
}

fn seed(store: &SledBackend) {
    let root = directoryd_dn::parse("dc=example,dc=com").unwrap();
    let mut e = Entry::default();
    e.attrs.insert("objectClass".into(), vec![b"domain".to_vec()]);
    store.add(&root, e).unwrap();

    let alice = directoryd_dn::parse("cn=alice,dc=example,dc=com").unwrap();
    let mut e = Entry::default();
    e.attrs.insert("objectClass".into(), vec![b"person".to_vec()]);
    e.attrs.insert("cn".into(), vec![b"Alice Anderson".to_vec()]);
    e.attrs.insert("ou".into(), vec![b"engineering".to_vec()]);
    store.add(&alice, e).unwrap();

    let bob = directoryd_dn::parse("cn=bob,dc=example,dc=com").unwrap();
    let mut e = Entry::default();
    e.attrs.insert("objectClass".into(), vec![b"person".to_vec()]);
    e.attrs.insert("cn".into(), vec![b"Bob Brown".to_vec()]);
    e.attrs.insert("ou".into(), vec![b"sales".to_vec()]);
    store.add(&bob, e).unwrap();
}

#[test]
fn equality_leaf_uses_the_index_and_still_reverifies() {
    let backend = store();
    seed(&backend);
    let schema = context();
    let evaluator = Arc::new(Evaluator::new(Arc::new(backend), schema));

    let (root_id, _) = evaluator.store().lookup(&directoryd_dn::parse("dc=example,dc=com").unwrap()).unwrap();
    let filter = Filter::Equality("cn".into(), b"alice anderson".to_vec());
    let cursor = evaluator
        .search(root_id, Scope::Subtree, DerefMode::Never, filter, None, None, CancellationToken::new())
        .unwrap();
    let results: Vec<_> = cursor.collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].get("2.5.4.3").unwrap()[0], b"Alice Anderson");
}

#[test]
fn and_filter_intersects_equality_and_substring() {
    let backend = store();
    seed(&backend);
    let schema = context();
    let evaluator = Arc::new(Evaluator::new(Arc::new(backend), schema));
    let (root_id, _) = evaluator.store().lookup(&directoryd_dn::parse("dc=example,dc=com").unwrap()).unwrap();

    let rule = directoryd_matching::CaseIgnoreMatch;
    let assertion = SubstringAssertion::compile(&rule, None, &[b"ander"], None);
    let filter = Filter::And(vec![
        Filter::Equality("objectClass".into(), b"person".to_vec()),
        Filter::Substring("cn".into(), assertion),
    ]);
    let cursor = evaluator
        .search(root_id, Scope::Subtree, DerefMode::Never, filter, None, None, CancellationToken::new())
        .unwrap();
    let results: Vec<_> = cursor.collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(results.len(), 1);
}

#[test]
fn or_filter_unions_two_equality_leaves() {
    let backend = store();
    seed(&backend);
    let schema = context();
    let evaluator = Arc::new(Evaluator::new(Arc::new(backend), schema));
    let (root_id, _) = evaluator.store().lookup(&directoryd_dn::parse("dc=example,dc=com").unwrap()).unwrap();

    let filter = Filter::Or(vec![
        Filter::Equality("cn".into(), b"alice anderson".to_vec()),
        Filter::Equality("cn".into(), b"bob brown".to_vec()),
    ]);
    let cursor = evaluator
        .search(root_id, Scope::Subtree, DerefMode::Never, filter, None, None, CancellationToken::new())
        .unwrap();
    assert_eq!(cursor.collect::<Result<Vec<_>, _>>().unwrap().len(), 2);
}

#[test]
fn onelevel_scope_excludes_grandchildren() {
    let backend = store();
    seed(&backend);
    let schema = context();
    let evaluator = Arc::new(Evaluator::new(Arc::new(backend), schema));
    let (root_id, _) = evaluator.store().lookup(&directoryd_dn::parse("dc=example,dc=com").unwrap()).unwrap();

    let filter = Filter::Presence("objectClass".into());
    let cursor = evaluator
        .search(root_id, Scope::OneLevel, DerefMode::Never, filter, None, None, CancellationToken::new())
        .unwrap();
    assert_eq!(cursor.collect::<Result<Vec<_>, _>>().unwrap().len(), 2);
}

#[test]
fn size_limit_aborts_with_an_error_not_a_truncated_ok() {
    let backend = store();
    seed(&backend);
    let schema = context();
    let evaluator = Arc::new(Evaluator::new(Arc::new(backend), schema));
    let (root_id, _) = evaluator.store().lookup(&directoryd_dn::parse("dc=example,dc=com").unwrap()).unwrap();

    let filter = Filter::Presence("objectClass".into());
    let mut cursor = evaluator
        .search(root_id, Scope::Subtree, DerefMode::Never, filter, Some(1), None, CancellationToken::new())
        .unwrap();
    assert!(cursor.next().unwrap().is_ok());
    assert!(matches!(cursor.next(), Some(Err(directoryd_filter::FilterError::SizeLimitExceeded))));
}

#[test]
fn extensible_match_with_named_rule_over_all_attributes() {
    let backend = store();
    seed(&backend);
    let schema = context();
    let evaluator = Arc::new(Evaluator::new(Arc::new(backend), schema));
    let (root_id, _) = evaluator.store().lookup(&directoryd_dn::parse("dc=example,dc=com").unwrap()).unwrap();

    let filter = Filter::Extensible(ExtensibleMatch {
        rule: Some("caseIgnoreMatch".into()),
        attr: None,
        value: b"sales".to_vec(),
        dn_attrs: false,
    });
    let cursor = evaluator
        .search(root_id, Scope::Subtree, DerefMode::Never, filter, None, None, CancellationToken::new())
        .unwrap();
    assert_eq!(cursor.collect::<Result<Vec<_>, _>>().unwrap().len(), 1);
}
