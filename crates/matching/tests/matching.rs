use directoryd_matching::{MatchingRule, MatchingTable, Syntax};
use proptest::prelude::*;

#[test]
fn case_ignore_match_ignores_case_and_collapses_whitespace() {
    let table = MatchingTable::with_standard_rules();
    let rule = table.lookup("caseIgnoreMatch").unwrap();
    assert!(rule.equal(b"  Foo   Bar  ", b"foo bar"));
    assert!(!rule.equal(b"foo bar", b"foo baz"));
}

#[test]
fn integer_match_orders_numerically_not_lexically() {
    let table = MatchingTable::with_standard_rules();
    let rule = table.lookup("2.5.13.14").unwrap();
    assert_eq!(rule.compare(b"-2", b"10"), std::cmp::Ordering::Less);
    assert_eq!(rule.compare(b"10", b"9"), std::cmp::Ordering::Greater);
}

#[test]
fn distinguished_name_match_ignores_rdn_spacing() {
    let table = MatchingTable::with_standard_rules();
    let rule = table.lookup("distinguishedNameMatch").unwrap();
    assert!(rule.equal(b"cn=Admin, dc=example,dc=com", b"CN=Admin,DC=example,DC=com"));
}

#[test]
fn lookup_is_case_insensitive_over_rule_name() {
    let table = MatchingTable::with_standard_rules();
    assert!(table.lookup("CASEIGNOREMATCH").is_ok());
    assert!(table.lookup("does-not-exist").is_err());
}

#[test]
fn syntax_validates_booleans_and_rejects_malformed_integers() {
    assert!(Syntax::Boolean.validate(b"TRUE"));
    assert!(!Syntax::Boolean.validate(b"true"));
    assert!(Syntax::Integer.validate(b"-42"));
    assert!(!Syntax::Integer.validate(b"4-2"));
}

#[test]
fn syntax_validates_generalized_time_forms() {
    assert!(Syntax::GeneralizedTime.validate(b"20240101120000Z"));
    assert!(Syntax::GeneralizedTime.validate(b"20240101120000.5+0100"));
    assert!(!Syntax::GeneralizedTime.validate(b"not-a-time"));
}

proptest! {
    #[test]
    fn case_ignore_normalize_is_idempotent(s in "[a-zA-Z ]{0,40}") {
        let table = MatchingTable::with_standard_rules();
        let rule = table.lookup("caseIgnoreMatch").unwrap();
        let once = rule.normalize(s.as_bytes());
        let twice = rule.normalize(&once);
        prop_assert_eq!(once, twice);
    }
}
