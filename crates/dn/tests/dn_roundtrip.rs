use directoryd_dn::{parse, AsciiLowerNormalizer, ChangeRecord, Dn, Mod, Style};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn attr_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9-]{0,10}"
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,12}"
}

proptest! {
    /// I1: normalize(normalize(dn)) == normalize(dn).
    #[test]
    fn normalize_is_idempotent(attr in attr_strategy(), value in value_strategy()) {
        let text = format!("{}={}", attr, value.trim());
        prop_assume!(!value.trim().is_empty());
        let dn = parse(&text).unwrap();
        let norm = AsciiLowerNormalizer;
        let once = dn.normalize(&norm);
        let twice = once.normalize(&norm);
        prop_assert_eq!(once, twice);
    }

    /// I2: parse(render(dn, User)) is equal (under normalization) to dn.
    #[test]
    fn render_parse_roundtrip(attr in attr_strategy(), value in value_strategy()) {
        prop_assume!(!value.trim().is_empty());
        let text = format!("{}={}", attr, value.trim());
        let dn = parse(&text).unwrap();
        let rendered = dn.render(Style::User);
        let reparsed = parse(&rendered).unwrap();
        let norm = AsciiLowerNormalizer;
        prop_assert!(dn.equals(&reparsed, &norm));
    }
}

#[test]
fn multi_rdn_dn_parses_least_significant_first() {
    let dn = parse("cn=alice,ou=people,dc=example,dc=com").unwrap();
    assert_eq!(dn.rdns().len(), 4);
    assert_eq!(dn.rdn().unwrap().leading().attr, "cn");
}

#[test]
fn ancestor_of_holds_for_proper_suffix() {
    let base = parse("dc=example,dc=com").unwrap();
    let leaf = parse("cn=alice,dc=example,dc=com").unwrap();
    let norm = AsciiLowerNormalizer;
    assert!(base.ancestor_of(&leaf, &norm));
    assert!(!leaf.ancestor_of(&base, &norm));
}

#[test]
fn suffix_of_returns_last_k_rdns() {
    let dn = parse("cn=alice,ou=people,dc=example,dc=com").unwrap();
    let suffix = dn.suffix_of(2);
    assert_eq!(suffix.to_string(), "dc=example,dc=com");
}

#[test]
fn escaped_leading_hash_and_trailing_space_roundtrip() {
    let dn = parse(r"cn=\#foo\ ").unwrap();
    assert_eq!(dn.rdn().unwrap().leading().value, b"#foo ");
    // Rendering always uses the hex-pair escape form, never the shorthand
    // `\c` alias the parser also accepts on input.
    let rendered = dn.render(Style::User);
    assert_eq!(rendered, r"cn=\23foo\20");
    let reparsed = parse(&rendered).unwrap();
    assert_eq!(dn, reparsed);
}

/// S4: rename `cn=john doe,dc=example,dc=com` to `cn=jack doe` with
/// delete-old-RDN true; the reverse change record renames back to
/// `cn=john doe` with delete-old-RDN true.
#[test]
fn modify_dn_reversal_matches_scenario_s4() {
    let dn = parse("cn=john doe,dc=example,dc=com").unwrap();
    let forward = ChangeRecord::ModifyDn {
        dn: dn.clone(),
        new_rdn: "cn=jack doe".to_string(),
        delete_old_rdn: true,
        new_superior: None,
    };
    let mut pre_image = BTreeMap::new();
    pre_image.insert("cn".to_string(), vec![b"john doe".to_vec()]);
    let reversed = directoryd_dn::reverse(&forward, &pre_image).unwrap();
    match reversed {
        ChangeRecord::ModifyDn {
            new_rdn,
            delete_old_rdn,
            ..
        } => {
            assert_eq!(new_rdn, "cn=john doe");
            assert!(delete_old_rdn);
        }
        other => panic!("expected ModifyDn, got {:?}", other),
    }
}

/// S5: on `ou={apache,acme}`, applying
/// `[ADD ou=Big; REMOVE l; ADD l=FR; REPLACE l=USA; REPLACE ou=apache]`
/// reverses to exactly
/// `[REPLACE ou={apache,acme}; REPLACE l=USA; DELETE l=FR; ADD l=USA; DELETE ou=Big]`.
#[test]
fn modify_reversal_matches_scenario_s5() {
    let dn: Dn = parse("ou=widgets,dc=example,dc=com").unwrap();
    let mods = vec![
        Mod::Add("ou".into(), vec![b"Big".to_vec()]),
        Mod::Delete("l".into(), vec![]),
        Mod::Add("l".into(), vec![b"FR".to_vec()]),
        Mod::Replace("l".into(), vec![b"USA".to_vec()]),
        Mod::Replace("ou".into(), vec![b"apache".to_vec()]),
    ];
    let forward = ChangeRecord::Modify {
        dn,
        mods,
    };
    let mut pre_image = BTreeMap::new();
    pre_image.insert("ou".to_string(), vec![b"apache".to_vec(), b"acme".to_vec()]);
    pre_image.insert("l".to_string(), vec![b"USA".to_vec()]);

    let reversed = directoryd_dn::reverse(&forward, &pre_image).unwrap();
    let ChangeRecord::Modify { mods, .. } = reversed else {
        panic!("expected Modify");
    };
    assert_eq!(
        mods,
        vec![
            Mod::Replace("ou".into(), vec![b"apache".to_vec(), b"acme".to_vec()]),
            Mod::Replace("l".into(), vec![b"USA".to_vec()]),
            Mod::Delete("l".into(), vec![b"FR".to_vec()]),
            Mod::Add("l".into(), vec![b"USA".to_vec()]),
            Mod::Delete("ou".into(), vec![b"Big".to_vec()]),
        ]
    );
}

#[test]
fn safe_string_predicate_rejects_control_and_leading_colon() {
    assert!(directoryd_dn::is_safe_string(b"plain value"));
    assert!(!directoryd_dn::is_safe_string(b":leadingcolon"));
    assert!(!directoryd_dn::is_safe_string(b"trailing "));
    assert!(!directoryd_dn::is_safe_string(b"embedded\nnewline"));
    assert!(!directoryd_dn::is_safe_string(b""));
}

#[test]
fn ldif_round_trip_for_add_record() {
    let ldif = b"dn: cn=alice,dc=example,dc=com\nobjectClass: person\ncn: alice\nsn: Apple\n";
    let records = directoryd_dn::parse_ldif(ldif).unwrap();
    assert_eq!(records.len(), 1);
    match &records[0] {
        ChangeRecord::Add { dn, attrs } => {
            assert_eq!(dn.to_string(), "cn=alice,dc=example,dc=com");
            assert_eq!(attrs.get("sn").unwrap(), &vec![b"Apple".to_vec()]);
        }
        other => panic!("expected Add, got {:?}", other),
    }
}
