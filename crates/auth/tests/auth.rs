use directoryd_auth::{
    AnonymousAuthenticator, Authenticator, BindRequest, Credentials, PasswordPolicyConfig, SimpleAuthenticator,
};
use directoryd_store::{Entry, IndexPolicy, SledBackend, StoreBackend};
use std::sync::Arc;

fn seeded_store() -> (Arc<SledBackend>, directoryd_dn::Dn) {
    let backend = SledBackend::temporary(IndexPolicy::default()).unwrap();
    let bob = directoryd_dn::parse("uid=bob,ou=people,dc=example,dc=com").unwrap();
    let root = directoryd_dn::parse("dc=example,dc=com").unwrap();
    let people = directoryd_dn::parse("ou=people,dc=example,dc=com").unwrap();
    let mut root_entry = Entry::default();
    root_entry.attrs.insert("objectClass".into(), vec![b"domain".to_vec()]);
    backend.add(&root, root_entry).unwrap();
    let mut people_entry = Entry::default();
    people_entry.attrs.insert("objectClass".into(), vec![b"organizationalUnit".to_vec()]);
    backend.add(&people, people_entry).unwrap();
    let mut bob_entry = Entry::default();
    bob_entry.attrs.insert("objectClass".into(), vec![b"person".to_vec()]);
    bob_entry
        .attrs
        .insert("userPassword".into(), vec![directoryd_auth::hash_password(b"s3cret!").into_bytes()]);
    backend.add(&bob, bob_entry).unwrap();
    (Arc::new(backend), bob)
}

#[test]
fn anonymous_bind_with_empty_dn_and_credentials_succeeds() {
    let auth = AnonymousAuthenticator;
    let principal = auth
        .authenticate(&BindRequest { dn: None, credentials: Credentials::Anonymous })
        .unwrap();
    assert!(principal.is_anonymous());
}

#[test]
fn anonymous_bind_with_a_dn_but_no_credentials_is_unwilling_to_perform() {
    let auth = AnonymousAuthenticator;
    let dn = directoryd_dn::parse("uid=bob,ou=people,dc=example,dc=com").unwrap();
    let result = auth.authenticate(&BindRequest { dn: Some(dn), credentials: Credentials::Anonymous });
    assert!(matches!(result, Err(directoryd_auth::AuthError::UnwillingToPerform)));
}

#[test]
fn simple_bind_succeeds_with_the_correct_password() {
    let (store, bob) = seeded_store();
    let auth = SimpleAuthenticator::new(store, PasswordPolicyConfig::default());
    let principal = auth
        .authenticate(&BindRequest { dn: Some(bob.clone()), credentials: Credentials::Simple(b"s3cret!".to_vec()) })
        .unwrap();
    assert_eq!(principal.dn, Some(bob));
}

#[test]
fn simple_bind_with_three_wrong_passwords_locks_the_account() {
    let (store, bob) = seeded_store();
    let policy = PasswordPolicyConfig { pwd_max_failure: 3, ..Default::default() };
    let auth = SimpleAuthenticator::new(store.clone(), policy);

    for _ in 0..3 {
        let result = auth.authenticate(&BindRequest {
            dn: Some(bob.clone()),
            credentials: Credentials::Simple(b"wrong".to_vec()),
        });
        assert!(result.is_err());
    }

    let (_, entry) = store.lookup(&bob).unwrap();
    assert!(entry.get(directoryd_auth::PWD_ACCOUNT_LOCKED_TIME).is_some());

    let result = auth.authenticate(&BindRequest {
        dn: Some(bob.clone()),
        credentials: Credentials::Simple(b"s3cret!".to_vec()),
    });
    assert!(matches!(result, Err(directoryd_auth::AuthError::AccountLocked)));
}

#[test]
fn simple_bind_rejects_empty_password_as_unwilling_to_perform() {
    let (store, bob) = seeded_store();
    let auth = SimpleAuthenticator::new(store, PasswordPolicyConfig::default());
    let result = auth.authenticate(&BindRequest { dn: Some(bob), credentials: Credentials::Simple(vec![]) });
    assert!(matches!(result, Err(directoryd_auth::AuthError::UnwillingToPerform)));
}
