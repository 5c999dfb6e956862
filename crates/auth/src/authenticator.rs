use crate::error::{AuthError, Result};
use crate::policy::{self, PasswordPolicyConfig};
use crate::principal::{AuthenticationLevel, Principal};
use directoryd_dn::Dn;
use directoryd_store::StoreBackend;
use std::sync::Arc;

/// What a client presented on a bind request.
#[derive(Debug, Clone)]
pub enum Credentials {
    Anonymous,
    Simple(Vec<u8>),
    /// `mechanism` names a SASL mechanism (e.g. `GSSAPI`, `DIGEST-MD5`);
    /// verification itself is delegated to a pluggable [`SaslVerifier`].
    Strong { mechanism: String, payload: Vec<u8> },
    /// Tunnels the bind through to an upstream server via a pluggable
    /// [`UpstreamBind`].
    Delegating { payload: Vec<u8> },
}

#[derive(Debug, Clone)]
pub struct BindRequest {
    pub dn: Option<Dn>,
    pub credentials: Credentials,
}

pub trait Authenticator: Send + Sync {
    fn authenticate(&self, req: &BindRequest) -> Result<Principal>;
}

/// An empty DN with empty credentials binds as anonymous; a non-empty DN
/// with empty credentials is `UnwillingToPerform` — RFC 4513 §5.1.2 forbids
/// an "unauthenticated" bind by default.
pub struct AnonymousAuthenticator;

impl Authenticator for AnonymousAuthenticator {
    fn authenticate(&self, req: &BindRequest) -> Result<Principal> {
        match (&req.dn, &req.credentials) {
            (None, Credentials::Anonymous) => Ok(Principal::anonymous()),
            (Some(_), Credentials::Anonymous) => Err(AuthError::UnwillingToPerform),
            _ => Err(AuthError::InvalidCredentials),
        }
    }
}

/// Verifies a simple bind's password against the bound entry's
/// `userPassword`, applying the password-policy state machine.
pub struct SimpleAuthenticator {
    store: Arc<dyn StoreBackend>,
    policy: PasswordPolicyConfig,
}

impl SimpleAuthenticator {
    pub fn new(store: Arc<dyn StoreBackend>, policy: PasswordPolicyConfig) -> Self {
        SimpleAuthenticator { store, policy }
    }
}

impl Authenticator for SimpleAuthenticator {
    fn authenticate(&self, req: &BindRequest) -> Result<Principal> {
        let Credentials::Simple(password) = &req.credentials else {
            return Err(AuthError::InvalidCredentials);
        };
        let Some(dn) = &req.dn else {
            return Err(AuthError::UnwillingToPerform);
        };
        if password.is_empty() {
            return Err(AuthError::UnwillingToPerform);
        }
        let (id, mut entry) = self.store.lookup(dn)?;
        let now = chrono::Utc::now();
        policy::check_bind(&mut entry, &self.policy, password, now)?;
        self.store.modify(dn, &diff_for_policy_bookkeeping(id, &entry))?;
        Ok(Principal { dn: Some(dn.clone()), level: AuthenticationLevel::Simple })
    }
}

/// `check_bind` mutates a local copy of the entry; this turns the whole
/// attribute set it touched into an idempotent Replace so the store commit
/// only ever sees the policy bookkeeping attributes, not user data.
fn diff_for_policy_bookkeeping(_id: directoryd_store::EntryId, entry: &directoryd_store::Entry) -> Vec<directoryd_store::Modification> {
    use crate::oids::*;
    use directoryd_store::Modification;
    [PWD_FAILURE_TIME, PWD_ACCOUNT_LOCKED_TIME, PWD_LAST_SUCCESS, PWD_GRACE_USE_TIME]
        .iter()
        .map(|oid| match entry.get(oid) {
            Some(values) => Modification::Replace(oid.to_string(), values.clone()),
            None => Modification::Replace(oid.to_string(), vec![]),
        })
        .collect()
}

/// A SASL mechanism's verification, wired in externally (GSSAPI, Kerberos,
/// etc. are out of scope for the core per spec.md §1).
pub trait SaslVerifier: Send + Sync {
    fn verify(&self, mechanism: &str, payload: &[u8]) -> Result<Principal>;
}

pub struct StrongAuthenticator {
    verifier: Arc<dyn SaslVerifier>,
}

impl StrongAuthenticator {
    pub fn new(verifier: Arc<dyn SaslVerifier>) -> Self {
        StrongAuthenticator { verifier }
    }
}

impl Authenticator for StrongAuthenticator {
    fn authenticate(&self, req: &BindRequest) -> Result<Principal> {
        let Credentials::Strong { mechanism, payload } = &req.credentials else {
            return Err(AuthError::InvalidCredentials);
        };
        self.verifier.verify(mechanism, payload)
    }
}

/// Tunnels bind verification to an upstream LDAP server; the transport is
/// out of scope for the core (see spec.md §1), so this is a pluggable seam.
pub trait UpstreamBind: Send + Sync {
    fn bind(&self, dn: Option<&Dn>, payload: &[u8]) -> Result<Principal>;
}

pub struct DelegatingAuthenticator {
    upstream: Arc<dyn UpstreamBind>,
}

impl DelegatingAuthenticator {
    pub fn new(upstream: Arc<dyn UpstreamBind>) -> Self {
        DelegatingAuthenticator { upstream }
    }
}

impl Authenticator for DelegatingAuthenticator {
    fn authenticate(&self, req: &BindRequest) -> Result<Principal> {
        let Credentials::Delegating { payload } = &req.credentials else {
            return Err(AuthError::InvalidCredentials);
        };
        self.upstream.bind(req.dn.as_ref(), payload)
    }
}
