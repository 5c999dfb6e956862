use directoryd_auth::Principal;
use directoryd_dn::Dn;
use directoryd_filter::Filter;
use directoryd_store::{DerefMode, Entry, Modification, Scope};

/// The per-operation payload carried through the chain. One variant per
/// handler method on [`crate::handlers::Handlers`].
#[derive(Debug, Clone)]
pub enum Operation {
    Add { dn: Dn, entry: Entry },
    Delete { dn: Dn },
    Modify { dn: Dn, mods: Vec<Modification> },
    Rename { dn: Dn, new_rdn: String, delete_old_rdn: bool },
    Move { dn: Dn, new_superior: Dn },
    Bind { dn: Option<Dn>, credentials: directoryd_auth::Credentials },
    Unbind,
    Search { base: Dn, scope: Scope, deref: DerefMode, filter: Filter, attributes: Vec<String>, types_only: bool },
    Lookup { dn: Dn, attributes: Vec<String> },
    Compare { dn: Dn, attribute: String, value: Vec<u8> },
    Extended { name: String, value: Option<Vec<u8>> },
    Abandon { message_id: i32 },
}

/// Controls a stage may attach to the eventual response: a password-policy
/// expiry warning, a change-after-reset notice, or a referral.
#[derive(Debug, Clone, Default)]
pub struct ResponseControls {
    pub password_expiring_in: Option<i64>,
    pub change_after_reset: bool,
    pub referral_urls: Vec<String>,
}

/// Carries one request through the chain: the operation itself, the bound
/// session (established by the Authentication stage), and the per-request
/// bypass set that lets internal operations skip named stages.
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub operation: Operation,
    pub principal: Principal,
    pub manage_dsa_it: bool,
    pub size_limit: Option<usize>,
    pub time_limit: Option<std::time::Duration>,
    pub controls: ResponseControls,
}

impl OperationContext {
    pub fn new(operation: Operation, principal: Principal) -> Self {
        OperationContext {
            operation,
            principal,
            manage_dsa_it: false,
            size_limit: None,
            time_limit: None,
            controls: ResponseControls::default(),
        }
    }
}
