//! Bind authenticators and the password-policy state machine: four
//! `Authenticator` variants (anonymous, simple, strong, delegating) and the
//! NORMAL/LOCKED/GRACE/EXPIRED/RESET_REQUIRED state machine that gates them.

mod authenticator;
mod error;
mod hash;
mod oids;
mod policy;
mod principal;

pub use authenticator::{
    AnonymousAuthenticator, BindRequest, Credentials, DelegatingAuthenticator, SaslVerifier, SimpleAuthenticator,
    StrongAuthenticator, UpstreamBind,
};
pub use authenticator::Authenticator;
pub use error::{AuthError, Result};
pub use hash::{hash_password, verify_password};
pub use oids::*;
pub use policy::{
    change_password, check_bind, is_pwd_must_reset, parse_generalized_time, render_generalized_time, state_of,
    PasswordPolicyConfig, PasswordPolicyState,
};
pub use principal::{AuthenticationLevel, Principal};
