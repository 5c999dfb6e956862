//! The LDAP result-code taxonomy and the single place every lower-layer
//! error type is translated into one. Lower layers never synthesize these
//! codes directly; only the Exception stage calls `IntoLdapError`.

use directoryd_acl::AcError;
use directoryd_auth::AuthError;
use directoryd_dn::DnError;
use directoryd_filter::FilterError;
use directoryd_schema::SchemaError;
use directoryd_store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LdapResultCode {
    Success = 0,
    TimeLimitExceeded = 3,
    SizeLimitExceeded = 4,
    NoSuchAttribute = 16,
    UndefinedAttributeType = 17,
    ConstraintViolation = 19,
    AttributeOrValueExists = 20,
    InvalidAttributeSyntax = 21,
    NoSuchEntry = 32,
    AliasProblem = 33,
    InvalidDnSyntax = 34,
    AliasDereferencingProblem = 36,
    InvalidCredentials = 49,
    InsufficientAccessRights = 50,
    Busy = 51,
    UnwillingToPerform = 53,
    LoopDetect = 54,
    ObjectClassViolation = 65,
    NotAllowedOnNonLeaf = 66,
    NotAllowedOnRdn = 67,
    AlreadyExists = 68,
    UnavailableCriticalExtension = 12,
    Other = 80,
}

/// A typed error that has been assigned its LDAP result code. Produced by
/// the Exception stage from whatever lower-layer error type propagated.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct LdapError {
    pub code: LdapResultCode,
    pub message: String,
}

impl LdapError {
    pub fn new(code: LdapResultCode, message: impl Into<String>) -> Self {
        LdapError { code, message: message.into() }
    }
}

fn store_error_code(e: &StoreError) -> LdapResultCode {
    match e {
        StoreError::AlreadyExists(_) => LdapResultCode::AlreadyExists,
        StoreError::NoSuchEntry(_) | StoreError::NoSuchParent(_) => LdapResultCode::NoSuchEntry,
        StoreError::ConstraintViolation(_) => LdapResultCode::ConstraintViolation,
        StoreError::NotAllowedOnNonLeaf(_) => LdapResultCode::NotAllowedOnNonLeaf,
        StoreError::SchemaViolation(_) => LdapResultCode::ObjectClassViolation,
        StoreError::AttributeOrValueExists(_) => LdapResultCode::AttributeOrValueExists,
        StoreError::NoSuchAttribute(_) => LdapResultCode::NoSuchAttribute,
        StoreError::NotAllowedOnRdn(_) => LdapResultCode::NotAllowedOnRdn,
        StoreError::AliasChain(_) | StoreError::AliasCycle(_) => LdapResultCode::AliasDereferencingProblem,
        StoreError::Busy => LdapResultCode::Busy,
        StoreError::SizeLimitExceeded => LdapResultCode::SizeLimitExceeded,
        StoreError::TimeLimitExceeded => LdapResultCode::TimeLimitExceeded,
        StoreError::Dn(_) => LdapResultCode::InvalidDnSyntax,
        StoreError::Backend(_) | StoreError::Codec(_) => LdapResultCode::Other,
    }
}

fn dn_error_code(_: &DnError) -> LdapResultCode {
    LdapResultCode::InvalidDnSyntax
}

fn schema_error_code(e: &SchemaError) -> LdapResultCode {
    match e {
        SchemaError::NotFound(_) => LdapResultCode::UndefinedAttributeType,
        SchemaError::DanglingReference(_) | SchemaError::SupCycle(_) => LdapResultCode::ObjectClassViolation,
        SchemaError::AlreadyRegistered { .. } | SchemaError::NonNumericOid(_) | SchemaError::Grammar(_) => {
            LdapResultCode::Other
        }
    }
}

fn filter_error_code(e: &FilterError) -> LdapResultCode {
    match e {
        FilterError::UnknownAttribute(_) => LdapResultCode::UndefinedAttributeType,
        FilterError::UnknownMatchingRule(_) | FilterError::NoSuchMatchingCapability(..) => {
            LdapResultCode::InvalidAttributeSyntax
        }
        FilterError::SizeLimitExceeded => LdapResultCode::SizeLimitExceeded,
        FilterError::TimeLimitExceeded => LdapResultCode::TimeLimitExceeded,
        FilterError::Cancelled => LdapResultCode::Other,
        FilterError::Store(e) => store_error_code(e),
        FilterError::Dn(e) => dn_error_code(e),
    }
}

fn auth_error_code(e: &AuthError) -> LdapResultCode {
    match e {
        AuthError::InvalidCredentials | AuthError::AccountLocked | AuthError::PasswordExpired => {
            LdapResultCode::InvalidCredentials
        }
        AuthError::UnwillingToPerform => LdapResultCode::UnwillingToPerform,
        AuthError::InsufficientPasswordQuality
        | AuthError::PasswordTooShort
        | AuthError::PasswordTooLong
        | AuthError::PasswordInHistory
        | AuthError::PasswordTooYoung
        | AuthError::MustSupplyOldPassword => LdapResultCode::ConstraintViolation,
        AuthError::ChangeAfterReset => LdapResultCode::InsufficientAccessRights,
        AuthError::Store(e) => store_error_code(e),
        AuthError::Dn(e) => dn_error_code(e),
    }
}

fn ac_error_code(e: &AcError) -> LdapResultCode {
    match e {
        AcError::Store(e) => store_error_code(e),
        AcError::Filter(e) => filter_error_code(e),
    }
}

pub trait IntoLdapError {
    fn into_ldap_error(self) -> LdapError;
}

macro_rules! impl_into_ldap_error {
    ($ty:ty, $code_fn:ident) => {
        impl IntoLdapError for $ty {
            fn into_ldap_error(self) -> LdapError {
                let code = $code_fn(&self);
                LdapError::new(code, self.to_string())
            }
        }
    };
}

impl_into_ldap_error!(StoreError, store_error_code);
impl_into_ldap_error!(DnError, dn_error_code);
impl_into_ldap_error!(SchemaError, schema_error_code);
impl_into_ldap_error!(FilterError, filter_error_code);
impl_into_ldap_error!(AuthError, auth_error_code);
impl_into_ldap_error!(AcError, ac_error_code);
