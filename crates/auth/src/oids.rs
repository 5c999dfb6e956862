//! `Entry::attrs` keys for password-policy bookkeeping, named after the
//! draft-behera-ldap-password-policy operational attributes. The store
//! keys entries by attribute name rather than OID (see
//! `directoryd_store::Entry`), so these are names, not the OIDs under the
//! `1.3.6.1.4.1.42.2.27.8.1` arc they correspond to.

pub const USER_PASSWORD: &str = "userPassword";

pub const PWD_CHANGED_TIME: &str = "pwdChangedTime";
pub const PWD_ACCOUNT_LOCKED_TIME: &str = "pwdAccountLockedTime";
pub const PWD_FAILURE_TIME: &str = "pwdFailureTime";
pub const PWD_HISTORY: &str = "pwdHistory";
pub const PWD_GRACE_USE_TIME: &str = "pwdGraceUseTime";
pub const PWD_RESET: &str = "pwdReset";
pub const PWD_LAST_SUCCESS: &str = "pwdLastSuccess";
