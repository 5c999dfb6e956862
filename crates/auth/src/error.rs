use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account locked until the lockout window elapses")]
    AccountLocked,

    #[error("password has expired")]
    PasswordExpired,

    #[error("bind with a DN requires credentials")]
    UnwillingToPerform,

    #[error("new password fails quality checks")]
    InsufficientPasswordQuality,

    #[error("new password is shorter than the configured minimum")]
    PasswordTooShort,

    #[error("new password is longer than the configured maximum")]
    PasswordTooLong,

    #[error("new password matches an entry in the password history")]
    PasswordInHistory,

    #[error("password was changed too recently to change again")]
    PasswordTooYoung,

    #[error("a password change must supply the old password")]
    MustSupplyOldPassword,

    #[error("all other operations are blocked until the password is changed")]
    ChangeAfterReset,

    #[error(transparent)]
    Store(#[from] directoryd_store::StoreError),

    #[error(transparent)]
    Dn(#[from] directoryd_dn::DnError),
}

pub type Result<T> = std::result::Result<T, AuthError>;
