use thiserror::Error;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),
    #[error("unknown matching rule: {0}")]
    UnknownMatchingRule(String),
    #[error("attribute {0} has no {1} matching rule")]
    NoSuchMatchingCapability(String, &'static str),
    #[error("size limit exceeded")]
    SizeLimitExceeded,
    #[error("time limit exceeded")]
    TimeLimitExceeded,
    #[error("operation cancelled")]
    Cancelled,
    #[error(transparent)]
    Store(#[from] directoryd_store::StoreError),
    #[error(transparent)]
    Dn(#[from] directoryd_dn::DnError),
}

pub type Result<T> = std::result::Result<T, FilterError>;
