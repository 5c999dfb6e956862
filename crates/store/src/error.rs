use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("entry already exists: {0}")]
    AlreadyExists(String),
    #[error("no such entry: {0}")]
    NoSuchEntry(String),
    #[error("no such parent for: {0}")]
    NoSuchParent(String),
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("entry has children, delete not allowed: {0}")]
    NotAllowedOnNonLeaf(String),
    #[error("schema violation: {0}")]
    SchemaViolation(String),
    #[error("attribute or value exists: {0}")]
    AttributeOrValueExists(String),
    #[error("no such attribute: {0}")]
    NoSuchAttribute(String),
    #[error("rename of the RDN attribute via modify is not allowed: {0}")]
    NotAllowedOnRdn(String),
    #[error("alias chain detected at: {0}")]
    AliasChain(String),
    #[error("alias cycle detected at: {0}")]
    AliasCycle(String),
    #[error("could not acquire lock within timeout")]
    Busy,
    #[error("size limit exceeded")]
    SizeLimitExceeded,
    #[error("time limit exceeded")]
    TimeLimitExceeded,
    #[error(transparent)]
    Dn(#[from] directoryd_dn::DnError),
    #[error(transparent)]
    Backend(#[from] sled::Error),
    #[error(transparent)]
    Codec(#[from] Box<bincode::ErrorKind>),
}

pub type Result<T> = std::result::Result<T, StoreError>;
