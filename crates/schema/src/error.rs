use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("grammar error: {0}")]
    Grammar(#[from] Box<pest::error::Error<crate::parser::Rule>>),
    #[error("{kind} {oid:?} already registered")]
    AlreadyRegistered { kind: &'static str, oid: String },
    #[error("no such schema object: {0:?}")]
    NotFound(String),
    #[error("non-numeric OID {0:?} rejected: quirks mode is disabled")]
    NonNumericOid(String),
    #[error("referential integrity violation: {0}")]
    DanglingReference(String),
    #[error("cycle detected in SUP chain starting at {0:?}")]
    SupCycle(String),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
