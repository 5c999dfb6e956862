use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatchingError {
    #[error("value does not conform to syntax {0:?}")]
    SyntaxViolation(&'static str),
    #[error("no matching rule registered for oid/name {0:?}")]
    NoSuchRule(String),
}

pub type Result<T> = std::result::Result<T, MatchingError>;
