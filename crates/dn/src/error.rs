use thiserror::Error;

/// Errors produced while parsing or rendering distinguished names and LDIF.
#[derive(Debug, Error)]
pub enum DnError {
    #[error("invalid DN syntax at byte {pos}: {reason}")]
    InvalidSyntax { pos: usize, reason: &'static str },
    #[error("unterminated escape sequence at byte {pos}")]
    UnterminatedEscape { pos: usize },
    #[error("invalid hex pair at byte {pos}")]
    InvalidHex { pos: usize },
    #[error("RDN must have at least one attribute-value pair")]
    EmptyRdn,
    #[error("invalid UTF-8 in DN value")]
    InvalidUtf8,
}

#[derive(Debug, Error)]
pub enum LdifError {
    #[error(transparent)]
    Dn(#[from] DnError),
    #[error("malformed LDIF record at line {line}: {reason}")]
    Malformed { line: usize, reason: &'static str },
    #[error("invalid base64 at line {line}")]
    InvalidBase64 { line: usize },
    #[error("unsupported changetype {0:?}")]
    UnsupportedChangeType(String),
    #[error("modify record references an unknown pre-image attribute {0:?}; cannot compute reverse")]
    MissingPreImage(String),
}

pub type Result<T, E = DnError> = std::result::Result<T, E>;
