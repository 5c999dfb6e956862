/// The LDAP syntaxes this engine knows how to validate directly. Mirrors
/// the `PrimitiveKind`-dispatch shape used for CRDT register validation,
/// generalized from four primitive kinds to the handful of RFC 4517
/// syntaxes a directory server actually needs to enforce.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum Syntax {
    DirectoryString,
    Ia5String,
    NumericString,
    Boolean,
    Integer,
    OctetString,
    DistinguishedName,
    GeneralizedTime,
    Oid,
}

impl Syntax {
    pub const fn oid(self) -> &'static str {
        match self {
            Syntax::DirectoryString => "1.3.6.1.4.1.1466.115.121.1.15",
            Syntax::Ia5String => "1.3.6.1.4.1.1466.115.121.1.26",
            Syntax::NumericString => "1.3.6.1.4.1.1466.115.121.1.36",
            Syntax::Boolean => "1.3.6.1.4.1.1466.115.121.1.7",
            Syntax::Integer => "1.3.6.1.4.1.1466.115.121.1.27",
            Syntax::OctetString => "1.3.6.1.4.1.1466.115.121.1.40",
            Syntax::DistinguishedName => "1.3.6.1.4.1.1466.115.121.1.12",
            Syntax::GeneralizedTime => "1.3.6.1.4.1.1466.115.121.1.24",
            Syntax::Oid => "1.3.6.1.4.1.1466.115.121.1.38",
        }
    }

    /// Validates a wire value against this syntax's production rule.
    /// DirectoryString and OctetString accept anything a DN/LDIF codec
    /// would already have decoded to bytes; the others enforce their own
    /// ASN.1 textual grammar.
    pub fn validate(self, value: &[u8]) -> bool {
        match self {
            Syntax::DirectoryString => !value.is_empty() && std::str::from_utf8(value).is_ok(),
            Syntax::Ia5String => value.iter().all(|b| b.is_ascii()),
            Syntax::NumericString => !value.is_empty() && value.iter().all(|b| b.is_ascii_digit() || *b == b' '),
            Syntax::Boolean => value == b"TRUE" || value == b"FALSE",
            Syntax::Integer => {
                let s = match std::str::from_utf8(value) {
                    Ok(s) => s,
                    Err(_) => return false,
                };
                let s = s.strip_prefix('-').unwrap_or(s);
                !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
            }
            Syntax::OctetString => true,
            Syntax::DistinguishedName => directoryd_dn::parse(&String::from_utf8_lossy(value)).is_ok(),
            Syntax::GeneralizedTime => validate_generalized_time(value),
            Syntax::Oid => {
                let s = match std::str::from_utf8(value) {
                    Ok(s) => s,
                    Err(_) => return false,
                };
                !s.is_empty()
                    && (s.split('.').all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
                        || (s.chars().next().map(|c| c.is_ascii_alphabetic()).unwrap_or(false)
                            && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')))
            }
        }
    }
}

/// `YYYYMMDDHH[MM[SS[.f]]](Z|(+|-)HHMM)`, per RFC 4517 §3.3.13.
fn validate_generalized_time(value: &[u8]) -> bool {
    let s = match std::str::from_utf8(value) {
        Ok(s) => s,
        Err(_) => return false,
    };
    let digits_prefix_len = s
        .bytes()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits_prefix_len < 10 || digits_prefix_len > 14 {
        return false;
    }
    let (_, rest) = s.split_at(digits_prefix_len);
    let rest = rest.strip_prefix('.').map(|r| {
        let frac_len = r.bytes().take_while(|b| b.is_ascii_digit()).count();
        &r[frac_len..]
    }).unwrap_or(rest);
    rest == "Z"
        || (rest.len() == 5
            && (rest.starts_with('+') || rest.starts_with('-'))
            && rest[1..].bytes().all(|b| b.is_ascii_digit()))
}
