use crate::error::DnError;
use std::fmt;

/// One `type=value` pair inside an RDN. `attr` is the user-provided attribute
/// identifier (a descriptor name or a numeric OID string); `value` is the
/// decoded byte value with all grammar-level escaping already removed.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Ava {
    pub attr: String,
    pub value: Vec<u8>,
}

impl Ava {
    pub fn new(attr: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            attr: attr.into(),
            value: value.into(),
        }
    }
}

/// A Relative Distinguished Name: an unordered, non-empty set of
/// attribute-value pairs joined by `+` in the textual form.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Rdn {
    avas: Vec<Ava>,
}

impl Rdn {
    /// Builds an RDN from a non-empty list of AVAs. Per spec.md §3, an RDN
    /// with zero pairs cannot exist.
    pub fn new(avas: Vec<Ava>) -> Result<Self, DnError> {
        if avas.is_empty() {
            return Err(DnError::EmptyRdn);
        }
        Ok(Self { avas })
    }

    pub fn single(attr: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            avas: vec![Ava::new(attr, value)],
        }
    }

    pub fn avas(&self) -> &[Ava] {
        &self.avas
    }

    /// True if this multi-valued RDN contains an AVA with the given
    /// attribute type (case-insensitive ASCII compare on the raw identifier)
    /// and value bytes.
    pub fn contains(&self, attr: &str, value: &[u8]) -> bool {
        self.avas
            .iter()
            .any(|a| a.attr.eq_ignore_ascii_case(attr) && a.value == value)
    }

    /// The leading AVA — the one that determines the entry's short display
    /// name and, for single-valued RDNs, the RDN-composing attribute.
    pub fn leading(&self) -> &Ava {
        &self.avas[0]
    }
}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, ava) in self.avas.iter().enumerate() {
            if i > 0 {
                write!(f, "+")?;
            }
            write!(f, "{}=", ava.attr)?;
            crate::escape::write_escaped_value(f, &ava.value)?;
        }
        Ok(())
    }
}
