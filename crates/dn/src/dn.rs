use crate::error::DnError;
use crate::rdn::{Ava, Rdn};
use std::fmt;

/// Per-attribute-type normalization, supplied by whatever schema registry the
/// caller has on hand. The `dn` crate has no notion of syntaxes or matching
/// rules of its own — it only needs to fold an attribute's value into its
/// canonical byte form and fold the attribute identifier into its canonical
/// name or OID. A registry-backed implementation lives alongside the schema
/// crate; callers that don't care about schema-aware normalization can pass
/// [`AsciiLowerNormalizer`].
pub trait AttributeNormalizer {
    /// Canonical form of an attribute identifier (descriptor or OID).
    fn normalize_attr(&self, attr: &str) -> String;
    /// Canonical byte form of a value under `attr`'s equality matching rule.
    fn normalize_value(&self, attr: &str, value: &[u8]) -> Vec<u8>;
}

/// A normalizer with no schema knowledge: case-folds attribute identifiers
/// over the ASCII range and leaves values untouched. Useful for tests and
/// for DN comparisons where schema is unavailable.
#[derive(Clone, Copy, Debug, Default)]
pub struct AsciiLowerNormalizer;

impl AttributeNormalizer for AsciiLowerNormalizer {
    fn normalize_attr(&self, attr: &str) -> String {
        attr.to_ascii_lowercase()
    }

    fn normalize_value(&self, _attr: &str, value: &[u8]) -> Vec<u8> {
        value.to_ascii_lowercase()
    }
}

/// A Distinguished Name: a sequence of RDNs, most-significant (the naming
/// context suffix) last, matching the textual RFC 4514 convention where the
/// leftmost RDN is the leaf.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Dn {
    rdns: Vec<Rdn>,
}

impl Dn {
    /// The empty DN — the root DSE.
    pub fn root() -> Self {
        Self { rdns: Vec::new() }
    }

    pub fn from_rdns(rdns: Vec<Rdn>) -> Self {
        Self { rdns }
    }

    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    pub fn is_root(&self) -> bool {
        self.rdns.is_empty()
    }

    /// The leaf RDN, if any.
    pub fn rdn(&self) -> Option<&Rdn> {
        self.rdns.first()
    }

    /// The DN with the leaf RDN removed — the immediate parent.
    pub fn parent(&self) -> Option<Dn> {
        if self.rdns.is_empty() {
            None
        } else {
            Some(Dn {
                rdns: self.rdns[1..].to_vec(),
            })
        }
    }

    /// Prepends `rdn` as the new leaf, returning the resulting child DN.
    pub fn child(&self, rdn: Rdn) -> Dn {
        let mut rdns = Vec::with_capacity(self.rdns.len() + 1);
        rdns.push(rdn);
        rdns.extend(self.rdns.iter().cloned());
        Dn { rdns }
    }

    /// Normalizes this DN's attribute identifiers and values via `norm`,
    /// returning a new `Dn` in canonical form. Comparing two normalized DNs
    /// with `==` implements equality per RFC 4517 distinguishedNameMatch.
    pub fn normalize(&self, norm: &dyn AttributeNormalizer) -> Dn {
        let rdns = self
            .rdns
            .iter()
            .map(|rdn| {
                let mut avas: Vec<Ava> = rdn
                    .avas()
                    .iter()
                    .map(|ava| {
                        Ava::new(
                            norm.normalize_attr(&ava.attr),
                            norm.normalize_value(&ava.attr, &ava.value),
                        )
                    })
                    .collect();
                avas.sort_by(|a, b| a.attr.cmp(&b.attr).then_with(|| a.value.cmp(&b.value)));
                Rdn::new(avas).expect("source RDN was non-empty")
            })
            .collect();
        Dn { rdns }
    }

    /// Normalized equality: both DNs are normalized with `norm` and compared
    /// component-wise. Two DNs that differ only in attribute case, AVA
    /// ordering within an RDN, or value case (per the normalizer) compare
    /// equal.
    pub fn equals(&self, other: &Dn, norm: &dyn AttributeNormalizer) -> bool {
        self.normalize(norm) == other.normalize(norm)
    }

    /// True iff `self` is a proper or improper ancestor of `descendant`: every
    /// RDN of `self`, in order, appears as a suffix of `descendant`'s RDNs.
    pub fn ancestor_of(&self, descendant: &Dn, norm: &dyn AttributeNormalizer) -> bool {
        if self.rdns.len() > descendant.rdns.len() {
            return false;
        }
        let self_n = self.normalize(norm);
        let desc_n = descendant.normalize(norm);
        let offset = desc_n.rdns.len() - self_n.rdns.len();
        self_n.rdns[..] == desc_n.rdns[offset..]
    }

    /// The suffix of this DN consisting of its `k` most-significant RDNs
    /// (i.e. the last `k` elements of `rdns()`). Panics if `k` exceeds the
    /// number of RDNs.
    pub fn suffix_of(&self, k: usize) -> Dn {
        assert!(k <= self.rdns.len(), "suffix longer than DN");
        let start = self.rdns.len() - k;
        Dn {
            rdns: self.rdns[start..].to_vec(),
        }
    }

    /// How this DN should be rendered to text.
    pub fn render(&self, style: Style) -> String {
        match style {
            Style::User => self.to_string(),
            Style::Normalized => {
                let norm = AsciiLowerNormalizer;
                self.normalize(&norm).to_string()
            }
        }
    }

    /// Parses a DN in RFC 4514 textual form (with RFC 2253 quoted-string
    /// compatibility — see [`parse`]).
    pub fn parse(text: &str) -> Result<Dn, DnError> {
        parse(text)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Style {
    User,
    Normalized,
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rdn) in self.rdns.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", rdn)?;
        }
        Ok(())
    }
}

/// Parses a DN string per the RFC 4514 grammar, additionally tolerating the
/// RFC 2253/1779 double-quoted value form (`"..."`) for compatibility with
/// older LDIF producers. Returns the root DN for an empty string.
pub fn parse(text: &str) -> Result<Dn, DnError> {
    let bytes = text.as_bytes();
    if bytes.is_empty() {
        return Ok(Dn::root());
    }
    let mut p = Parser { s: bytes, pos: 0 };
    let dn = p.parse_dn()?;
    if p.pos != p.s.len() {
        return Err(DnError::InvalidSyntax {
            pos: p.pos,
            reason: "trailing input after DN",
        });
    }
    Ok(dn)
}

struct Parser<'a> {
    s: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.s.get(self.pos).copied()
    }

    fn parse_dn(&mut self) -> Result<Dn, DnError> {
        let mut rdns = vec![self.parse_rdn()?];
        while self.peek() == Some(b',') || self.peek() == Some(b';') {
            self.pos += 1;
            rdns.push(self.parse_rdn()?);
        }
        Ok(Dn { rdns })
    }

    fn parse_rdn(&mut self) -> Result<Rdn, DnError> {
        let mut avas = vec![self.parse_ava()?];
        while self.peek() == Some(b'+') {
            self.pos += 1;
            avas.push(self.parse_ava()?);
        }
        Rdn::new(avas)
    }

    fn parse_ava(&mut self) -> Result<Ava, DnError> {
        let attr = self.parse_attr_type()?;
        if self.peek() != Some(b'=') {
            return Err(DnError::InvalidSyntax {
                pos: self.pos,
                reason: "expected '=' after attribute type",
            });
        }
        self.pos += 1;
        let value = self.parse_value()?;
        Ok(Ava::new(attr, value))
    }

    fn parse_attr_type(&mut self) -> Result<String, DnError> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'-' || b == b'.' {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(DnError::InvalidSyntax {
                pos: start,
                reason: "expected attribute type",
            });
        }
        Ok(String::from_utf8_lossy(&self.s[start..self.pos]).into_owned())
    }

    fn parse_value(&mut self) -> Result<Vec<u8>, DnError> {
        if self.peek() == Some(b'"') {
            return self.parse_quoted_value();
        }
        if self.peek() == Some(b'#') {
            return self.parse_hex_string_value();
        }
        // (byte, was-this-pushed-as-part-of-an-escape) so trailing unescaped
        // spaces can be trimmed without disturbing an escaped trailing space.
        let mut raw: Vec<(u8, bool)> = Vec::new();
        while let Some(b) = self.peek() {
            match b {
                b',' | b'+' | b';' => break,
                b'\\' => {
                    let esc_start = self.pos;
                    self.pos += 1;
                    let c = self.peek().ok_or(DnError::UnterminatedEscape { pos: esc_start })?;
                    if c.is_ascii_hexdigit() {
                        let hi = c;
                        self.pos += 1;
                        let lo = self
                            .peek()
                            .filter(|b| b.is_ascii_hexdigit())
                            .ok_or(DnError::InvalidHex { pos: esc_start })?;
                        self.pos += 1;
                        raw.push((b'\\', true));
                        raw.push((hi, true));
                        raw.push((lo, true));
                    } else {
                        raw.push((b'\\', true));
                        raw.push((c, true));
                        self.pos += 1;
                    }
                }
                _ => {
                    raw.push((b, false));
                    self.pos += 1;
                }
            }
        }
        while matches!(raw.last(), Some(&(b' ', false))) {
            raw.pop();
        }
        let raw: Vec<u8> = raw.into_iter().map(|(b, _)| b).collect();
        crate::escape::unescape(&raw)
    }

    fn parse_quoted_value(&mut self) -> Result<Vec<u8>, DnError> {
        let open = self.pos;
        self.pos += 1;
        let mut out = Vec::new();
        loop {
            match self.peek() {
                None => return Err(DnError::UnterminatedEscape { pos: open }),
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    self.pos += 1;
                    let c = self.peek().ok_or(DnError::UnterminatedEscape { pos: open })?;
                    out.push(c);
                    self.pos += 1;
                }
                Some(b) => {
                    out.push(b);
                    self.pos += 1;
                }
            }
        }
        Ok(out)
    }

    fn parse_hex_string_value(&mut self) -> Result<Vec<u8>, DnError> {
        let start = self.pos;
        self.pos += 1;
        let hex_start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_hexdigit() {
                self.pos += 1;
            } else {
                break;
            }
        }
        let hex = &self.s[hex_start..self.pos];
        if hex.is_empty() || hex.len() % 2 != 0 {
            return Err(DnError::InvalidHex { pos: start });
        }
        let mut out = Vec::with_capacity(hex.len() / 2);
        for pair in hex.chunks(2) {
            let hi = hex_digit(pair[0]).ok_or(DnError::InvalidHex { pos: start })?;
            let lo = hex_digit(pair[1]).ok_or(DnError::InvalidHex { pos: start })?;
            out.push((hi << 4) | lo);
        }
        Ok(out)
    }
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
