use std::cmp::Ordering;

/// A matching rule normalizes values into a comparable form and orders
/// them. Most rules are equality-only (`compare` returning `Equal`/`Less`/
/// `Greater` is still meaningful for index key ordering even when the
/// schema only calls it for equality).
pub trait MatchingRule: Send + Sync {
    fn oid(&self) -> &'static str;
    fn name(&self) -> &'static str;
    fn normalize(&self, value: &[u8]) -> Vec<u8>;

    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        self.normalize(a).cmp(&self.normalize(b))
    }

    fn equal(&self, a: &[u8], b: &[u8]) -> bool {
        self.compare(a, b) == Ordering::Equal
    }
}

/// RFC 4517 caseIgnoreMatch: Unicode-naive ASCII case fold plus whitespace
/// collapse (internal runs of whitespace collapse to one space, leading
/// and trailing whitespace is stripped).
pub struct CaseIgnoreMatch;

impl MatchingRule for CaseIgnoreMatch {
    fn oid(&self) -> &'static str {
        "2.5.13.2"
    }
    fn name(&self) -> &'static str {
        "caseIgnoreMatch"
    }
    fn normalize(&self, value: &[u8]) -> Vec<u8> {
        collapse_whitespace(&value.to_ascii_lowercase())
    }
}

/// RFC 4517 caseExactMatch: whitespace collapse without case folding.
pub struct CaseExactMatch;

impl MatchingRule for CaseExactMatch {
    fn oid(&self) -> &'static str {
        "2.5.13.5"
    }
    fn name(&self) -> &'static str {
        "caseExactMatch"
    }
    fn normalize(&self, value: &[u8]) -> Vec<u8> {
        collapse_whitespace(value)
    }
}

/// RFC 4517 numericStringMatch: strips all whitespace.
pub struct NumericStringMatch;

impl MatchingRule for NumericStringMatch {
    fn oid(&self) -> &'static str {
        "2.5.13.8"
    }
    fn name(&self) -> &'static str {
        "numericStringMatch"
    }
    fn normalize(&self, value: &[u8]) -> Vec<u8> {
        value.iter().copied().filter(|b| *b != b' ').collect()
    }
}

/// RFC 4517 integerMatch / integerOrderingMatch: normalizes to a sign byte
/// plus zero-padded-free decimal digits, then compares numerically rather
/// than lexically so `-2 < 10` holds under ordering.
pub struct IntegerMatch;

impl MatchingRule for IntegerMatch {
    fn oid(&self) -> &'static str {
        "2.5.13.14"
    }
    fn name(&self) -> &'static str {
        "integerMatch"
    }
    fn normalize(&self, value: &[u8]) -> Vec<u8> {
        value.to_vec()
    }
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        let parse = |v: &[u8]| std::str::from_utf8(v).ok().and_then(|s| s.parse::<i64>().ok());
        match (parse(a), parse(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => a.cmp(b),
        }
    }
}

/// RFC 4517 booleanMatch: `TRUE`/`FALSE` equality only.
pub struct BooleanMatch;

impl MatchingRule for BooleanMatch {
    fn oid(&self) -> &'static str {
        "2.5.13.13"
    }
    fn name(&self) -> &'static str {
        "booleanMatch"
    }
    fn normalize(&self, value: &[u8]) -> Vec<u8> {
        value.to_vec()
    }
}

/// RFC 4517 distinguishedNameMatch: delegates to the DN codec's normalized
/// rendering so RDN ordering/casing/spacing differences collapse.
pub struct DistinguishedNameMatch;

impl MatchingRule for DistinguishedNameMatch {
    fn oid(&self) -> &'static str {
        "2.5.13.1"
    }
    fn name(&self) -> &'static str {
        "distinguishedNameMatch"
    }
    fn normalize(&self, value: &[u8]) -> Vec<u8> {
        let s = String::from_utf8_lossy(value);
        match directoryd_dn::parse(&s) {
            Ok(dn) => dn.render(directoryd_dn::Style::Normalized).into_bytes(),
            Err(_) => value.to_vec(),
        }
    }
}

/// RFC 4517 octetStringMatch: byte-exact, no normalization.
pub struct OctetStringMatch;

impl MatchingRule for OctetStringMatch {
    fn oid(&self) -> &'static str {
        "2.5.13.17"
    }
    fn name(&self) -> &'static str {
        "octetStringMatch"
    }
    fn normalize(&self, value: &[u8]) -> Vec<u8> {
        value.to_vec()
    }
}

fn collapse_whitespace(value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    let mut last_was_space = true; // trims leading whitespace
    for &b in value {
        if b == b' ' || b == b'\t' {
            if !last_was_space {
                out.push(b' ');
            }
            last_was_space = true;
        } else {
            out.push(b);
            last_was_space = false;
        }
    }
    while out.last() == Some(&b' ') {
        out.pop();
    }
    out
}
