use crate::rule::MatchingRule;

/// A compiled RFC 4517 substring assertion: an optional anchored prefix,
/// zero or more `any` fragments that must appear in order, and an optional
/// anchored suffix.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubstringAssertion {
    pub initial: Option<Vec<u8>>,
    pub any: Vec<Vec<u8>>,
    pub final_: Option<Vec<u8>>,
}

impl SubstringAssertion {
    /// Normalizes each fragment with `rule` before matching; `value` is
    /// already normalized (callers normalize once per filter, not once per
    /// candidate).
    pub fn compile(
        rule: &dyn MatchingRule,
        initial: Option<&[u8]>,
        any: &[&[u8]],
        final_: Option<&[u8]>,
    ) -> Self {
        SubstringAssertion {
            initial: initial.map(|v| rule.normalize(v)),
            any: any.iter().map(|v| rule.normalize(v)).collect(),
            final_: final_.map(|v| rule.normalize(v)),
        }
    }

    pub fn matches(&self, normalized_value: &[u8]) -> bool {
        let mut cursor = normalized_value;

        if let Some(initial) = &self.initial {
            if !cursor.starts_with(initial.as_slice()) {
                return false;
            }
            cursor = &cursor[initial.len()..];
        }

        if let Some(final_) = &self.final_ {
            if !cursor.ends_with(final_.as_slice()) {
                return false;
            }
            cursor = &cursor[..cursor.len() - final_.len()];
        }

        for fragment in &self.any {
            if fragment.is_empty() {
                continue;
            }
            match find_subslice(cursor, fragment) {
                Some(pos) => cursor = &cursor[pos + fragment.len()..],
                None => return false,
            }
        }

        true
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::CaseIgnoreMatch;

    #[test]
    fn anchor_any_final_triplet_matches_in_order() {
        let rule = CaseIgnoreMatch;
        let assertion = SubstringAssertion::compile(&rule, Some(b"jo"), &[b"mid"], Some(b"son"));
        let normalized = rule.normalize(b"Johnmiddleson");
        assert!(assertion.matches(&normalized));
    }

    #[test]
    fn any_fragments_must_appear_in_order_not_overlap() {
        let rule = CaseIgnoreMatch;
        let assertion = SubstringAssertion::compile(&rule, None, &[b"ab", b"ab"], None);
        assert!(!assertion.matches(b"ab"));
        assert!(assertion.matches(b"abxab"));
    }
}
