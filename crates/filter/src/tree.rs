use directoryd_matching::SubstringAssertion;

/// A search filter, RFC 4511 §4.5.1.7. Leaves are compiled against a
/// specific attribute's matching rules before evaluation; internal nodes
/// compose leaves and other nodes.
#[derive(Clone, Debug)]
pub enum Filter {
    Presence(String),
    Equality(String, Vec<u8>),
    Substring(String, SubstringAssertion),
    Greater(String, Vec<u8>),
    Less(String, Vec<u8>),
    Approx(String, Vec<u8>),
    Extensible(ExtensibleMatch),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

/// An extensible-match assertion (RFC 4511 §4.5.1.7.7): `rule` names the
/// matching rule, `attr` the attribute (either or both may be omitted, but
/// not both per the grammar), `dn_attrs` requests matching against the DN's
/// own attribute-value pairs as well as the entry's.
#[derive(Clone, Debug)]
pub struct ExtensibleMatch {
    pub rule: Option<String>,
    pub attr: Option<String>,
    pub value: Vec<u8>,
    pub dn_attrs: bool,
}

impl Filter {
    /// Every attribute name referenced anywhere in the tree, for candidate
    /// planning and index consultation.
    pub fn referenced_attrs(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_attrs(&mut out);
        out
    }

    fn collect_attrs<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Filter::Presence(a) | Filter::Equality(a, _) | Filter::Substring(a, _) | Filter::Greater(a, _) | Filter::Less(a, _) | Filter::Approx(a, _) => {
                out.push(a)
            }
            Filter::Extensible(e) => {
                if let Some(a) = &e.attr {
                    out.push(a);
                }
            }
            Filter::And(fs) | Filter::Or(fs) => {
                for f in fs {
                    f.collect_attrs(out);
                }
            }
            Filter::Not(f) => f.collect_attrs(out),
        }
    }
}
