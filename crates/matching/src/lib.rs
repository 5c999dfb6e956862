mod approx;
mod error;
mod rule;
mod substring;
mod syntax;
mod table;

pub use approx::{approximate_match, soundex};
pub use error::{MatchingError, Result};
pub use rule::{
    BooleanMatch, CaseExactMatch, CaseIgnoreMatch, DistinguishedNameMatch, IntegerMatch,
    MatchingRule, NumericStringMatch, OctetStringMatch,
};
pub use substring::SubstringAssertion;
pub use syntax::Syntax;
pub use table::MatchingTable;
