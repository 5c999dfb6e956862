use crate::error::{MatchingError, Result};
use crate::rule::{
    BooleanMatch, CaseExactMatch, CaseIgnoreMatch, DistinguishedNameMatch, IntegerMatch,
    MatchingRule, NumericStringMatch, OctetStringMatch,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Dispatch table from matching-rule OID or name to its implementation.
/// Kept independent of the schema registry (which only holds the
/// *descriptions* of matching rules) so this crate never depends on
/// `directoryd-schema`; a caller resolves a rule's OID via the schema
/// registry first, then looks the behavior up here.
pub struct MatchingTable {
    rules: HashMap<String, Arc<dyn MatchingRule>>,
}

impl MatchingTable {
    pub fn with_standard_rules() -> Self {
        let mut table = MatchingTable { rules: HashMap::new() };
        table.insert(Arc::new(CaseIgnoreMatch));
        table.insert(Arc::new(CaseExactMatch));
        table.insert(Arc::new(NumericStringMatch));
        table.insert(Arc::new(IntegerMatch));
        table.insert(Arc::new(BooleanMatch));
        table.insert(Arc::new(DistinguishedNameMatch));
        table.insert(Arc::new(OctetStringMatch));
        table
    }

    fn insert(&mut self, rule: Arc<dyn MatchingRule>) {
        self.rules.insert(rule.oid().to_string(), rule.clone());
        self.rules.insert(rule.name().to_ascii_lowercase(), rule);
    }

    pub fn register(&mut self, rule: Arc<dyn MatchingRule>) {
        self.insert(rule);
    }

    pub fn lookup(&self, id: &str) -> Result<Arc<dyn MatchingRule>> {
        self.rules
            .get(&id.to_ascii_lowercase())
            .or_else(|| self.rules.get(id))
            .cloned()
            .ok_or_else(|| MatchingError::NoSuchRule(id.to_string()))
    }
}

impl Default for MatchingTable {
    fn default() -> Self {
        Self::with_standard_rules()
    }
}
