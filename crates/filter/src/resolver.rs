use crate::error::{FilterError, Result};
use directoryd_matching::MatchingRule;
use directoryd_schema::{Registry, SchemaObject};
use std::sync::Arc;

/// What a leaf needs to know about the attribute it names: the OID used to
/// key index posting lists, the attribute's primary name used to key
/// `Entry::attrs` (the store keys entries by name, not OID — see
/// `directoryd_store::Entry`), plus whichever matching rules it inherited
/// down its `SUP` chain.
#[derive(Clone)]
pub struct ResolvedAttr {
    pub oid: String,
    pub key: String,
    pub equality: Option<Arc<dyn MatchingRule>>,
    pub ordering: Option<Arc<dyn MatchingRule>>,
    pub substr: Option<Arc<dyn MatchingRule>>,
}

/// Bridges the schema registry's attribute *descriptions* with the matching
/// engine's rule *behavior* — kept as two crates upstream so schema has no
/// dependency on matching, joined here where a caller needs both.
pub struct SchemaContext {
    registry: Arc<Registry>,
    table: Arc<directoryd_matching::MatchingTable>,
}

impl SchemaContext {
    pub fn new(registry: Arc<Registry>, table: Arc<directoryd_matching::MatchingTable>) -> Self {
        SchemaContext { registry, table }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn matching_table(&self) -> &directoryd_matching::MatchingTable {
        &self.table
    }

    pub fn resolve(&self, name: &str) -> Result<ResolvedAttr> {
        let mut oid = None;
        let mut key = None;
        let mut equality = None;
        let mut ordering = None;
        let mut substr = None;
        let mut current = name.to_string();
        let mut guard = 0;
        loop {
            guard += 1;
            if guard > 64 {
                break;
            }
            let obj = self
                .registry
                .lookup_by_name_or_oid(&current)
                .map_err(|_| FilterError::UnknownAttribute(name.to_string()))?;
            let SchemaObject::AttributeType(at) = obj.as_ref() else {
                return Err(FilterError::UnknownAttribute(name.to_string()));
            };
            if oid.is_none() {
                oid = Some(at.oid.clone());
                key = Some(at.names.first().cloned().unwrap_or_else(|| at.oid.clone()));
            }
            if equality.is_none() {
                if let Some(r) = &at.equality {
                    equality = self.table.lookup(r).ok();
                }
            }
            if ordering.is_none() {
                if let Some(r) = &at.ordering {
                    ordering = self.table.lookup(r).ok();
                }
            }
            if substr.is_none() {
                if let Some(r) = &at.substr {
                    substr = self.table.lookup(r).ok();
                }
            }
            match &at.sup {
                Some(sup) if equality.is_none() || ordering.is_none() || substr.is_none() => {
                    current = sup.clone();
                }
                _ => break,
            }
        }
        Ok(ResolvedAttr {
            oid: oid.ok_or_else(|| FilterError::UnknownAttribute(name.to_string()))?,
            key: key.unwrap_or_else(|| name.to_string()),
            equality,
            ordering,
            substr,
        })
    }
}
