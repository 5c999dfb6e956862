use crate::error::{Result, SchemaError};
use crate::model::SchemaObject;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Schema registry: OIDs resolve to [`SchemaObject`]s, and every declared
/// name for an object resolves to its OID. Resolution is case-insensitive
/// over the ASCII range, matching RFC 4512 `descr` comparison rules.
///
/// Readers take a shared lock; `register`/`unregister`/`rename_schema` take
/// an exclusive one. Lookups return `Arc<SchemaObject>` clones so a caller
/// can hold on to a result after releasing the lock.
pub struct Registry {
    inner: RwLock<Inner>,
    quirks: bool,
}

#[derive(Clone, Default)]
struct Inner {
    by_oid: BTreeMap<String, Arc<SchemaObject>>,
    by_name: BTreeMap<String, String>,
}

impl Registry {
    pub fn new(quirks: bool) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            quirks,
        }
    }

    pub fn quirks_enabled(&self) -> bool {
        self.quirks
    }

    /// Registers a schema object. Fails with [`SchemaError::AlreadyRegistered`]
    /// if its OID is already present, with [`SchemaError::NonNumericOid`] if
    /// quirks mode is off and the OID isn't a dotted-decimal numeric OID.
    pub fn register(&self, obj: SchemaObject) -> Result<()> {
        if !self.quirks && !is_numeric_oid(obj.oid()) {
            return Err(SchemaError::NonNumericOid(obj.oid().to_string()));
        }
        let mut inner = self.inner.write();
        if inner.by_oid.contains_key(obj.oid()) {
            return Err(SchemaError::AlreadyRegistered {
                kind: obj.kind_label(),
                oid: obj.oid().to_string(),
            });
        }
        let oid = obj.oid().to_string();
        for name in obj.names() {
            inner.by_name.insert(name.to_ascii_lowercase(), oid.clone());
        }
        inner.by_oid.insert(oid, Arc::new(obj));
        Ok(())
    }

    /// Resolves `id` to its schema object. If `id`'s leading character is a
    /// digit it is treated as a numeric OID directly; otherwise it is
    /// case-folded and looked up via the name table first, falling back to
    /// a direct OID lookup (so a caller can also pass an OID verbatim).
    pub fn lookup_by_name_or_oid(&self, id: &str) -> Result<Arc<SchemaObject>> {
        let inner = self.inner.read();
        if id.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            return inner
                .by_oid
                .get(id)
                .cloned()
                .ok_or_else(|| SchemaError::NotFound(id.to_string()));
        }
        let folded = id.to_ascii_lowercase();
        if let Some(oid) = inner.by_name.get(&folded) {
            if let Some(obj) = inner.by_oid.get(oid) {
                return Ok(obj.clone());
            }
        }
        inner
            .by_oid
            .get(id)
            .cloned()
            .ok_or_else(|| SchemaError::NotFound(id.to_string()))
    }

    pub fn iter(&self) -> Vec<Arc<SchemaObject>> {
        self.inner.read().by_oid.values().cloned().collect()
    }

    pub fn unregister(&self, oid: &str) -> Result<()> {
        let mut inner = self.inner.write();
        let obj = inner
            .by_oid
            .remove(oid)
            .ok_or_else(|| SchemaError::NotFound(oid.to_string()))?;
        for name in obj.names() {
            inner.by_name.remove(&name.to_ascii_lowercase());
        }
        Ok(())
    }

    /// Renames a registered name from `old` to `new` (both case-folded);
    /// leaves the OID mapping untouched.
    pub fn rename_schema(&self, old: &str, new: &str) -> Result<()> {
        let mut inner = self.inner.write();
        let oid = inner
            .by_name
            .remove(&old.to_ascii_lowercase())
            .ok_or_else(|| SchemaError::NotFound(old.to_string()))?;
        inner.by_name.insert(new.to_ascii_lowercase(), oid);
        Ok(())
    }

    /// Referential integrity: every attribute type's SUP/EQUALITY/ORDERING/
    /// SUBSTR/SYNTAX reference resolves, every object class's SUP/MUST/MAY
    /// lists resolve, no cycles in attribute-type SUP chains, and every
    /// structural class's superior chain terminates in a root class (a
    /// structural class with no SUP).
    pub fn check_refs(&self) -> Vec<SchemaError> {
        let inner = self.inner.read();
        let mut errors = Vec::new();
        for obj in inner.by_oid.values() {
            match obj.as_ref() {
                SchemaObject::AttributeType(at) => {
                    for (label, reference) in [
                        ("SUP", &at.sup),
                        ("EQUALITY", &at.equality),
                        ("ORDERING", &at.ordering),
                        ("SUBSTR", &at.substr),
                    ] {
                        if let Some(r) = reference {
                            if self.lookup_by_name_or_oid(r).is_err() {
                                errors.push(SchemaError::DanglingReference(format!(
                                    "attributeType {:?} {} references unknown {:?}",
                                    at.oid, label, r
                                )));
                            }
                        }
                    }
                    if let Err(e) = self.check_sup_cycle(&at.oid, &mut Vec::new()) {
                        errors.push(e);
                    }
                }
                SchemaObject::ObjectClass(oc) => {
                    for r in oc.sup.iter().chain(oc.must.iter()).chain(oc.may.iter()) {
                        if self.lookup_by_name_or_oid(r).is_err() {
                            errors.push(SchemaError::DanglingReference(format!(
                                "objectClass {:?} references unknown {:?}",
                                oc.oid, r
                            )));
                        }
                    }
                    if oc.kind == crate::model::ObjectClassKind::Structural
                        && self.structural_chain_root(oc).is_none()
                    {
                        errors.push(SchemaError::DanglingReference(format!(
                            "structural objectClass {:?} has no terminating superior",
                            oc.oid
                        )));
                    }
                }
                SchemaObject::MatchingRule(mr) => {
                    if self.lookup_by_name_or_oid(&mr.syntax).is_err() {
                        errors.push(SchemaError::DanglingReference(format!(
                            "matchingRule {:?} references unknown syntax {:?}",
                            mr.oid, mr.syntax
                        )));
                    }
                }
                SchemaObject::Syntax(_) => {}
            }
        }
        errors
    }

    fn check_sup_cycle(&self, oid: &str, seen: &mut Vec<String>) -> Result<()> {
        if seen.iter().any(|s| s == oid) {
            return Err(SchemaError::SupCycle(oid.to_string()));
        }
        seen.push(oid.to_string());
        let Ok(obj) = self.lookup_by_name_or_oid(oid) else {
            return Ok(());
        };
        if let SchemaObject::AttributeType(at) = obj.as_ref() {
            if let Some(sup) = &at.sup {
                return self.check_sup_cycle(sup, seen);
            }
        }
        Ok(())
    }

    /// Walks an object class's SUP chain. Returns `None` if the chain does
    /// not terminate (a dangling reference or, transitively, a cycle).
    fn structural_chain_root(&self, oc: &crate::model::ObjectClass) -> Option<String> {
        let mut current = oc.clone();
        let mut seen = vec![current.oid.clone()];
        loop {
            if current.sup.is_empty() {
                return Some(current.oid);
            }
            let next_oid = &current.sup[0];
            if seen.contains(next_oid) {
                return None;
            }
            let Ok(next) = self.lookup_by_name_or_oid(next_oid) else {
                return None;
            };
            let SchemaObject::ObjectClass(next_oc) = next.as_ref() else {
                return None;
            };
            seen.push(next_oc.oid.clone());
            current = next_oc.clone();
        }
    }
}

fn is_numeric_oid(s: &str) -> bool {
    !s.is_empty() && s.split('.').all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
}
