use super::prelude::*;
use directoryd_dn::Dn;
use directoryd_store::StoreBackend;
use std::sync::Arc;

fn is_subentry(entry: &Entry) -> bool {
    entry.object_classes().iter().any(|oc| oc.eq_ignore_ascii_case(b"subentry"))
}

fn int_attr(entry: &Entry, name: &str) -> Option<u32> {
    entry.get(name)?.first().and_then(|v| std::str::from_utf8(v).ok()).and_then(|s| s.parse().ok())
}

fn base_dn(entry: &Entry, administrative_point: &Dn) -> Dn {
    match entry.get("subtreeSpecificationBase").and_then(|v| v.first()) {
        Some(raw) => match directoryd_dn::Dn::parse(&String::from_utf8_lossy(raw)) {
            Ok(dn) => dn,
            Err(_) => administrative_point.clone(),
        },
        None => administrative_point.clone(),
    }
}

/// Whether `target` falls within the subtree governed by a subentry rooted
/// at `administrative_point`, per the subentry's `subtreeSpecificationBase`/
/// `minDepth`/`maxDepth` attributes. Refinement filters on object class are
/// not modeled; every entry under the depth-bounded base is in scope.
fn governs(subentry: &Entry, administrative_point: &Dn, target: &Dn) -> bool {
    let base = base_dn(subentry, administrative_point);
    let norm = directoryd_dn::AsciiLowerNormalizer;
    if !base.ancestor_of(target, &norm) && !base.equals(target, &norm) {
        return false;
    }
    let depth = target.rdns().len().saturating_sub(base.rdns().len()) as u32;
    if let Some(min) = int_attr(subentry, "minDepth") {
        if depth < min {
            return false;
        }
    }
    if let Some(max) = int_attr(subentry, "maxDepth") {
        if depth > max {
            return false;
        }
    }
    true
}

/// Expands `collectiveAttributes` named by applicable subentries into a
/// looked-up entry's attribute set, and blocks subentry modifications that
/// would remove the `subentry` object class from an entry still carrying a
/// `subtreeSpecification` (nonsensical — a subtree spec without a subentry
/// to own it).
pub struct Subentry {
    store: Arc<dyn StoreBackend>,
    administrative: Arc<super::administrative_point::AdministrativePoint>,
}

impl Subentry {
    pub fn new(store: Arc<dyn StoreBackend>, administrative: Arc<super::administrative_point::AdministrativePoint>) -> Self {
        Subentry { store, administrative }
    }

    fn applicable_subentries(&self, target_id: EntryId, target_dn: &Dn) -> Vec<Entry> {
        let Some(point_id) = self.administrative.nearest(target_id) else { return Vec::new() };
        let Ok(point_dn) = self.store.dn_of(point_id) else { return Vec::new() };
        let Ok(children) = self.store.children(point_id) else { return Vec::new() };
        children
            .into_iter()
            .filter_map(|id| self.store.lookup_by_id(id).ok())
            .filter(|e| is_subentry(e) && governs(e, &point_dn, target_dn))
            .collect()
    }

    fn expand(&self, entry: &mut Entry, id: EntryId, dn: &Dn) {
        let excluded = entry.get("collectiveExclusions").map(|v| {
            v.iter().map(|x| String::from_utf8_lossy(x).into_owned()).collect::<Vec<_>>()
        });
        let exclude_all = excluded.as_ref().map(|e| e.iter().any(|n| n.eq_ignore_ascii_case("excludeAllCollectiveAttributes"))).unwrap_or(false);
        if exclude_all {
            return;
        }
        for subentry in self.applicable_subentries(id, dn) {
            let Some(names) = subentry.get("collectiveAttributes") else { continue };
            for raw in names {
                let Ok(name) = std::str::from_utf8(raw) else { continue };
                if entry.attrs.contains_key(name) {
                    continue;
                }
                if let Some(excluded) = &excluded {
                    if excluded.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                        continue;
                    }
                }
                if let Some(values) = subentry.get(name) {
                    entry.attrs.insert(format!("{name};collective"), values.clone());
                }
            }
        }
    }
}

impl Handlers for Subentry {
    fn on_lookup(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<Entry>) -> Outcome<Entry> {
        let dn = match &ctx.operation {
            Operation::Lookup { dn, .. } => dn.clone(),
            _ => return next(ctx),
        };
        let mut entry = next(ctx)?;
        if let Ok((id, _)) = self.store.lookup(&dn) {
            self.expand(&mut entry, id, &dn);
        }
        Ok(entry)
    }

    fn on_search(
        &self,
        ctx: &mut OperationContext,
        next: &dyn Fn(&mut OperationContext) -> Outcome<Vec<(EntryId, Entry)>>,
    ) -> Outcome<Vec<(EntryId, Entry)>> {
        let mut results = next(ctx)?;
        for (id, entry) in &mut results {
            if let Ok(dn) = self.store.dn_of(*id) {
                self.expand(entry, *id, &dn);
            }
        }
        Ok(results)
    }

    fn on_modify(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<()>) -> Outcome<()> {
        if let Operation::Modify { dn, mods } = &ctx.operation {
            if let Ok((_, entry)) = self.store.lookup(dn) {
                if is_subentry(&entry) {
                    let drops_subentry_class = mods.iter().any(|m| match m {
                        directoryd_store::Modification::Delete(name, vals) | directoryd_store::Modification::Replace(name, vals) => {
                            name.eq_ignore_ascii_case("objectClass")
                                && !vals.iter().any(|v| v.eq_ignore_ascii_case(b"subentry"))
                        }
                        _ => false,
                    });
                    if drops_subentry_class && entry.get("subtreeSpecification").is_some() {
                        return Err(LdapError::new(
                            LdapResultCode::ObjectClassViolation,
                            "cannot remove subentry class while subtreeSpecification is present",
                        ));
                    }
                }
            }
        }
        next(ctx)
    }
}
