use super::prelude::*;
use directoryd_store::StoreBackend;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;

/// Tracks administrative areas: entries whose `objectClass` includes
/// `subentry`'s governing marker, `administrativeRole`. Subentries (the
/// Subentry/Collective stages) need to know which ancestor is the nearest
/// administrative point for a given entry; this stage maintains that index
/// incrementally as entries are added, deleted, renamed, or moved.
pub struct AdministrativePoint {
    store: Arc<dyn StoreBackend>,
    points: RwLock<HashSet<directoryd_store::EntryId>>,
}

impl AdministrativePoint {
    pub fn new(store: Arc<dyn StoreBackend>) -> Self {
        AdministrativePoint { store, points: RwLock::new(HashSet::new()) }
    }

    fn is_administrative_point(entry: &Entry) -> bool {
        entry.get("administrativeRole").is_some()
    }

    /// The nearest ancestor (inclusive) that is an administrative point,
    /// walking up via `store.dn_of`/`lookup` since the store indexes
    /// parent/child by id rather than exposing a direct ancestor chain.
    pub fn nearest(&self, id: directoryd_store::EntryId) -> Option<directoryd_store::EntryId> {
        let points = self.points.read();
        let mut current = id;
        loop {
            if points.contains(&current) {
                return Some(current);
            }
            let dn = self.store.dn_of(current).ok()?;
            let parent_dn = dn.parent()?;
            let (parent_id, _) = self.store.lookup(&parent_dn).ok()?;
            if parent_id == current {
                return None;
            }
            current = parent_id;
        }
    }

    fn refresh(&self, id: directoryd_store::EntryId) {
        let mut points = self.points.write();
        match self.store.lookup_by_id(id) {
            Ok(entry) if Self::is_administrative_point(&entry) => {
                points.insert(id);
            }
            _ => {
                points.remove(&id);
            }
        }
    }
}

impl Handlers for AdministrativePoint {
    fn on_add(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<EntryId>) -> Outcome<EntryId> {
        let id = next(ctx)?;
        self.refresh(id);
        Ok(id)
    }

    fn on_modify(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<()>) -> Outcome<()> {
        let Operation::Modify { dn, .. } = &ctx.operation else { return next(ctx) };
        let id = self.store.lookup(dn).ok().map(|(id, _)| id);
        let result = next(ctx);
        if let Some(id) = id {
            self.refresh(id);
        }
        result
    }

    fn on_delete(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<()>) -> Outcome<()> {
        let Operation::Delete { dn } = &ctx.operation else { return next(ctx) };
        let id = self.store.lookup(dn).ok().map(|(id, _)| id);
        let result = next(ctx);
        if let Some(id) = id {
            self.points.write().remove(&id);
        }
        result
    }
}
