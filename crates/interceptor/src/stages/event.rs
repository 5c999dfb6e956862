use super::prelude::*;
use directoryd_filter::{Event as ChangeEvent, Notifier};
use directoryd_store::StoreBackend;
use std::sync::Arc;

/// Publishes a change event to every persistent-search subscriber after a
/// committed add/delete/modify/rename/move. Runs this close to the store
/// adapter so only changes that actually land are published.
pub struct Event {
    store: Arc<dyn StoreBackend>,
    notifier: Arc<Notifier>,
}

impl Event {
    pub fn new(store: Arc<dyn StoreBackend>, notifier: Arc<Notifier>) -> Self {
        Event { store, notifier }
    }

    fn publish_current(&self, dn: &directoryd_dn::Dn) {
        if let Ok((id, entry)) = self.store.lookup(dn) {
            self.notifier.publish(ChangeEvent::Insert(id, entry));
        }
    }
}

impl Handlers for Event {
    fn on_add(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<EntryId>) -> Outcome<EntryId> {
        let id = next(ctx)?;
        if let Ok(entry) = self.store.lookup_by_id(id) {
            self.notifier.publish(ChangeEvent::Insert(id, entry));
        }
        Ok(id)
    }

    fn on_delete(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<()>) -> Outcome<()> {
        let id = match &ctx.operation {
            Operation::Delete { dn } => self.store.lookup(dn).ok().map(|(id, _)| id),
            _ => None,
        };
        next(ctx)?;
        if let Some(id) = id {
            self.notifier.publish(ChangeEvent::Remove(id));
        }
        Ok(())
    }

    fn on_modify(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<()>) -> Outcome<()> {
        let dn = match &ctx.operation {
            Operation::Modify { dn, .. } => Some(dn.clone()),
            _ => None,
        };
        next(ctx)?;
        if let Some(dn) = dn {
            self.publish_current(&dn);
        }
        Ok(())
    }

    fn on_rename(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<()>) -> Outcome<()> {
        let old_dn = match &ctx.operation {
            Operation::Rename { dn, .. } => Some(dn.clone()),
            _ => None,
        };
        let old_id = old_dn.as_ref().and_then(|dn| self.store.lookup(dn).ok()).map(|(id, _)| id);
        next(ctx)?;
        if let Some(id) = old_id {
            if let Ok(entry) = self.store.lookup_by_id(id) {
                self.notifier.publish(ChangeEvent::Insert(id, entry));
            }
        }
        Ok(())
    }

    fn on_move(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<()>) -> Outcome<()> {
        let old_dn = match &ctx.operation {
            Operation::Move { dn, .. } => Some(dn.clone()),
            _ => None,
        };
        let old_id = old_dn.as_ref().and_then(|dn| self.store.lookup(dn).ok()).map(|(id, _)| id);
        next(ctx)?;
        if let Some(id) = old_id {
            if let Ok(entry) = self.store.lookup_by_id(id) {
                self.notifier.publish(ChangeEvent::Insert(id, entry));
            }
        }
        Ok(())
    }
}
