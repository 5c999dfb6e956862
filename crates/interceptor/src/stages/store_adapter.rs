use super::prelude::*;
use directoryd_filter::{CancellationToken, Evaluator};
use directoryd_store::{DerefMode, StoreBackend};
use std::sync::Arc;

/// Resolves `id` to its alias target when `deref` calls for dereferencing
/// while finding the base (`DerefMode::FindingBase`/`Always`). This applies
/// regardless of scope, `Base` included — for a `Base` search the base entry
/// itself is exactly what gets returned, so it is exactly what must be
/// dereferenced for `FindingBase` to mean anything.
fn resolve_finding_base(store: &dyn StoreBackend, id: EntryId, deref: DerefMode) -> Outcome<EntryId> {
    if !deref.deref_finding_base() {
        return Ok(id);
    }
    let entry = store.lookup_by_id(id).map_err(IntoLdapError::into_ldap_error)?;
    if !entry.is_alias() {
        return Ok(id);
    }
    let Some(target) = entry.alias_target() else { return Ok(id) };
    let target_dn = directoryd_dn::Dn::parse(&target)
        .map_err(|_| LdapError::new(LdapResultCode::AliasDereferencingProblem, "alias target is not a valid DN"))?;
    let (target_id, _) = store.lookup(&target_dn).map_err(IntoLdapError::into_ldap_error)?;
    Ok(target_id)
}

/// The terminal stage: the only one that actually calls into
/// [`StoreBackend`]. Every earlier stage either inspects, rewrites, or
/// gates `ctx`; this one commits the operation (or, for reads, performs the
/// lookup/search and returns what it finds).
pub struct StoreAdapter {
    store: Arc<dyn StoreBackend>,
    evaluator: Arc<Evaluator>,
}

impl StoreAdapter {
    pub fn new(store: Arc<dyn StoreBackend>, evaluator: Arc<Evaluator>) -> Self {
        StoreAdapter { store, evaluator }
    }
}

impl Handlers for StoreAdapter {
    fn on_add(&self, ctx: &mut OperationContext, _next: &dyn Fn(&mut OperationContext) -> Outcome<EntryId>) -> Outcome<EntryId> {
        let Operation::Add { dn, entry } = &ctx.operation else { unreachable!("store adapter invoked with mismatched operation") };
        self.store.add(dn, entry.clone()).map_err(IntoLdapError::into_ldap_error)
    }

    fn on_delete(&self, ctx: &mut OperationContext, _next: &dyn Fn(&mut OperationContext) -> Outcome<()>) -> Outcome<()> {
        let Operation::Delete { dn } = &ctx.operation else { unreachable!("store adapter invoked with mismatched operation") };
        self.store.delete(dn).map_err(IntoLdapError::into_ldap_error)
    }

    fn on_modify(&self, ctx: &mut OperationContext, _next: &dyn Fn(&mut OperationContext) -> Outcome<()>) -> Outcome<()> {
        let Operation::Modify { dn, mods } = &ctx.operation else { unreachable!("store adapter invoked with mismatched operation") };
        self.store.modify(dn, mods).map_err(IntoLdapError::into_ldap_error)
    }

    fn on_rename(&self, ctx: &mut OperationContext, _next: &dyn Fn(&mut OperationContext) -> Outcome<()>) -> Outcome<()> {
        let Operation::Rename { dn, new_rdn, delete_old_rdn } = &ctx.operation else {
            unreachable!("store adapter invoked with mismatched operation")
        };
        self.store.rename(dn, new_rdn, *delete_old_rdn).map_err(IntoLdapError::into_ldap_error)
    }

    fn on_move(&self, ctx: &mut OperationContext, _next: &dyn Fn(&mut OperationContext) -> Outcome<()>) -> Outcome<()> {
        let Operation::Move { dn, new_superior } = &ctx.operation else { unreachable!("store adapter invoked with mismatched operation") };
        self.store.move_entry(dn, new_superior).map_err(IntoLdapError::into_ldap_error)
    }

    fn on_lookup(&self, ctx: &mut OperationContext, _next: &dyn Fn(&mut OperationContext) -> Outcome<Entry>) -> Outcome<Entry> {
        let Operation::Lookup { dn, .. } = &ctx.operation else { unreachable!("store adapter invoked with mismatched operation") };
        let (_, entry) = self.store.lookup(dn).map_err(IntoLdapError::into_ldap_error)?;
        Ok(entry)
    }

    fn on_compare(&self, ctx: &mut OperationContext, _next: &dyn Fn(&mut OperationContext) -> Outcome<bool>) -> Outcome<bool> {
        let Operation::Compare { dn, attribute, value } = &ctx.operation else {
            unreachable!("store adapter invoked with mismatched operation")
        };
        let (_, entry) = self.store.lookup(dn).map_err(IntoLdapError::into_ldap_error)?;
        Ok(entry.get(attribute).map(|vs| vs.iter().any(|v| v == value)).unwrap_or(false))
    }

    fn on_search(
        &self,
        ctx: &mut OperationContext,
        _next: &dyn Fn(&mut OperationContext) -> Outcome<Vec<(EntryId, Entry)>>,
    ) -> Outcome<Vec<(EntryId, Entry)>> {
        let Operation::Search { base, scope, deref, filter, .. } = &ctx.operation else {
            unreachable!("store adapter invoked with mismatched operation")
        };
        let (base_id, _) = self.store.lookup(base).map_err(IntoLdapError::into_ldap_error)?;
        let base_id = resolve_finding_base(self.store.as_ref(), base_id, *deref)?;
        let cursor = self
            .evaluator
            .search(base_id, *scope, *deref, filter.clone(), ctx.size_limit, ctx.time_limit, CancellationToken::new())
            .map_err(IntoLdapError::into_ldap_error)?;
        let mut out = Vec::new();
        for item in cursor {
            out.push(item.map_err(IntoLdapError::into_ldap_error)?);
        }
        Ok(out)
    }
}
