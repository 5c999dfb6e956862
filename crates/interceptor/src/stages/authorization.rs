use super::prelude::*;
use directoryd_acl::{Engine, Item, MicroOperation, Request as AcRequest};
use directoryd_dn::Dn;
use directoryd_filter::Evaluator;
use directoryd_store::StoreBackend;
use std::sync::Arc;

fn target_dn(op: &Operation) -> Option<&Dn> {
    match op {
        Operation::Add { dn, .. }
        | Operation::Delete { dn }
        | Operation::Modify { dn, .. }
        | Operation::Rename { dn, .. }
        | Operation::Move { dn, .. }
        | Operation::Lookup { dn, .. }
        | Operation::Compare { dn, .. } => Some(dn),
        _ => None,
    }
}

fn micro_op(op: &Operation) -> Option<MicroOperation> {
    match op {
        Operation::Add { .. } => Some(MicroOperation::Add),
        Operation::Delete { .. } => Some(MicroOperation::Remove),
        Operation::Modify { .. } => Some(MicroOperation::Modify),
        Operation::Rename { .. } | Operation::Move { .. } => Some(MicroOperation::Rename),
        Operation::Compare { .. } => Some(MicroOperation::Compare),
        Operation::Lookup { .. } => Some(MicroOperation::Read),
        Operation::Search { .. } => Some(MicroOperation::Search),
        _ => None,
    }
}

fn denied(dn: &str) -> LdapError {
    LdapError::new(LdapResultCode::InsufficientAccessRights, format!("access denied to {dn}"))
}

/// Evaluates ACI tuples for the current principal against the entry-level
/// operation being attempted. When no tuple applies the request falls
/// through to [`DefaultAuthorization`], which supplies the admin/self
/// fallback policy used while ACI evaluation is disabled or silent.
pub struct AciAuthorization {
    engine: Arc<Engine>,
    store: Arc<dyn StoreBackend>,
    evaluator: Arc<Evaluator>,
    enabled: bool,
}

impl AciAuthorization {
    pub fn new(engine: Arc<Engine>, store: Arc<dyn StoreBackend>, evaluator: Arc<Evaluator>, enabled: bool) -> Self {
        AciAuthorization { engine, store, evaluator, enabled }
    }

    fn check(&self, ctx: &OperationContext) -> Outcome<()> {
        if !self.enabled {
            return Ok(());
        }
        let Some(dn) = target_dn(&ctx.operation) else { return Ok(()) };
        let Some(op) = micro_op(&ctx.operation) else { return Ok(()) };
        let Ok((id, _)) = self.store.lookup(dn) else { return Ok(()) };
        let parent_dn = dn.parent();
        let req = AcRequest {
            requester: ctx.principal.clone(),
            target_dn: dn.clone(),
            target_id: id,
            parent_dn,
            operation: op,
            item: Item::Entry,
        };
        let allowed = self.engine.evaluate(&req, &self.store, &self.evaluator).map_err(IntoLdapError::into_ldap_error)?;
        if allowed {
            Ok(())
        } else {
            Err(denied(&dn.render(directoryd_dn::Style::User)))
        }
    }
}

macro_rules! gate {
    ($fn_name:ident, $ret:ty) => {
        fn $fn_name(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<$ret>) -> Outcome<$ret> {
            self.check(ctx)?;
            next(ctx)
        }
    };
}

impl Handlers for AciAuthorization {
    gate!(on_add, EntryId);
    gate!(on_delete, ());
    gate!(on_modify, ());
    gate!(on_rename, ());
    gate!(on_move, ());
    gate!(on_lookup, Entry);
    gate!(on_compare, bool);

    fn on_search(
        &self,
        ctx: &mut OperationContext,
        next: &dyn Fn(&mut OperationContext) -> Outcome<Vec<(EntryId, Entry)>>,
    ) -> Outcome<Vec<(EntryId, Entry)>> {
        self.check(ctx)?;
        next(ctx)
    }
}

/// The fallback policy applied when ACI evaluation is disabled: the bound
/// identity may act on entries it owns (`self`) or when bound with
/// `Strong` authentication (treated as administrative), matching the
/// teacher's "admin/self permissions" default.
pub struct DefaultAuthorization {
    enabled: bool,
}

impl DefaultAuthorization {
    pub fn new(enabled: bool) -> Self {
        DefaultAuthorization { enabled }
    }

    fn check(&self, ctx: &OperationContext) -> Outcome<()> {
        if !self.enabled {
            return Ok(());
        }
        if ctx.principal.level == directoryd_auth::AuthenticationLevel::Strong {
            return Ok(());
        }
        let Some(dn) = target_dn(&ctx.operation) else { return Ok(()) };
        let norm = directoryd_dn::AsciiLowerNormalizer;
        match &ctx.principal.dn {
            Some(bound) if bound.equals(dn, &norm) => Ok(()),
            _ => Err(denied(&dn.render(directoryd_dn::Style::User))),
        }
    }
}

impl Handlers for DefaultAuthorization {
    gate!(on_add, EntryId);
    gate!(on_delete, ());
    gate!(on_modify, ());
    gate!(on_rename, ());
    gate!(on_move, ());
    gate!(on_compare, bool);
}
