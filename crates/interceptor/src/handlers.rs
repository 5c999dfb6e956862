use crate::context::OperationContext;
use crate::result_code::LdapError;
use directoryd_store::{Entry, EntryId};

pub type Outcome<T> = std::result::Result<T, LdapError>;

/// One stage in the chain. Every method defaults to a pass-through no-op so
/// a stage only needs to override the handful of operations it actually
/// cares about — mirrors the default-provided-methods shape of a registry
/// dispatch trait, generalized from per-effect-type dispatch to
/// per-LDAP-operation dispatch.
pub trait Handlers: Send + Sync {
    fn on_add(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<EntryId>) -> Outcome<EntryId> {
        next(ctx)
    }

    fn on_delete(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<()>) -> Outcome<()> {
        next(ctx)
    }

    fn on_modify(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<()>) -> Outcome<()> {
        next(ctx)
    }

    fn on_rename(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<()>) -> Outcome<()> {
        next(ctx)
    }

    fn on_move(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<()>) -> Outcome<()> {
        next(ctx)
    }

    fn on_bind(
        &self,
        ctx: &mut OperationContext,
        next: &dyn Fn(&mut OperationContext) -> Outcome<directoryd_auth::Principal>,
    ) -> Outcome<directoryd_auth::Principal> {
        next(ctx)
    }

    fn on_unbind(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<()>) -> Outcome<()> {
        next(ctx)
    }

    fn on_search(
        &self,
        ctx: &mut OperationContext,
        next: &dyn Fn(&mut OperationContext) -> Outcome<Vec<(EntryId, Entry)>>,
    ) -> Outcome<Vec<(EntryId, Entry)>> {
        next(ctx)
    }

    fn on_lookup(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<Entry>) -> Outcome<Entry> {
        next(ctx)
    }

    fn on_compare(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<bool>) -> Outcome<bool> {
        next(ctx)
    }

    fn on_extended(
        &self,
        ctx: &mut OperationContext,
        next: &dyn Fn(&mut OperationContext) -> Outcome<Option<Vec<u8>>>,
    ) -> Outcome<Option<Vec<u8>>> {
        next(ctx)
    }

    fn on_abandon(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<()>) -> Outcome<()> {
        next(ctx)
    }
}
