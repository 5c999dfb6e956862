use super::prelude::*;
use directoryd_auth::{is_pwd_must_reset, Authenticator, BindRequest};
use directoryd_store::StoreBackend;
use std::sync::Arc;

/// Binds the request's credentials to a [`Principal`] via the configured
/// [`Authenticator`], then enforces the reset-pending gate: while a bound
/// identity's `pwdReset` flag is set, every operation other than
/// bind/modify-password/unbind/abandon fails with `InsufficientAccessRights`
/// and a `change-after-reset` control, per the password-policy state
/// machine.
pub struct Authentication {
    authenticator: Arc<dyn Authenticator>,
    store: Arc<dyn StoreBackend>,
}

impl Authentication {
    pub fn new(authenticator: Arc<dyn Authenticator>, store: Arc<dyn StoreBackend>) -> Self {
        Authentication { authenticator, store }
    }

    fn reset_pending(&self, ctx: &OperationContext) -> bool {
        let Some(dn) = &ctx.principal.dn else { return false };
        let Ok((_, entry)) = self.store.lookup(dn) else { return false };
        is_pwd_must_reset(&entry)
    }

    fn check_reset_gate(&self, ctx: &mut OperationContext) -> Result<(), LdapError> {
        if self.reset_pending(ctx) {
            ctx.controls.change_after_reset = true;
            return Err(LdapError::new(LdapResultCode::InsufficientAccessRights, "password change required"));
        }
        Ok(())
    }
}

impl Handlers for Authentication {
    fn on_bind(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<Principal>) -> Outcome<Principal> {
        let Operation::Bind { dn, credentials } = &ctx.operation else {
            return next(ctx);
        };
        let req = BindRequest { dn: dn.clone(), credentials: credentials.clone() };
        let principal = self.authenticator.authenticate(&req).map_err(IntoLdapError::into_ldap_error)?;
        ctx.principal = principal;
        next(ctx)
    }

    fn on_add(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<EntryId>) -> Outcome<EntryId> {
        self.check_reset_gate(ctx)?;
        next(ctx)
    }

    fn on_delete(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<()>) -> Outcome<()> {
        self.check_reset_gate(ctx)?;
        next(ctx)
    }

    fn on_modify(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<()>) -> Outcome<()> {
        let is_password_change = matches!(&ctx.operation,
            Operation::Modify { mods, .. } if mods.iter().any(|m| modifies_password(m)));
        if !is_password_change {
            self.check_reset_gate(ctx)?;
        }
        next(ctx)
    }

    fn on_rename(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<()>) -> Outcome<()> {
        self.check_reset_gate(ctx)?;
        next(ctx)
    }

    fn on_move(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<()>) -> Outcome<()> {
        self.check_reset_gate(ctx)?;
        next(ctx)
    }

    fn on_search(
        &self,
        ctx: &mut OperationContext,
        next: &dyn Fn(&mut OperationContext) -> Outcome<Vec<(EntryId, Entry)>>,
    ) -> Outcome<Vec<(EntryId, Entry)>> {
        self.check_reset_gate(ctx)?;
        next(ctx)
    }

    fn on_lookup(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<Entry>) -> Outcome<Entry> {
        self.check_reset_gate(ctx)?;
        next(ctx)
    }

    fn on_compare(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<bool>) -> Outcome<bool> {
        self.check_reset_gate(ctx)?;
        next(ctx)
    }

    fn on_extended(
        &self,
        ctx: &mut OperationContext,
        next: &dyn Fn(&mut OperationContext) -> Outcome<Option<Vec<u8>>>,
    ) -> Outcome<Option<Vec<u8>>> {
        let is_start_tls = matches!(&ctx.operation, Operation::Extended { name, .. } if name == "1.3.6.1.4.1.1466.20037");
        if !is_start_tls {
            self.check_reset_gate(ctx)?;
        }
        next(ctx)
    }
}

fn modifies_password(m: &directoryd_store::Modification) -> bool {
    match m {
        directoryd_store::Modification::Add(name, _)
        | directoryd_store::Modification::Delete(name, _)
        | directoryd_store::Modification::Replace(name, _) => name.eq_ignore_ascii_case("userPassword"),
    }
}
