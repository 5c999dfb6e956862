use super::prelude::*;
use directoryd_dn::AsciiLowerNormalizer;

/// Canonicalizes every DN an operation carries against the schema's
/// attribute-name normalization before anything downstream sees it, so
/// every later stage can compare DNs structurally instead of
/// case/whitespace-sensitively.
pub struct Normalization;

impl Normalization {
    fn normalize_dn(dn: &directoryd_dn::Dn) -> directoryd_dn::Dn {
        dn.normalize(&AsciiLowerNormalizer)
    }
}

impl Handlers for Normalization {
    fn on_add(
        &self,
        ctx: &mut OperationContext,
        next: &dyn Fn(&mut OperationContext) -> Outcome<EntryId>,
    ) -> Outcome<EntryId> {
        if let Operation::Add { dn, .. } = &mut ctx.operation {
            *dn = Self::normalize_dn(dn);
        }
        next(ctx)
    }

    fn on_delete(
        &self,
        ctx: &mut OperationContext,
        next: &dyn Fn(&mut OperationContext) -> Outcome<()>,
    ) -> Outcome<()> {
        if let Operation::Delete { dn } = &mut ctx.operation {
            *dn = Self::normalize_dn(dn);
        }
        next(ctx)
    }

    fn on_modify(
        &self,
        ctx: &mut OperationContext,
        next: &dyn Fn(&mut OperationContext) -> Outcome<()>,
    ) -> Outcome<()> {
        if let Operation::Modify { dn, .. } = &mut ctx.operation {
            *dn = Self::normalize_dn(dn);
        }
        next(ctx)
    }

    fn on_rename(
        &self,
        ctx: &mut OperationContext,
        next: &dyn Fn(&mut OperationContext) -> Outcome<()>,
    ) -> Outcome<()> {
        if let Operation::Rename { dn, .. } = &mut ctx.operation {
            *dn = Self::normalize_dn(dn);
        }
        next(ctx)
    }

    fn on_move(
        &self,
        ctx: &mut OperationContext,
        next: &dyn Fn(&mut OperationContext) -> Outcome<()>,
    ) -> Outcome<()> {
        if let Operation::Move { dn, new_superior } = &mut ctx.operation {
            *dn = Self::normalize_dn(dn);
            *new_superior = Self::normalize_dn(new_superior);
        }
        next(ctx)
    }

    fn on_bind(
        &self,
        ctx: &mut OperationContext,
        next: &dyn Fn(&mut OperationContext) -> Outcome<Principal>,
    ) -> Outcome<Principal> {
        if let Operation::Bind { dn: Some(dn), .. } = &mut ctx.operation {
            *dn = Self::normalize_dn(dn);
        }
        next(ctx)
    }

    fn on_search(
        &self,
        ctx: &mut OperationContext,
        next: &dyn Fn(
            &mut OperationContext,
        ) -> Outcome<Vec<(EntryId, Entry)>>,
    ) -> Outcome<Vec<(EntryId, Entry)>> {
        if let Operation::Search { base, .. } = &mut ctx.operation {
            *base = Self::normalize_dn(base);
        }
        next(ctx)
    }

    fn on_lookup(
        &self,
        ctx: &mut OperationContext,
        next: &dyn Fn(&mut OperationContext) -> Outcome<Entry>,
    ) -> Outcome<Entry> {
        if let Operation::Lookup { dn, .. } = &mut ctx.operation {
            *dn = Self::normalize_dn(dn);
        }
        next(ctx)
    }

    fn on_compare(
        &self,
        ctx: &mut OperationContext,
        next: &dyn Fn(&mut OperationContext) -> Outcome<bool>,
    ) -> Outcome<bool> {
        if let Operation::Compare { dn, .. } = &mut ctx.operation {
            *dn = Self::normalize_dn(dn);
        }
        next(ctx)
    }
}
