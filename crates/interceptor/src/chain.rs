use crate::context::OperationContext;
use crate::handlers::{Handlers, Outcome};
use std::collections::HashSet;
use std::sync::Arc;

/// The ordered, named, bypassable stage list. Walked outside-in: each
/// stage's `next` argument is a closure that continues into the remaining
/// stages, terminating at whatever closure the caller supplies as the
/// store adapter (stage 14).
pub struct Chain {
    stages: Vec<(&'static str, Arc<dyn Handlers>)>,
}

impl Chain {
    pub fn new(stages: Vec<(&'static str, Arc<dyn Handlers>)>) -> Self {
        Chain { stages }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|(name, _)| *name).collect()
    }

    fn active(&self, bypass: &HashSet<&'static str>) -> Vec<Arc<dyn Handlers>> {
        self.stages.iter().filter(|(name, _)| !bypass.contains(name)).map(|(_, h)| h.clone()).collect()
    }
}

/// Generates one `dispatch_*` method per operation kind: each folds the
/// active stage list into a chain of closures ending at `terminal`. The
/// duplication across operation kinds is mechanical (the fold shape is
/// identical; only the handler method and return type differ), so it's
/// generated rather than hand-repeated eleven times.
macro_rules! dispatch {
    ($name:ident, $method:ident, $ret:ty) => {
        impl Chain {
            pub fn $name(
                &self,
                ctx: &mut OperationContext,
                bypass: &HashSet<&'static str>,
                terminal: &dyn Fn(&mut OperationContext) -> Outcome<$ret>,
            ) -> Outcome<$ret> {
                let active = self.active(bypass);
                Self::fold(&active, 0, ctx, terminal, |h, ctx, next| h.$method(ctx, next))
            }
        }
    };
}

impl Chain {
    fn fold<T>(
        stages: &[Arc<dyn Handlers>],
        i: usize,
        ctx: &mut OperationContext,
        terminal: &dyn Fn(&mut OperationContext) -> Outcome<T>,
        call: impl Fn(&Arc<dyn Handlers>, &mut OperationContext, &dyn Fn(&mut OperationContext) -> Outcome<T>) -> Outcome<T> + Copy,
    ) -> Outcome<T> {
        match stages.get(i) {
            None => terminal(ctx),
            Some(stage) => {
                let next = move |ctx: &mut OperationContext| Self::fold(stages, i + 1, ctx, terminal, call);
                call(stage, ctx, &next)
            }
        }
    }
}

dispatch!(dispatch_add, on_add, directoryd_store::EntryId);
dispatch!(dispatch_delete, on_delete, ());
dispatch!(dispatch_modify, on_modify, ());
dispatch!(dispatch_rename, on_rename, ());
dispatch!(dispatch_move, on_move, ());
dispatch!(dispatch_bind, on_bind, directoryd_auth::Principal);
dispatch!(dispatch_unbind, on_unbind, ());
dispatch!(dispatch_search, on_search, Vec<(directoryd_store::EntryId, directoryd_store::Entry)>);
dispatch!(dispatch_lookup, on_lookup, directoryd_store::Entry);
dispatch!(dispatch_compare, on_compare, bool);
dispatch!(dispatch_extended, on_extended, Option<Vec<u8>>);
dispatch!(dispatch_abandon, on_abandon, ());
