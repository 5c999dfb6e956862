use super::prelude::*;
use std::sync::Arc;

/// A stored procedure invoked when a trigger specification matches a
/// committed operation. Kept as a plain trait object rather than a
/// scripting runtime: this crate provides the matching/dispatch machinery,
/// not a procedure language.
pub trait Procedure: Send + Sync {
    fn invoke(&self, ctx: &OperationContext);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerEvent {
    Add,
    Delete,
    Modify,
    Rename,
    Move,
    Any,
}

impl TriggerEvent {
    fn matches(self, op: &Operation) -> bool {
        match (self, op) {
            (TriggerEvent::Any, _) => true,
            (TriggerEvent::Add, Operation::Add { .. }) => true,
            (TriggerEvent::Delete, Operation::Delete { .. }) => true,
            (TriggerEvent::Modify, Operation::Modify { .. }) => true,
            (TriggerEvent::Rename, Operation::Rename { .. }) => true,
            (TriggerEvent::Move, Operation::Move { .. }) => true,
            _ => false,
        }
    }
}

pub struct TriggerSpec {
    pub name: String,
    pub on: TriggerEvent,
    pub procedure: Arc<dyn Procedure>,
}

/// Invokes every registered [`TriggerSpec`] whose event matches a committed
/// write, after the write has already succeeded. A procedure failure is
/// logged, not propagated — triggers observe commits, they don't gate them.
pub struct Trigger {
    specs: Vec<TriggerSpec>,
}

impl Trigger {
    pub fn new(specs: Vec<TriggerSpec>) -> Self {
        Trigger { specs }
    }

    fn fire(&self, op: &Operation, ctx: &OperationContext) {
        for spec in &self.specs {
            if spec.on.matches(op) {
                tracing::debug!(trigger = %spec.name, "invoking stored procedure");
                spec.procedure.invoke(ctx);
            }
        }
    }
}

macro_rules! fire_after {
    ($fn_name:ident, $ret:ty) => {
        fn $fn_name(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<$ret>) -> Outcome<$ret> {
            let result = next(ctx)?;
            self.fire(&ctx.operation.clone(), ctx);
            Ok(result)
        }
    };
}

impl Handlers for Trigger {
    fire_after!(on_add, EntryId);
    fire_after!(on_delete, ());
    fire_after!(on_modify, ());
    fire_after!(on_rename, ());
    fire_after!(on_move, ());
}
