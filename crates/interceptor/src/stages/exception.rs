use super::prelude::*;

/// The single point that translates lower-layer errors into LDAP result
/// codes; every stage below this one in the chain returns a plain
/// `LdapError` already, so this stage is a pass-through placeholder that
/// documents where translation happens (see `result_code::IntoLdapError`,
/// called at each store/schema/filter/auth/acl crate boundary) and is the
/// natural place to add error-rate metrics or structured logging of
/// failures without touching the stages that produce them.
#[derive(Default)]
pub struct Exception;

impl Exception {
    pub fn new() -> Self {
        Exception
    }
}

macro_rules! logged {
    ($fn_name:ident, $ret:ty, $label:literal) => {
        fn $fn_name(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<$ret>) -> Outcome<$ret> {
            let result = next(ctx);
            if let Err(e) = &result {
                tracing::warn!(operation = $label, code = ?e.code, message = %e.message, "operation failed");
            }
            result
        }
    };
}

impl Handlers for Exception {
    logged!(on_add, EntryId, "add");
    logged!(on_delete, (), "delete");
    logged!(on_modify, (), "modify");
    logged!(on_rename, (), "rename");
    logged!(on_move, (), "move");
    logged!(on_bind, Principal, "bind");
    logged!(on_unbind, (), "unbind");
    logged!(on_search, Vec<(EntryId, Entry)>, "search");
    logged!(on_lookup, Entry, "lookup");
    logged!(on_compare, bool, "compare");
    logged!(on_extended, Option<Vec<u8>>, "extended");
    logged!(on_abandon, (), "abandon");
}
