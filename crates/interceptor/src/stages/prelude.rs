pub(crate) use crate::context::{Operation, OperationContext};
pub(crate) use crate::handlers::{Handlers, Outcome};
pub(crate) use crate::result_code::{IntoLdapError, LdapError, LdapResultCode};
pub(crate) use directoryd_auth::Principal;
pub(crate) use directoryd_store::{Entry, EntryId};
