//! The ordered, bypassable interceptor chain wired between the protocol
//! front-end and the entry store: normalization, authentication, referral
//! handling, access control (ACI then default-policy fallback),
//! administrative-point tracking, error translation, schema validation,
//! operational-attribute maintenance, subentry/collective-attribute
//! expansion, change-event publication, stored-procedure triggers, an
//! optional changelog sink, and finally the store adapter itself.

mod chain;
mod context;
mod handlers;
mod result_code;
pub mod stages;

pub use chain::Chain;
pub use context::{Operation, OperationContext, ResponseControls};
pub use handlers::{Handlers, Outcome};
pub use result_code::{IntoLdapError, LdapError, LdapResultCode};
pub use stages::{
    AciAuthorization, AdministrativePoint, Authentication, Changelog, Collective, DefaultAuthorization, Event,
    Exception, Normalization, OperationalAttribute, Procedure, Referral, Schema, StoreAdapter,
    Subentry, Trigger, TriggerEvent, TriggerSpec,
};
