pub(crate) mod prelude;

pub mod administrative_point;
pub mod authentication;
pub mod authorization;
pub mod changelog;
pub mod collective;
pub mod event;
pub mod exception;
pub mod normalization;
pub mod operational_attribute;
pub mod referral;
pub mod schema;
pub mod store_adapter;
pub mod subentry;
pub mod trigger;

pub use administrative_point::AdministrativePoint;
pub use authentication::Authentication;
pub use authorization::{AciAuthorization, DefaultAuthorization};
pub use changelog::Changelog;
pub use collective::Collective;
pub use event::Event;
pub use exception::Exception;
pub use normalization::Normalization;
pub use operational_attribute::OperationalAttribute;
pub use referral::Referral;
pub use schema::Schema;
pub use store_adapter::StoreAdapter;
pub use subentry::Subentry;
pub use trigger::{Procedure, Trigger, TriggerEvent, TriggerSpec};
