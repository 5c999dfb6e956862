//! Entry store: a master table plus secondary indices (presence, equality,
//! alias posting lists) behind the [`StoreBackend`] trait, with two
//! interchangeable physical forms: [`SledBackend`] (native, crash-safe) and
//! [`LdifBackend`] (one human-readable file per entry).

mod backend;
mod error;
mod ldif_backend;
mod model;
mod sled_backend;

pub use backend::StoreBackend;
pub use error::{Result, StoreError};
pub use ldif_backend::LdifBackend;
pub use model::{DerefMode, Entry, EntryId, Modification, Scope, ROOT_PARENT};
pub use sled_backend::{IndexPolicy, SledBackend};
