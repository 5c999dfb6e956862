//! Distinguished name parsing/rendering and LDIF change-record codec.
//!
//! This crate has no schema dependency of its own: normalization is
//! delegated to the [`AttributeNormalizer`] trait so that a schema-aware
//! implementation can be supplied by a caller without creating a dependency
//! cycle between the two crates.

mod dn;
mod error;
mod escape;
mod ldif;
mod rdn;

pub use dn::{parse, AsciiLowerNormalizer, AttributeNormalizer, Dn, Style};
pub use error::{DnError, LdifError};
pub use escape::{escape_to_string, unescape};
pub use ldif::{is_safe_string, parse_ldif, render_ldif, reverse, Attrs, ChangeRecord, Mod};
pub use rdn::{Ava, Rdn};
