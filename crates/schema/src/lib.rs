mod error;
mod model;
mod parser;
mod registry;

pub use error::{Result, SchemaError};
pub use model::{AttributeType, LdapSyntax, MatchingRule, ObjectClass, ObjectClassKind, SchemaObject, Usage};
pub use parser::parse_schema_file;
pub use registry::Registry;
