//! ACI tuple access-control evaluator: RFC 2829/4523-style tuples (user
//! class, authentication-level precondition, protected items, permitted
//! micro-operations, grant/deny, precedence) joined against one access
//! request via a small Datalog program, with denies-override-grants
//! precedence arbitration done afterward in plain Rust.

mod engine;
mod error;
mod request;
mod tuple;

pub use engine::Engine;
pub use error::{AcError, Result};
pub use request::{Item, Request};
pub use tuple::{AciTuple, MicroOperation, ProtectedItem, SubtreeSpec, UserClass};
