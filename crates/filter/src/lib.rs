//! Filter tree evaluation, index-backed candidate-set planning, and the
//! search cursor pipeline: the layer above [`directoryd_store`] that turns
//! an RFC 4511 filter plus a scope into a lazy stream of matching entries.

mod cursor;
mod error;
mod eval;
mod persistent;
mod resolver;
mod tree;

pub use cursor::{CancellationToken, Cursor};
pub use error::{FilterError, Result};
pub use eval::Evaluator;
pub use persistent::{Batch, Event, Notifier, Subscriber};
pub use resolver::{ResolvedAttr, SchemaContext};
pub use tree::{ExtensibleMatch, Filter};
