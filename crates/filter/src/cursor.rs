use crate::error::{FilterError, Result};
use crate::eval::Evaluator;
use crate::tree::Filter;
use directoryd_store::{Entry, EntryId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A cooperative cancellation flag shared between a cursor and whatever
/// holds the Abandon request for its operation — set once, observed between
/// candidates, never reset.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A lazy, finite, explicitly-closeable iterator over a search's matching
/// entries — generalized from a schema-typed value traversal into a
/// candidate-entry cursor: it re-evaluates the full filter against each
/// planned candidate (since the plan is only ever an approximation),
/// enforces the size/time budget, and checks cancellation between
/// candidates so an Abandon is observable within one entry's processing
/// time.
pub struct Cursor {
    evaluator: Arc<Evaluator>,
    filter: Filter,
    candidates: std::vec::IntoIter<EntryId>,
    size_limit: Option<usize>,
    yielded: usize,
    deadline: Option<Instant>,
    cancel: CancellationToken,
    closed: bool,
}

impl Cursor {
    pub fn new(
        evaluator: Arc<Evaluator>,
        filter: Filter,
        candidates: Vec<EntryId>,
        size_limit: Option<usize>,
        time_limit: Option<Duration>,
        cancel: CancellationToken,
    ) -> Self {
        Cursor {
            evaluator,
            filter,
            candidates: candidates.into_iter(),
            size_limit,
            yielded: 0,
            deadline: time_limit.map(|d| Instant::now() + d),
            cancel,
            closed: false,
        }
    }

    /// Releases the cursor; subsequent calls to `next` return `None`. Safe
    /// to call more than once.
    pub fn close(&mut self) {
        self.closed = true;
    }

    fn next_inner(&mut self) -> Result<Option<(EntryId, Entry)>> {
        if self.closed {
            return Ok(None);
        }
        loop {
            if self.cancel.is_cancelled() {
                self.closed = true;
                return Err(FilterError::Cancelled);
            }
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    self.closed = true;
                    return Err(FilterError::TimeLimitExceeded);
                }
            }
            if let Some(limit) = self.size_limit {
                if self.yielded >= limit {
                    self.closed = true;
                    return Err(FilterError::SizeLimitExceeded);
                }
            }
            let Some(id) = self.candidates.next() else {
                self.closed = true;
                return Ok(None);
            };
            let entry = match self.evaluator.store.lookup_by_id(id) {
                Ok(e) => e,
                Err(_) => continue,
            };
            if self.evaluator.matches(&self.filter, &entry)? {
                self.yielded += 1;
                return Ok(Some((id, entry)));
            }
        }
    }
}

impl Iterator for Cursor {
    type Item = Result<(EntryId, Entry)>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_inner() {
            Ok(Some(e)) => Some(Ok(e)),
            Ok(None) => None,
            Err(e) => {
                self.closed = true;
                Some(Err(e))
            }
        }
    }
}
