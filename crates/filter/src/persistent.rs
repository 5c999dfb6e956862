use crate::eval::Evaluator;
use crate::tree::Filter;
use directoryd_store::{Entry, EntryId};
use std::sync::mpsc::{Receiver, SendError, Sender};
use std::sync::Arc;

/// A structural change to the entry set, keyed by entry-id — the
/// persistent-search analogue of the teacher's `sled::Event::{Insert,
/// Remove}`, generalized from byte-key deltas to whole entries.
#[derive(Clone, Debug)]
pub enum Event {
    Insert(EntryId, Entry),
    Remove(EntryId),
}

/// A batch of change notifications delivered to one persistent-search
/// registration.
pub type Batch = Vec<Event>;

/// The publishing side a store-mutating caller holds; every interceptor
/// chain invocation that commits an add/delete/modify/rename/move publishes
/// here before returning to its caller.
#[derive(Clone)]
pub struct Notifier {
    subscribers: Arc<parking_lot::Mutex<Vec<Sender<Event>>>>,
}

impl Default for Notifier {
    fn default() -> Self {
        Notifier {
            subscribers: Arc::new(parking_lot::Mutex::new(Vec::new())),
        }
    }
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscriber {
        let (tx, rx) = std::sync::mpsc::channel();
        self.subscribers.lock().push(tx);
        Subscriber { rx }
    }

    pub fn publish(&self, event: Event) {
        let mut subs = self.subscribers.lock();
        subs.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// One client's persistent-search registration: a channel of raw [`Event`]s
/// plus the filter/scope it was registered with, so `poll` only surfaces
/// events the client actually asked for.
pub struct Subscriber {
    rx: Receiver<Event>,
}

impl Subscriber {
    /// Blocks for the next event. Returns `Err` once every [`Notifier`]
    /// clone that could feed this subscriber has been dropped.
    pub fn recv(&self) -> Result<Event, std::sync::mpsc::RecvError> {
        self.rx.recv()
    }

    pub fn try_recv(&self) -> Option<Event> {
        self.rx.try_recv().ok()
    }

    /// Drains every currently-queued event matching `filter`, evaluated
    /// against the event's entry for `Insert` (an entry that no longer
    /// matches a standing search's filter is reported as a `Remove`).
    pub fn poll_matching(&self, evaluator: &Evaluator, filter: &Filter) -> Batch {
        let mut out = Vec::new();
        while let Some(event) = self.try_recv() {
            match &event {
                Event::Insert(_, entry) => {
                    if evaluator.matches(filter, entry).unwrap_or(false) {
                        out.push(event);
                    }
                }
                Event::Remove(_) => out.push(event),
            }
        }
        out
    }
}

pub type PublishError = SendError<Event>;
