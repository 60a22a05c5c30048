//! Fan-out of index events to subscribers
//!
//! Every subscriber owns an unbounded channel, so publishing never blocks on
//! a slow reader. A subscriber that stops draining its receiver without
//! dropping it will accumulate events in memory indefinitely.

use std::sync::mpsc::{self, Receiver, Sender};

use parking_lot::Mutex;

pub struct Publisher<E> {
    subscribers: Mutex<Vec<Sender<E>>>,
}

impl<E: Clone> Publisher<E> {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Registers a new subscriber; it sees events published from now on
    pub fn subscribe(&self) -> Receiver<E> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Sends `event` to every live subscriber, pruning dropped receivers
    pub fn publish(&self, event: E) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl<E: Clone> Default for Publisher<E> {
    fn default() -> Self {
        Self::new()
    }
}
