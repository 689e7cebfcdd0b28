use std::sync::{Arc, Mutex};

/// Single-slot, overwrite-on-publish handoff cell.
///
/// One producer, one or more consumers, no queueing and no
/// backpressure: publishing replaces whatever the consumer has not yet
/// picked up. Values are cloned out, so producer and consumer never
/// alias the same buffer.
#[derive(Debug)]
pub struct Latest<T> {
    slot: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for Latest<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T> Default for Latest<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Latest<T> {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Replaces the slot's content. Never blocks on a slow consumer.
    pub fn publish(&self, value: T) {
        *self.slot.lock().expect("latest cell poisoned") = Some(value);
    }

    /// Takes the value out of the slot. A second take without an
    /// intervening publish returns `None`.
    pub fn take(&self) -> Option<T> {
        self.slot.lock().expect("latest cell poisoned").take()
    }

    /// Empties the slot.
    pub fn clear(&self) {
        *self.slot.lock().expect("latest cell poisoned") = None;
    }
}

impl<T: Clone> Latest<T> {
    /// Clones the value without consuming it.
    pub fn peek(&self) -> Option<T> {
        self.slot.lock().expect("latest cell poisoned").clone()
    }
}
