//! Serial action queue
//!
//! At most one action runs at a time; the next starts only after the current
//! one is completed. The queue is a plain FIFO with a running flag; the
//! orchestrator drains it and reports the empty transition exactly once.

use std::collections::VecDeque;

/// Serial scheduler over opaque action payloads.
#[derive(Debug)]
pub struct ActionQueue<T> {
    pending: VecDeque<T>,
    running: bool,
    empty_seen: bool,
}

impl<T> ActionQueue<T> {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            running: false,
            empty_seen: false,
        }
    }

    /// Append an action. Draining resumes through `take_next`.
    pub fn enqueue(&mut self, action: T) {
        self.pending.push_back(action);
        self.empty_seen = false;
    }

    /// Hand out the next action if none is running, marking the queue
    /// running. Callers must call `complete` when the action finishes.
    pub fn take_next(&mut self) -> Option<T> {
        if self.running {
            return None;
        }
        let next = self.pending.pop_front();
        if next.is_some() {
            self.running = true;
        }
        next
    }

    /// Mark the running action finished.
    pub fn complete(&mut self) {
        self.running = false;
    }

    /// Discard all pending actions. A running action is unaffected and must
    /// still be completed by its owner.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// True exactly once per observed empty-and-idle transition; re-armed by
    /// the next `enqueue`.
    pub fn poll_empty(&mut self) -> bool {
        if self.running || !self.pending.is_empty() || self.empty_seen {
            return false;
        }
        self.empty_seen = true;
        true
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_idle(&self) -> bool {
        !self.running && self.pending.is_empty()
    }
}

impl<T> Default for ActionQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
