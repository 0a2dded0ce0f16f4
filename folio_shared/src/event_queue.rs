use std::collections::{vec_deque, VecDeque};

/// FIFO of events that a component produces and its host drains.
#[derive(Debug)]
pub struct EventQueue<T> {
    events: VecDeque<T>,
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        Self { events: VecDeque::new() }
    }

    pub fn push(&mut self, event: T) {
        self.events.push_back(event);
    }

    pub fn pop(&mut self) -> Option<T> {
        self.events.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Moves all queued events into a new queue and leaves this one empty.
    pub fn take(&mut self) -> Self {
        Self {
            events: std::mem::take(&mut self.events),
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl<T> IntoIterator for EventQueue<T> {
    type Item = T;
    type IntoIter = vec_deque::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}
