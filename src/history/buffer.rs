//! Bounded FIFO tick buffer

use crate::feed::Tick;
use std::collections::VecDeque;

/// Fixed-capacity ordered sequence of ticks for one symbol
///
/// Oldest tick first. When full, appending evicts exactly one tick from the
/// front before pushing the new one to the back.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    ticks: VecDeque<Tick>,
    capacity: usize,
}

impl HistoryBuffer {
    /// Create an empty buffer holding at most `capacity` ticks
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ticks: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a tick, evicting the oldest one if the buffer is full
    ///
    /// Returns the evicted tick, if any.
    pub fn append(&mut self, tick: Tick) -> Option<Tick> {
        let evicted = if self.ticks.len() == self.capacity {
            self.ticks.pop_front()
        } else {
            None
        };
        self.ticks.push_back(tick);
        evicted
    }

    /// Independent copy of the buffered ticks, oldest first
    pub fn snapshot(&self) -> Vec<Tick> {
        self.ticks.iter().cloned().collect()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}
