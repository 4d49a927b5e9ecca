use priority_queue::PriorityQueue;
use std::cmp::Eq;
use std::cmp::Reverse;
use std::hash::Hash;

use crate::types::NanoTime;

/// Queue of Ts by time.
// Priorities are (time, sequence) so that values due at the same time
// come out in the order they were pushed.
#[derive(Debug)]
pub(crate) struct TimeQueue<T: Hash + Eq> {
    queue: PriorityQueue<T, Reverse<(NanoTime, u64)>>,
    sequence: u64,
}

impl<T: Hash + Eq> TimeQueue<T> {
    pub fn new() -> Self {
        Self {
            queue: PriorityQueue::new(),
            sequence: 0,
        }
    }

    pub fn next_time(&self) -> Option<NanoTime> {
        self.queue.peek().map(|(_, priority)| priority.0.0)
    }

    /// The latest time currently queued.
    pub fn last_time(&self) -> Option<NanoTime> {
        self.queue.iter().map(|(_, priority)| priority.0.0).max()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn push(&mut self, value: T, time: NanoTime) {
        let sequence = self.sequence;
        self.sequence += 1;
        self.queue.push(value, Reverse((time, sequence)));
    }

    pub fn peek(&self) -> Option<(&T, NanoTime)> {
        self.queue
            .peek()
            .map(|(value, priority)| (value, priority.0.0))
    }

    pub fn pop(&mut self) -> Option<(T, NanoTime)> {
        self.queue
            .pop()
            .map(|(value, priority)| (value, priority.0.0))
    }

    /// Pops the head if it is due at or before `current_time`.
    pub fn pop_due(&mut self, current_time: NanoTime) -> Option<(T, NanoTime)> {
        if self.pending(current_time) {
            self.pop()
        } else {
            None
        }
    }

    pub fn remove(&mut self, value: &T) -> bool {
        self.queue.remove(value).is_some()
    }

    pub fn pending(&self, current_time: NanoTime) -> bool {
        match self.next_time() {
            Some(time) => time <= current_time,
            None => false,
        }
    }
}
