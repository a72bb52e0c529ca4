//! Bounded FIFO of admitted-but-not-yet-served tasks.

use std::collections::VecDeque;

use super::task::Task;

/// FIFO queue that never holds more than `capacity` tasks.
#[derive(Debug)]
pub struct StationQueue {
    items: VecDeque<Task>,
    capacity: usize,
}

impl StationQueue {
    pub fn new(capacity: usize) -> Self {
        StationQueue {
            items: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Append `task` at the tail. A full queue hands the task back.
    pub fn try_push(&mut self, task: Task) -> Result<usize, Task> {
        if self.is_full() {
            return Err(task);
        }
        self.items.push_back(task);
        Ok(self.items.len())
    }

    /// Remove the task at the head.
    pub fn pop(&mut self) -> Option<Task> {
        self.items.pop_front()
    }

    /// Inspect the task at the head.
    pub fn front(&self) -> Option<&Task> {
        self.items.front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Remove every queued task, head first.
    pub fn drain(&mut self) -> impl Iterator<Item = Task> + '_ {
        self.items.drain(..)
    }
}
