//! FIFO ready queue keyed by process index

use std::collections::VecDeque;

/// FIFO of process indices with an O(1) membership flag per process
#[derive(Debug, Clone)]
pub(crate) struct ReadyQueue {
    order: VecDeque<usize>,
    queued: Vec<bool>,
}

impl ReadyQueue {
    /// Queue able to hold indices `0..capacity`
    pub(crate) fn new(capacity: usize) -> Self {
        ReadyQueue {
            order: VecDeque::new(),
            queued: vec![false; capacity],
        }
    }

    /// Append at the tail. Returns false if the index is already queued.
    pub(crate) fn push(&mut self, index: usize) -> bool {
        if self.queued[index] {
            return false;
        }
        self.queued[index] = true;
        self.order.push_back(index);
        true
    }

    pub(crate) fn pop(&mut self) -> Option<usize> {
        let index = self.order.pop_front()?;
        self.queued[index] = false;
        Some(index)
    }

    /// Empty the queue, returning its members in FIFO order
    pub(crate) fn take(&mut self) -> Vec<usize> {
        let members: Vec<usize> = self.order.drain(..).collect();
        for &index in &members {
            self.queued[index] = false;
        }
        members
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.order.iter().copied()
    }
}
