// src/events/event_queue.rs
//! Ordered, capacity-bounded event buffer
//!
//! Events are kept in insertion order and delivered in that order. The
//! admission check accepts an event while `len <= capacity`, so the queue can
//! hold at most `capacity + 1` events.

use std::mem;

/// Pending events awaiting delivery
#[derive(Debug)]
pub struct EventQueue<E> {
    /// Buffered events, oldest first
    events: Vec<E>,

    /// Configured bound
    capacity: usize,

    /// Accepted counter
    accepted: u64,

    /// Rejected counter (queue full)
    rejected: u64,

    /// Delivered counter
    delivered: u64,
}

impl<E> EventQueue<E> {
    /// Create an empty queue
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Vec::new(),
            capacity,
            accepted: 0,
            rejected: 0,
            delivered: 0,
        }
    }

    /// Append an event at the tail.
    ///
    /// Returns `false` without touching the queue when it is over capacity.
    pub fn enqueue(&mut self, event: E) -> bool {
        if self.events.len() > self.capacity {
            self.rejected += 1;
            return false;
        }

        self.events.push(event);
        self.accepted += 1;
        true
    }

    /// Current contents in insertion order
    pub fn snapshot(&self) -> &[E] {
        &self.events
    }

    /// Swap in a fresh buffer and hand back everything queued so far
    pub fn take_batch(&mut self) -> Vec<E> {
        mem::take(&mut self.events)
    }

    /// Put a batch that failed to deliver back in front of anything queued
    /// since it was taken.
    pub fn restore_batch(&mut self, mut batch: Vec<E>) {
        batch.append(&mut self.events);
        self.events = batch;
    }

    /// Record a successfully delivered batch
    pub fn mark_delivered(&mut self, count: usize) {
        self.delivered += count as u64;
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get queue statistics
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            accepted: self.accepted,
            rejected: self.rejected,
            delivered: self.delivered,
            current_size: self.events.len(),
            capacity: self.capacity,
        }
    }
}

/// Queue statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    /// Total events accepted
    pub accepted: u64,

    /// Total events rejected (queue full)
    pub rejected: u64,

    /// Total events delivered by a successful flush
    pub delivered: u64,

    /// Current queue size
    pub current_size: usize,

    /// Configured capacity
    pub capacity: usize,
}

impl QueueStats {
    /// Calculate rejection rate
    pub fn rejection_rate(&self) -> f64 {
        let offered = self.accepted + self.rejected;
        if offered == 0 {
            0.0
        } else {
            (self.rejected as f64 / offered as f64) * 100.0
        }
    }
}
