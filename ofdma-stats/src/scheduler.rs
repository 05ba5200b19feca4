//! Virtual time discrete event scheduler.
//!
//! Items are delivered in non decreasing [`Time`] order; items scheduled
//! for the same time are delivered in the order they were scheduled.

use core::cmp::Reverse;
use ofdma_stats_core::Time;
use std::{collections::BinaryHeap, time::Duration};

pub struct Scheduler<T> {
    now: Time,
    next_seq: u64,
    queue: BinaryHeap<Reverse<OrderedByTime<T>>>,
}

struct OrderedByTime<T> {
    at: Time,
    /// insertion order, breaks ties between items scheduled at the same time
    seq: u64,
    item: T,
}

impl<T> OrderedByTime<T> {
    fn key(&self) -> (Time, u64) {
        (self.at, self.seq)
    }
}

impl<T> PartialEq for OrderedByTime<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<T> Eq for OrderedByTime<T> {}

impl<T> PartialOrd for OrderedByTime<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for OrderedByTime<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now: Time::ZERO,
            next_seq: 0,
            queue: BinaryHeap::new(),
        }
    }

    /// the virtual time of the item delivered last
    #[inline]
    pub fn now(&self) -> Time {
        self.now
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn time_to_next(&self) -> Option<Time> {
        self.queue.peek().map(|v| v.0.at)
    }

    /// schedule `item` to be delivered at `at`.
    ///
    /// # Panics
    ///
    /// if `at` is in the past: the clock never goes backward.
    pub fn schedule_at(&mut self, at: Time, item: T) {
        assert!(
            at >= self.now,
            "cannot schedule at {at}, the clock already reads {}",
            self.now
        );

        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(OrderedByTime { at, seq, item }));
    }

    /// schedule `item` to be delivered `delay` after the current time
    pub fn schedule_in(&mut self, delay: Duration, item: T) {
        self.schedule_at(self.now + delay, item)
    }

    /// pop the next item and advance the clock to its time
    pub fn pop(&mut self) -> Option<(Time, T)> {
        let Reverse(next) = self.queue.pop()?;
        self.now = next.at;
        Some((next.at, next.item))
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}
