//! Bounded, append-only history of measurements and divergences.
//!
//! Both logs are fixed-capacity rings: once full, each append evicts the
//! oldest entry. Readers always receive owned copies.

use std::collections::VecDeque;

use crate::domain::{AlignmentDivergence, MeasurementFilter, OutcomeMeasurement};

/// FIFO ring with a hard capacity.
#[derive(Debug, Clone)]
pub struct BoundedLog<T> {
    capacity: usize,
    entries: VecDeque<T>,
}

impl<T: Clone> BoundedLog<T> {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    /// Append an entry, returning how many old entries were evicted.
    pub fn push(&mut self, entry: T) -> usize {
        self.entries.push_back(entry);
        let mut evicted = 0;
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
            evicted += 1;
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.entries.iter()
    }

    /// The most recent `limit` entries (all when `None`), oldest first.
    pub fn recent(&self, limit: Option<usize>) -> Vec<T> {
        let skip = match limit {
            Some(n) => self.entries.len().saturating_sub(n),
            None => 0,
        };
        self.entries.iter().skip(skip).cloned().collect()
    }
}

/// Recorded measurements, in insertion order.
#[derive(Debug, Clone)]
pub struct MeasurementStore {
    log: BoundedLog<OutcomeMeasurement>,
}

impl MeasurementStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            log: BoundedLog::new(capacity),
        }
    }

    /// Append a measurement; returns the number of evicted measurements.
    pub fn append(&mut self, measurement: OutcomeMeasurement) -> usize {
        self.log.push(measurement)
    }

    /// Copies of the measurements matching `filter`, in insertion order.
    /// `limit` keeps the most recent matches.
    pub fn query(&self, filter: &MeasurementFilter) -> Vec<OutcomeMeasurement> {
        let matching: Vec<&OutcomeMeasurement> =
            self.log.iter().filter(|m| filter.matches(m)).collect();
        let skip = match filter.limit {
            Some(n) => matching.len().saturating_sub(n),
            None => 0,
        };
        matching.into_iter().skip(skip).cloned().collect()
    }

    /// Borrowing view for in-crate analyses.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &OutcomeMeasurement> {
        self.log.iter()
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.log.capacity()
    }

    pub fn clear(&mut self) {
        self.log.clear();
    }
}

/// Log of detected divergences, in detection order.
pub type DivergenceLog = BoundedLog<AlignmentDivergence>;
