use std::collections::VecDeque;

use crate::error::{MonitorError, Result};

use super::snapshot::Snapshot;

/// One hour of samples at the default one-second interval.
pub const DEFAULT_CAPACITY: usize = 3600;

/// Append-only ring buffer of snapshots. Once `capacity` is reached the
/// oldest snapshot is evicted on every push.
#[derive(Debug, Clone)]
pub struct History {
    samples: VecDeque<Snapshot>,
    capacity: usize,
    recorded: u64,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
            recorded: 0,
        }
    }

    /// Append a snapshot. Its timestamp must be later than the newest one.
    pub fn push(&mut self, snapshot: Snapshot) -> Result<()> {
        if let Some(last) = self.samples.back()
            && snapshot.timestamp <= last.timestamp
        {
            return Err(MonitorError::NonMonotonic {
                previous: last.timestamp,
                current: snapshot.timestamp,
            });
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(snapshot);
        self.recorded += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total pushes over the lifetime of the history, evicted ones included.
    pub fn recorded(&self) -> u64 {
        self.recorded
    }

    pub fn first(&self) -> Option<&Snapshot> {
        self.samples.front()
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Snapshot> + ExactSizeIterator {
        self.samples.iter()
    }

    /// The `n` most recent snapshots, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &Snapshot> {
        self.samples.iter().skip(self.samples.len().saturating_sub(n))
    }

    pub fn to_vec(&self) -> Vec<Snapshot> {
        self.samples.iter().cloned().collect()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
